//! Revision/path disambiguation.
//!
//! A tree URL remainder such as `feature/branch/src/main.c` cannot be split by
//! syntax alone: branch names contain `/`, and a leading 40-hex segment may be a
//! commit or a directory. The split is decided against the branch map of the
//! repository (or peer) being browsed.
//!
//! # Rules
//! 1. A branch name that prefixes the input at a segment boundary wins; among
//!    several, the longest name wins.
//! 2. Otherwise a leading 40-char lowercase hex segment is taken as a commit id.
//! 3. Otherwise no revision is extracted and the whole input is the path.
//!
//! A branch whose name is itself 40 hex characters is matched by rule 1 first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::oid::{is_commit_id, is_oid, OID_LEN};

/// Branch name → commit id, scoped to a repository and optional peer.
pub type BranchMap = BTreeMap<String, String>;

/// Result of splitting a remainder into revision and path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedRevision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub path: String,
}

/// Detects branch names and commit ids at the start of `input` and extracts them.
pub fn detect_revision(input: &str, branches: &BranchMap) -> DetectedRevision {
    let branch = branches
        .keys()
        .filter(|name| !name.is_empty() && starts_with_segment(input, name))
        .max_by_key(|name| name.len());

    if let Some(branch) = branch {
        return DetectedRevision {
            revision: Some(branch.clone()),
            path: rest_or_root(&input[branch.len()..]),
        };
    }

    if let Some(commit) = input.get(..OID_LEN) {
        if is_commit_id(commit) && starts_with_segment(input, commit) {
            return DetectedRevision {
                revision: Some(commit.to_string()),
                path: rest_or_root(&input[OID_LEN..]),
            };
        }
    }

    DetectedRevision {
        revision: None,
        path: input.to_string(),
    }
}

fn starts_with_segment(input: &str, prefix: &str) -> bool {
    input.starts_with(prefix)
        && matches!(input.as_bytes().get(prefix.len()), None | Some(b'/'))
}

fn rest_or_root(rest: &str) -> String {
    if rest.is_empty() || rest == "/" {
        "/".to_string()
    } else {
        rest.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Revision {0} not found")]
pub struct RevisionNotFound(pub String);

/// Map a revision (branch name or commit id) to the commit id to browse.
///
/// Without a revision the default branch is used.
pub fn parse_revision_to_oid(
    revision: Option<&str>,
    default_branch: &str,
    branches: &BranchMap,
) -> Result<String, RevisionNotFound> {
    match revision {
        Some(revision) if is_oid(revision) => Ok(revision.to_ascii_lowercase()),
        Some(revision) => branches
            .get(revision)
            .cloned()
            .ok_or_else(|| RevisionNotFound(revision.to_string())),
        None => branches
            .get(default_branch)
            .cloned()
            .ok_or_else(|| RevisionNotFound(default_branch.to_string())),
    }
}
