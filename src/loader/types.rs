//! Seed HTTP API payloads.
//!
//! Field names follow the API's camelCase JSON. Only the fields the loader and
//! titles read are required; everything else is defaulted so that additive API
//! changes do not break decoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::routing::BranchMap;

pub const PROJECT_PAYLOAD: &str = "xyz.radicle.project";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    pub rid: String,
    pub payloads: RepoPayloads,
    #[serde(default)]
    pub delegates: Vec<Author>,
    #[serde(default)]
    pub threshold: u32,
    #[serde(default)]
    pub seeding: u64,
}

impl Repo {
    pub fn project(&self) -> Option<&ProjectPayload> {
        self.payloads.project.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoPayloads {
    #[serde(rename = "xyz.radicle.project", default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPayload {
    pub data: ProjectData,
    pub meta: ProjectMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub default_branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub head: String,
    #[serde(default)]
    pub patches: PatchCounts,
    #[serde(default)]
    pub issues: IssueCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchCounts {
    pub open: u64,
    pub draft: u64,
    pub archived: u64,
    pub merged: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub open: u64,
    pub closed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A peer's namespace within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub heads: BranchMap,
    #[serde(default)]
    pub delegate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    Submodule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub name: String,
    pub oid: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
    pub last_commit: CommitHeader,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub binary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub name: String,
    pub path: String,
    pub last_commit: CommitHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committer {
    pub name: String,
    pub email: String,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitHeader {
    pub id: String,
    pub author: Person,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parents: Vec<String>,
    pub committer: Committer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStats {
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
}

/// A changeset. File entries are passed through to the UI untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    #[serde(default)]
    pub added: Vec<serde_json::Value>,
    #[serde(default)]
    pub deleted: Vec<serde_json::Value>,
    #[serde(default)]
    pub moved: Vec<serde_json::Value>,
    #[serde(default)]
    pub copied: Vec<serde_json::Value>,
    #[serde(default)]
    pub modified: Vec<serde_json::Value>,
    pub stats: DiffStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub commit: CommitHeader,
    pub diff: Diff,
    #[serde(default)]
    pub files: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResponse {
    pub commits: Vec<CommitHeader>,
    pub diff: Diff,
    #[serde(default)]
    pub files: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueState {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub author: Author,
    pub title: String,
    pub state: IssueState,
    #[serde(default)]
    pub discussion: Vec<serde_json::Value>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchState {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default)]
    pub description: String,
    pub base: String,
    pub oid: String,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub id: String,
    pub author: Author,
    pub title: String,
    pub state: PatchState,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub revisions: Vec<Revision>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Followed,
    All,
}

/// Whether a seed replicates a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum SeedingPolicy {
    Block,
    Allow { scope: Scope },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub external_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<NodeConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTotals {
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    pub repos: RepoTotals,
}

/// Which repositories a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoShow {
    Pinned,
    All,
}

impl RepoShow {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoShow::Pinned => "pinned",
            RepoShow::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoListQuery {
    pub page: u32,
    pub per_page: u32,
    pub show: RepoShow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitsQuery {
    pub parent: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

/// Page and status filter for issue and patch listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub status: String,
}
