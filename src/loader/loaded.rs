//! Loaded routes.
//!
//! A [`LoadedRoute`] mirrors [`Route`](crate::routing::Route) but carries the
//! fetched domain data. Data that later loads may reuse (repository, peers,
//! tree, patch) is held behind `Arc` so reuse is a pointer copy and never a
//! mutation of the previous value.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::loader::types::{
    Blob, Commit, CommitHeader, Diff, DiffStats, Issue, Node, NodeStats, Patch, Remote, Repo,
    SeedingPolicy, Tree,
};
use crate::routing::{BaseUrl, IssueStatus, Oid};

const APP_NAME: &str = "Radicle";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "resource", content = "params")]
pub enum LoadedRoute {
    /// Nothing loaded yet.
    #[serde(rename = "booting")]
    Booting,

    #[serde(rename = "home")]
    Home { preferred_seeds: Vec<BaseUrl> },

    #[serde(rename = "nodeListing")]
    NodeListing(NodeListingLoaded),

    #[serde(rename = "users")]
    User(UserLoaded),

    #[serde(rename = "repo")]
    Repo(RepoLoaded),

    #[serde(rename = "notFound")]
    NotFound {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    #[serde(rename = "error")]
    Error { title: String, description: String },
}

impl LoadedRoute {
    pub fn not_found(title: impl Into<String>) -> Self {
        LoadedRoute::NotFound {
            title: Some(title.into()),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        LoadedRoute::Error {
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            LoadedRoute::Booting => "booting",
            LoadedRoute::Home { .. } => "home",
            LoadedRoute::NodeListing(_) => "nodeListing",
            LoadedRoute::User(_) => "users",
            LoadedRoute::Repo(repo) => repo.resource(),
            LoadedRoute::NotFound { .. } => "notFound",
            LoadedRoute::Error { .. } => "error",
        }
    }

    /// Document title parts, most specific first.
    pub fn title(&self) -> Vec<String> {
        match self {
            LoadedRoute::Booting | LoadedRoute::Home { .. } => vec![APP_NAME.to_string()],
            LoadedRoute::NodeListing(listing) => vec![listing.base_url.hostname.clone()],
            LoadedRoute::User(user) => match user.node.config.as_ref().map(|c| c.alias.as_str()) {
                Some(alias) if !alias.is_empty() => vec![alias.to_string(), format_did(&user.did)],
                _ => vec![format_did(&user.did)],
            },
            LoadedRoute::Repo(repo) => repo.title(),
            LoadedRoute::NotFound { .. } => vec!["Page not found".to_string(), APP_NAME.to_string()],
            LoadedRoute::Error { .. } => vec!["Error".to_string(), APP_NAME.to_string()],
        }
    }

    /// Title parts joined for the document title.
    pub fn document_title(&self) -> String {
        self.title().join(" · ")
    }
}

/// `did:key:z6MkabcdefXYZ` → `did:key:z6Mkab…defXYZ`.
fn format_did(did: &str) -> String {
    let Some(key) = did.strip_prefix("did:key:") else {
        return did.to_string();
    };
    if key.len() <= 12 || !key.is_ascii() {
        return did.to_string();
    }
    format!("did:key:{}…{}", &key[..6], &key[key.len() - 6..])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeListingLoaded {
    pub base_url: BaseUrl,
    pub page_index: u32,
    pub node: Node,
    pub stats: NodeStats,
    pub repos: Vec<Repo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoaded {
    pub base_url: BaseUrl,
    pub did: String,
    pub node: Node,
    pub repos: Vec<Repo>,
}

/// Data shared by every repository view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoContext {
    pub base_url: BaseUrl,
    pub seeding_policy: SeedingPolicy,
    pub repo: Arc<Repo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_avatar_url: Option<String>,
}

impl RepoContext {
    /// URL of raw file contents, optionally pinned to a commit.
    pub fn raw_path(&self, commit: Option<&str>) -> String {
        match commit {
            Some(commit) => format!("{}/raw/{}/{}", self.base_url.origin(), self.repo.rid, commit),
            None => format!("{}/raw/{}", self.base_url.origin(), self.repo.rid),
        }
    }

    fn project_name(&self) -> String {
        self.repo
            .project()
            .map(|p| p.data.name.clone())
            .unwrap_or_else(|| self.repo.rid.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "resource")]
pub enum RepoLoaded {
    #[serde(rename = "repo.source")]
    Source(SourceLoaded),
    #[serde(rename = "repo.history")]
    History(HistoryLoaded),
    #[serde(rename = "repo.commit")]
    Commit(CommitLoaded),
    #[serde(rename = "repo.issues")]
    Issues(IssuesLoaded),
    #[serde(rename = "repo.issue")]
    Issue(IssueLoaded),
    #[serde(rename = "repo.patches")]
    Patches(PatchesLoaded),
    #[serde(rename = "repo.patch")]
    Patch(PatchLoaded),
}

impl RepoLoaded {
    pub fn resource(&self) -> &'static str {
        match self {
            RepoLoaded::Source(_) => "repo.source",
            RepoLoaded::History(_) => "repo.history",
            RepoLoaded::Commit(_) => "repo.commit",
            RepoLoaded::Issues(_) => "repo.issues",
            RepoLoaded::Issue(_) => "repo.issue",
            RepoLoaded::Patches(_) => "repo.patches",
            RepoLoaded::Patch(_) => "repo.patch",
        }
    }

    pub fn context(&self) -> &RepoContext {
        match self {
            RepoLoaded::Source(l) => &l.context,
            RepoLoaded::History(l) => &l.context,
            RepoLoaded::Commit(l) => &l.context,
            RepoLoaded::Issues(l) => &l.context,
            RepoLoaded::Issue(l) => &l.context,
            RepoLoaded::Patches(l) => &l.context,
            RepoLoaded::Patch(l) => &l.context,
        }
    }

    pub fn title(&self) -> Vec<String> {
        let context = self.context();
        match self {
            RepoLoaded::Source(_) => {
                let mut title = vec![context.project_name()];
                if let Some(project) = context.repo.project() {
                    if !project.data.description.is_empty() {
                        title.push(project.data.description.clone());
                    }
                }
                title
            }
            RepoLoaded::History(_) => vec![context.project_name(), "history".to_string()],
            RepoLoaded::Commit(l) => vec![l.commit.commit.summary.clone(), "commit".to_string()],
            RepoLoaded::Issues(_) => vec![context.project_name(), "issues".to_string()],
            RepoLoaded::Issue(l) => vec![l.issue.title.clone(), "issue".to_string()],
            RepoLoaded::Patches(_) => vec![context.project_name(), "patches".to_string()],
            RepoLoaded::Patch(l) => vec![l.patch.title.clone(), "patch".to_string()],
        }
    }
}

/// Branch/peer browsing state shared by the source and history views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseState {
    /// Commit id the view is pinned to.
    pub commit: String,
    /// Peers that have at least one branch.
    pub peers: Arc<Vec<Remote>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub tree: Arc<Tree>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLoaded {
    #[serde(flatten)]
    pub context: RepoContext,
    #[serde(flatten)]
    pub browse: BrowseState,
    pub path: String,
    pub blob_result: BlobResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLoaded {
    #[serde(flatten)]
    pub context: RepoContext,
    #[serde(flatten)]
    pub browse: BrowseState,
    pub commit_headers: Vec<CommitHeader>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitLoaded {
    #[serde(flatten)]
    pub context: RepoContext,
    pub commit: Commit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuesLoaded {
    #[serde(flatten)]
    pub context: RepoContext,
    pub issues: Vec<Issue>,
    pub status: IssueStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueLoaded {
    #[serde(flatten)]
    pub context: RepoContext,
    pub issue: Issue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchesLoaded {
    #[serde(flatten)]
    pub context: RepoContext,
    pub patches: Vec<Patch>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchLoaded {
    #[serde(flatten)]
    pub context: RepoContext,
    pub patch: Arc<Patch>,
    pub stats: DiffStats,
    pub view: LoadedPatchView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum LoadedPatchView {
    Activity {
        revision: String,
    },
    Changes {
        revision: String,
        oid: String,
        diff: Diff,
        commits: Vec<CommitHeader>,
        files: BTreeMap<String, serde_json::Value>,
    },
    #[serde(rename_all = "camelCase")]
    Diff {
        from_commit: Oid,
        to_commit: Oid,
        diff: Diff,
        files: BTreeMap<String, serde_json::Value>,
    },
}

/// Outcome of loading the file (or README) shown below the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum BlobResult {
    Loaded { blob: Blob },
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        message: String,
        path: String,
    },
}

impl BlobResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, BlobResult::Loaded { .. })
    }
}
