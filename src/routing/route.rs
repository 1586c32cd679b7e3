//! The route model.
//!
//! A [`Route`] describes exactly what the UI should display. Routes are plain
//! values: navigation always builds a new one instead of mutating the active
//! route. Every consumer matches exhaustively, so adding a variant is a compile
//! error at each place that has to learn about it.

use serde::{Deserialize, Serialize};

use crate::routing::node::BaseUrl;
use crate::routing::oid::Oid;

/// Everything the router can navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resource", content = "params")]
pub enum Route {
    #[serde(rename = "home")]
    Home,

    /// Repository listing of a single seed.
    #[serde(rename = "nodeListing")]
    NodeListing { base_url: BaseUrl, page_index: u32 },

    /// Repositories delegated to a user on a seed.
    #[serde(rename = "users")]
    User { node: BaseUrl, did: String },

    #[serde(rename = "repo")]
    Repo(RepoRoute),

    #[serde(rename = "notFound")]
    NotFound {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    #[serde(rename = "error")]
    Error { title: String, description: String },
}

impl Route {
    /// The `notFound` route shown for paths that match no grammar.
    pub fn page_not_found() -> Self {
        Route::NotFound {
            title: Some("Page not found".to_string()),
        }
    }

    /// Dotted resource name, e.g. `repo.source`.
    pub fn resource(&self) -> &'static str {
        match self {
            Route::Home => "home",
            Route::NodeListing { .. } => "nodeListing",
            Route::User { .. } => "users",
            Route::Repo(repo) => repo.resource(),
            Route::NotFound { .. } => "notFound",
            Route::Error { .. } => "error",
        }
    }

    pub fn as_repo(&self) -> Option<&RepoRoute> {
        match self {
            Route::Repo(repo) => Some(repo),
            _ => None,
        }
    }
}

impl From<RepoRoute> for Route {
    fn from(route: RepoRoute) -> Self {
        Route::Repo(route)
    }
}

/// Routes scoped to a single repository on a seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resource")]
pub enum RepoRoute {
    #[serde(rename = "repo.source")]
    Source(SourceRoute),
    #[serde(rename = "repo.history")]
    History(HistoryRoute),
    #[serde(rename = "repo.commit")]
    Commit(CommitRoute),
    #[serde(rename = "repo.issues")]
    Issues(IssuesRoute),
    #[serde(rename = "repo.issue")]
    Issue(IssueRoute),
    #[serde(rename = "repo.patches")]
    Patches(PatchesRoute),
    #[serde(rename = "repo.patch")]
    Patch(PatchRoute),
}

impl RepoRoute {
    pub fn resource(&self) -> &'static str {
        match self {
            RepoRoute::Source(_) => "repo.source",
            RepoRoute::History(_) => "repo.history",
            RepoRoute::Commit(_) => "repo.commit",
            RepoRoute::Issues(_) => "repo.issues",
            RepoRoute::Issue(_) => "repo.issue",
            RepoRoute::Patches(_) => "repo.patches",
            RepoRoute::Patch(_) => "repo.patch",
        }
    }

    pub fn node(&self) -> &BaseUrl {
        match self {
            RepoRoute::Source(r) => &r.node,
            RepoRoute::History(r) => &r.node,
            RepoRoute::Commit(r) => &r.node,
            RepoRoute::Issues(r) => &r.node,
            RepoRoute::Issue(r) => &r.node,
            RepoRoute::Patches(r) => &r.node,
            RepoRoute::Patch(r) => &r.node,
        }
    }

    pub fn repo(&self) -> &str {
        match self {
            RepoRoute::Source(r) => &r.repo,
            RepoRoute::History(r) => &r.repo,
            RepoRoute::Commit(r) => &r.repo,
            RepoRoute::Issues(r) => &r.repo,
            RepoRoute::Issue(r) => &r.repo,
            RepoRoute::Patches(r) => &r.repo,
            RepoRoute::Patch(r) => &r.repo,
        }
    }
}

/// Source browser: a tree or blob at a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRoute {
    pub node: BaseUrl,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Path inside the tree, always starting with `/`. `None` is the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Unresolved `<revision>/<path>` remainder, kept until a branch map is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Highlighted line, rendered as `#L<line>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// In-page anchor, rendered as `#<hash>` when no line is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl SourceRoute {
    pub fn new(node: BaseUrl, repo: impl Into<String>) -> Self {
        Self {
            node,
            repo: repo.into(),
            peer: None,
            revision: None,
            path: None,
            route: None,
            line: None,
            hash: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRoute {
    pub node: BaseUrl,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRoute {
    pub node: BaseUrl,
    pub repo: String,
    pub commit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuesRoute {
    pub node: BaseUrl,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRoute {
    pub node: BaseUrl,
    pub repo: String,
    pub issue: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchesRoute {
    pub node: BaseUrl,
    pub repo: String,
    /// Raw query string without the leading `?`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRoute {
    pub node: BaseUrl,
    pub repo: String,
    pub patch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<PatchView>,
}

/// Which tab of a patch is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum PatchView {
    Activity,
    Changes {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revision: Option<String>,
    },
    Diff {
        from_commit: Oid,
        to_commit: Oid,
    },
}

impl PatchView {
    pub fn name(&self) -> &'static str {
        match self {
            PatchView::Activity => "activity",
            PatchView::Changes { .. } => "changes",
            PatchView::Diff { .. } => "diff",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Open,
    Closed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(IssueStatus::Open),
            "closed" => Some(IssueStatus::Closed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::node::Scheme;

    fn node() -> BaseUrl {
        BaseUrl {
            hostname: "seed.example.org".into(),
            port: 443,
            scheme: Scheme::Https,
        }
    }

    #[test]
    fn test_resource_names() {
        assert_eq!(Route::Home.resource(), "home");
        assert_eq!(Route::page_not_found().resource(), "notFound");
        let source = Route::from(RepoRoute::Source(SourceRoute::new(node(), "rid")));
        assert_eq!(source.resource(), "repo.source");
        assert_eq!(source.as_repo().map(|r| r.repo()), Some("rid"));
    }

    #[test]
    fn test_state_payload_shape() {
        let mut source = SourceRoute::new(node(), "rid");
        source.revision = Some("main".into());
        let value = serde_json::to_value(Route::Repo(RepoRoute::Source(source.clone()))).unwrap();

        assert_eq!(value["resource"], "repo");
        assert_eq!(value["params"]["resource"], "repo.source");
        assert_eq!(value["params"]["revision"], "main");
        assert!(value["params"].get("path").is_none());

        let back: Route = serde_json::from_value(value).unwrap();
        assert_eq!(back, Route::Repo(RepoRoute::Source(source)));
    }

    #[test]
    fn test_patch_view_names() {
        assert_eq!(PatchView::Activity.name(), "activity");
        assert_eq!(PatchView::Changes { revision: None }.name(), "changes");
        let value = serde_json::to_value(PatchView::Changes {
            revision: Some("r1".into()),
        })
        .unwrap();
        assert_eq!(value["name"], "changes");
    }

    #[test]
    fn test_issue_status_parse() {
        assert_eq!(IssueStatus::parse("open"), Some(IssueStatus::Open));
        assert_eq!(IssueStatus::parse("closed"), Some(IssueStatus::Closed));
        assert_eq!(IssueStatus::parse("solved"), None);
    }
}
