//! Seed API collaborator contract.
//!
//! Every call takes the [`BaseUrl`] of the seed it targets, so one client can
//! serve routes pointing at different seeds.

use async_trait::async_trait;
use thiserror::Error;

use crate::loader::types::{
    Blob, Commit, CommitHeader, CommitsQuery, DiffResponse, Issue, ListQuery, Node, NodeStats,
    Patch, Remote, Repo, RepoListQuery, SeedingPolicy, Tree,
};
use crate::routing::BaseUrl;

/// Errors returned by a [`SeedApi`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The seed answered with a non-success status.
    #[error("{url} returned {status}: {message}")]
    Response {
        url: String,
        status: u16,
        message: String,
    },

    /// The body did not match the expected schema.
    #[error("failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// The seed could not be reached.
    #[error("network error: {0}")]
    Network(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Shorthand for a 404 response, mostly useful in tests.
    pub fn not_found(url: impl Into<String>) -> Self {
        ApiError::Response {
            url: url.into(),
            status: 404,
            message: "Not Found".to_string(),
        }
    }
}

/// Read-only view of a seed's HTTP API.
#[async_trait]
pub trait SeedApi: Send + Sync {
    async fn get_node(&self, node: &BaseUrl) -> Result<Node, ApiError>;

    async fn get_stats(&self, node: &BaseUrl) -> Result<NodeStats, ApiError>;

    async fn get_policy_by_rid(&self, node: &BaseUrl, rid: &str)
        -> Result<SeedingPolicy, ApiError>;

    async fn get_by_rid(&self, node: &BaseUrl, rid: &str) -> Result<Repo, ApiError>;

    async fn get_repos(&self, node: &BaseUrl, query: &RepoListQuery) -> Result<Vec<Repo>, ApiError>;

    async fn get_repos_by_delegate(&self, node: &BaseUrl, did: &str) -> Result<Vec<Repo>, ApiError>;

    async fn get_readme(&self, node: &BaseUrl, rid: &str, sha: &str) -> Result<Blob, ApiError>;

    async fn get_blob(
        &self,
        node: &BaseUrl,
        rid: &str,
        sha: &str,
        path: &str,
    ) -> Result<Blob, ApiError>;

    async fn get_tree(
        &self,
        node: &BaseUrl,
        rid: &str,
        sha: &str,
        path: Option<&str>,
    ) -> Result<Tree, ApiError>;

    async fn get_all_remotes(&self, node: &BaseUrl, rid: &str) -> Result<Vec<Remote>, ApiError>;

    async fn get_remote_by_peer(
        &self,
        node: &BaseUrl,
        rid: &str,
        peer: &str,
    ) -> Result<Remote, ApiError>;

    async fn get_all_commits(
        &self,
        node: &BaseUrl,
        rid: &str,
        query: &CommitsQuery,
    ) -> Result<Vec<CommitHeader>, ApiError>;

    async fn get_commit_by_sha(&self, node: &BaseUrl, rid: &str, sha: &str)
        -> Result<Commit, ApiError>;

    async fn get_diff(
        &self,
        node: &BaseUrl,
        rid: &str,
        base: &str,
        oid: &str,
    ) -> Result<DiffResponse, ApiError>;

    async fn get_issue_by_id(&self, node: &BaseUrl, rid: &str, id: &str) -> Result<Issue, ApiError>;

    async fn get_all_issues(
        &self,
        node: &BaseUrl,
        rid: &str,
        query: &ListQuery,
    ) -> Result<Vec<Issue>, ApiError>;

    async fn get_patch_by_id(&self, node: &BaseUrl, rid: &str, id: &str) -> Result<Patch, ApiError>;

    async fn get_all_patches(
        &self,
        node: &BaseUrl,
        rid: &str,
        query: &ListQuery,
    ) -> Result<Vec<Patch>, ApiError>;
}
