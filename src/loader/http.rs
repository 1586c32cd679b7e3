//! HTTP implementation of [`SeedApi`].
//!
//! # Responsibilities
//! - Build `<scheme>://<host>:<port>/api/v1/<path>` URLs
//! - Map transport failures, non-2xx responses and schema mismatches to [`ApiError`]
//!
//! # Design Decisions
//! - One shared `reqwest::Client` (connection pooling across seeds)
//! - Every request is bounded by `loader.request_timeout_secs`
//! - Error bodies are read as text first; a JSON `message` field is used when present

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::LoaderConfig;
use crate::loader::api::{ApiError, SeedApi};
use crate::loader::types::{
    Blob, Commit, CommitHeader, CommitsQuery, DiffResponse, Issue, ListQuery, Node, NodeStats,
    Patch, Remote, Repo, RepoListQuery, SeedingPolicy, Tree,
};
use crate::routing::BaseUrl;

#[derive(Debug, Clone)]
pub struct HttpSeedApi {
    client: reqwest::Client,
}

impl HttpSeedApi {
    pub fn new(config: &LoaderConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn endpoint(node: &BaseUrl, path: &str) -> String {
        format!("{}/api/v1/{}", node.origin(), path)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        node: &BaseUrl,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = Self::endpoint(node, path);
        tracing::debug!(%url, "Seed request");

        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| value.get("message")?.as_str().map(str::to_string))
                .unwrap_or_else(|| "Response error".to_string());
            tracing::debug!(%url, status = status.as_u16(), %message, "Seed request failed");
            return Err(ApiError::Response {
                url,
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Parse {
            url,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SeedApi for HttpSeedApi {
    async fn get_node(&self, node: &BaseUrl) -> Result<Node, ApiError> {
        self.fetch(node, "node", &[]).await
    }

    async fn get_stats(&self, node: &BaseUrl) -> Result<NodeStats, ApiError> {
        self.fetch(node, "stats", &[]).await
    }

    async fn get_policy_by_rid(
        &self,
        node: &BaseUrl,
        rid: &str,
    ) -> Result<SeedingPolicy, ApiError> {
        self.fetch(node, &format!("node/policies/repos/{rid}"), &[]).await
    }

    async fn get_by_rid(&self, node: &BaseUrl, rid: &str) -> Result<Repo, ApiError> {
        self.fetch(node, &format!("repos/{rid}"), &[]).await
    }

    async fn get_repos(&self, node: &BaseUrl, query: &RepoListQuery) -> Result<Vec<Repo>, ApiError> {
        let query = [
            ("page", query.page.to_string()),
            ("perPage", query.per_page.to_string()),
            ("show", query.show.as_str().to_string()),
        ];
        self.fetch(node, "repos", &query).await
    }

    async fn get_repos_by_delegate(&self, node: &BaseUrl, did: &str) -> Result<Vec<Repo>, ApiError> {
        self.fetch(node, &format!("delegates/{did}/repos"), &[]).await
    }

    async fn get_readme(&self, node: &BaseUrl, rid: &str, sha: &str) -> Result<Blob, ApiError> {
        self.fetch(node, &format!("repos/{rid}/readme/{sha}"), &[]).await
    }

    async fn get_blob(
        &self,
        node: &BaseUrl,
        rid: &str,
        sha: &str,
        path: &str,
    ) -> Result<Blob, ApiError> {
        let path = path.trim_start_matches('/');
        self.fetch(node, &format!("repos/{rid}/blob/{sha}/{path}"), &[]).await
    }

    async fn get_tree(
        &self,
        node: &BaseUrl,
        rid: &str,
        sha: &str,
        path: Option<&str>,
    ) -> Result<Tree, ApiError> {
        let path = path.unwrap_or("").trim_start_matches('/');
        self.fetch(node, &format!("repos/{rid}/tree/{sha}/{path}"), &[]).await
    }

    async fn get_all_remotes(&self, node: &BaseUrl, rid: &str) -> Result<Vec<Remote>, ApiError> {
        self.fetch(node, &format!("repos/{rid}/remotes"), &[]).await
    }

    async fn get_remote_by_peer(
        &self,
        node: &BaseUrl,
        rid: &str,
        peer: &str,
    ) -> Result<Remote, ApiError> {
        self.fetch(node, &format!("repos/{rid}/remotes/{peer}"), &[]).await
    }

    async fn get_all_commits(
        &self,
        node: &BaseUrl,
        rid: &str,
        query: &CommitsQuery,
    ) -> Result<Vec<CommitHeader>, ApiError> {
        let mut params = Vec::with_capacity(3);
        if let Some(parent) = &query.parent {
            params.push(("parent", parent.clone()));
        }
        params.push(("page", query.page.to_string()));
        params.push(("perPage", query.per_page.to_string()));
        self.fetch(node, &format!("repos/{rid}/commits"), &params).await
    }

    async fn get_commit_by_sha(
        &self,
        node: &BaseUrl,
        rid: &str,
        sha: &str,
    ) -> Result<Commit, ApiError> {
        self.fetch(node, &format!("repos/{rid}/commits/{sha}"), &[]).await
    }

    async fn get_diff(
        &self,
        node: &BaseUrl,
        rid: &str,
        base: &str,
        oid: &str,
    ) -> Result<DiffResponse, ApiError> {
        self.fetch(node, &format!("repos/{rid}/diff/{base}/{oid}"), &[]).await
    }

    async fn get_issue_by_id(&self, node: &BaseUrl, rid: &str, id: &str) -> Result<Issue, ApiError> {
        self.fetch(node, &format!("repos/{rid}/issues/{id}"), &[]).await
    }

    async fn get_all_issues(
        &self,
        node: &BaseUrl,
        rid: &str,
        query: &ListQuery,
    ) -> Result<Vec<Issue>, ApiError> {
        self.fetch(node, &format!("repos/{rid}/issues"), &list_params(query)).await
    }

    async fn get_patch_by_id(&self, node: &BaseUrl, rid: &str, id: &str) -> Result<Patch, ApiError> {
        self.fetch(node, &format!("repos/{rid}/patches/{id}"), &[]).await
    }

    async fn get_all_patches(
        &self,
        node: &BaseUrl,
        rid: &str,
        query: &ListQuery,
    ) -> Result<Vec<Patch>, ApiError> {
        self.fetch(node, &format!("repos/{rid}/patches"), &list_params(query)).await
    }
}

fn list_params(query: &ListQuery) -> [(&'static str, String); 3] {
    [
        ("page", query.page.to_string()),
        ("perPage", query.per_page.to_string()),
        ("status", query.status.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Scheme;

    #[test]
    fn test_endpoint() {
        let node = BaseUrl {
            hostname: "seed.example.org".into(),
            port: 8080,
            scheme: Scheme::Http,
        };
        assert_eq!(
            HttpSeedApi::endpoint(&node, "repos/rad:z3gq"),
            "http://seed.example.org:8080/api/v1/repos/rad:z3gq"
        );
    }

    #[tokio::test]
    async fn test_unreachable_seed_is_network_error() {
        let api = HttpSeedApi::new(&LoaderConfig::default()).unwrap();
        let node = BaseUrl {
            hostname: "127.0.0.1".into(),
            port: 1,
            scheme: Scheme::Http,
        };
        let result = api.get_node(&node).await;
        assert!(matches!(result, Err(ApiError::Network(_))));
    }
}
