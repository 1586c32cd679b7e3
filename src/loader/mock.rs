//! In-memory [`SeedApi`] for deterministic tests.
//!
//! # Design
//!
//! The mock serves repositories registered as [`RepoFixture`]s. Every call is
//! recorded so tests can assert which requests a load issued (and which were
//! served from previously loaded data). Failures and latency can be injected
//! per method.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::loader::api::{ApiError, SeedApi};
use crate::loader::types::{
    Blob, Commit, CommitHeader, CommitsQuery, DiffResponse, Issue, ListQuery, Node, NodeStats,
    Patch, Remote, Repo, RepoListQuery, RepoTotals, Scope, SeedingPolicy, Tree,
};
use crate::routing::BaseUrl;

/// Mock seed API. Clones share state.
#[derive(Debug, Clone)]
pub struct MockSeedApi {
    inner: Arc<Mutex<MockSeedApiInner>>,
}

#[derive(Debug)]
struct MockSeedApiInner {
    node: Node,
    repos: BTreeMap<String, RepoFixture>,
    fail_on: Option<FailOn>,
    delays: BTreeMap<MockMethod, Duration>,
    calls: Vec<MockCall>,
}

/// Everything a seed knows about one repository.
#[derive(Debug, Clone)]
pub struct RepoFixture {
    pub repo: Repo,
    pub policy: SeedingPolicy,
    pub remotes: Vec<Remote>,
    /// Trees by commit id.
    pub trees: BTreeMap<String, Tree>,
    /// Blobs by (commit id, path without leading `/`).
    pub blobs: BTreeMap<(String, String), Blob>,
    /// READMEs by commit id.
    pub readmes: BTreeMap<String, Blob>,
    pub commits: BTreeMap<String, Commit>,
    /// Commit headers, newest first.
    pub history: Vec<CommitHeader>,
    /// Diffs by (base, oid).
    pub diffs: BTreeMap<(String, String), DiffResponse>,
    pub issues: Vec<Issue>,
    pub patches: Vec<Patch>,
}

impl RepoFixture {
    pub fn new(repo: Repo) -> Self {
        Self {
            repo,
            policy: SeedingPolicy::Allow { scope: Scope::All },
            remotes: Vec::new(),
            trees: BTreeMap::new(),
            blobs: BTreeMap::new(),
            readmes: BTreeMap::new(),
            commits: BTreeMap::new(),
            history: Vec::new(),
            diffs: BTreeMap::new(),
            issues: Vec::new(),
            patches: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MockMethod {
    GetNode,
    GetStats,
    GetPolicyByRid,
    GetByRid,
    GetRepos,
    GetReposByDelegate,
    GetReadme,
    GetBlob,
    GetTree,
    GetAllRemotes,
    GetRemoteByPeer,
    GetAllCommits,
    GetCommitBySha,
    GetDiff,
    GetIssueById,
    GetAllIssues,
    GetPatchById,
    GetAllPatches,
}

/// Which calls should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every call.
    All(ApiError),
    /// Fail calls to one method.
    Method(MockMethod, ApiError),
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub method: MockMethod,
    pub node: BaseUrl,
    /// API path the call corresponds to, e.g. `repos/rad:z3gq/tree/<sha>`.
    pub target: String,
}

impl Default for MockSeedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSeedApi {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockSeedApiInner {
                node: Node {
                    id: "z6MkmockNode".to_string(),
                    agent: "radicle-httpd/mock".to_string(),
                    version: None,
                    avatar_url: None,
                    config: None,
                },
                repos: BTreeMap::new(),
                fail_on: None,
                delays: BTreeMap::new(),
                calls: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockSeedApiInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_node(&self, node: Node) {
        self.lock().node = node;
    }

    pub fn add_repo(&self, fixture: RepoFixture) {
        self.lock().repos.insert(fixture.repo.rid.clone(), fixture);
    }

    /// Mutate a registered repository in place.
    pub fn update_repo(&self, rid: &str, update: impl FnOnce(&mut RepoFixture)) {
        if let Some(fixture) = self.lock().repos.get_mut(rid) {
            update(fixture);
        }
    }

    pub fn fail_on(&self, fail_on: FailOn) {
        self.lock().fail_on = Some(fail_on);
    }

    pub fn clear_failure(&self) {
        self.lock().fail_on = None;
    }

    /// Delay every call to `method` by `delay`.
    pub fn set_delay(&self, method: MockMethod, delay: Duration) {
        self.lock().delays.insert(method, delay);
    }

    pub fn clear_delays(&self) {
        self.lock().delays.clear();
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, method: MockMethod) -> usize {
        self.lock().calls.iter().filter(|c| c.method == method).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    async fn enter(&self, method: MockMethod, node: &BaseUrl, target: String) -> Result<(), ApiError> {
        let (delay, failure) = {
            let mut inner = self.lock();
            inner.calls.push(MockCall {
                method,
                node: node.clone(),
                target,
            });
            let failure = match &inner.fail_on {
                Some(FailOn::All(error)) => Some(error.clone()),
                Some(FailOn::Method(m, error)) if *m == method => Some(error.clone()),
                _ => None,
            };
            (inner.delays.get(&method).copied(), failure)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn with_repo<T>(
        &self,
        rid: &str,
        target: &str,
        read: impl FnOnce(&RepoFixture) -> Option<T>,
    ) -> Result<T, ApiError> {
        self.lock()
            .repos
            .get(rid)
            .and_then(read)
            .ok_or_else(|| ApiError::not_found(target))
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, page: u32, per_page: u32) -> Vec<T> {
    items
        .skip(page as usize * per_page as usize)
        .take(per_page as usize)
        .collect()
}

#[async_trait]
impl SeedApi for MockSeedApi {
    async fn get_node(&self, node: &BaseUrl) -> Result<Node, ApiError> {
        self.enter(MockMethod::GetNode, node, "node".into()).await?;
        Ok(self.lock().node.clone())
    }

    async fn get_stats(&self, node: &BaseUrl) -> Result<NodeStats, ApiError> {
        self.enter(MockMethod::GetStats, node, "stats".into()).await?;
        Ok(NodeStats {
            repos: RepoTotals {
                total: self.lock().repos.len() as u64,
            },
        })
    }

    async fn get_policy_by_rid(
        &self,
        node: &BaseUrl,
        rid: &str,
    ) -> Result<SeedingPolicy, ApiError> {
        let target = format!("node/policies/repos/{rid}");
        self.enter(MockMethod::GetPolicyByRid, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| Some(f.policy))
    }

    async fn get_by_rid(&self, node: &BaseUrl, rid: &str) -> Result<Repo, ApiError> {
        let target = format!("repos/{rid}");
        self.enter(MockMethod::GetByRid, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| Some(f.repo.clone()))
    }

    async fn get_repos(&self, node: &BaseUrl, query: &RepoListQuery) -> Result<Vec<Repo>, ApiError> {
        self.enter(MockMethod::GetRepos, node, "repos".into()).await?;
        let inner = self.lock();
        Ok(page(
            inner.repos.values().map(|f| f.repo.clone()),
            query.page,
            query.per_page,
        ))
    }

    async fn get_repos_by_delegate(&self, node: &BaseUrl, did: &str) -> Result<Vec<Repo>, ApiError> {
        self.enter(MockMethod::GetReposByDelegate, node, format!("delegates/{did}/repos"))
            .await?;
        Ok(self
            .lock()
            .repos
            .values()
            .filter(|f| f.repo.delegates.iter().any(|d| d.id == did))
            .map(|f| f.repo.clone())
            .collect())
    }

    async fn get_readme(&self, node: &BaseUrl, rid: &str, sha: &str) -> Result<Blob, ApiError> {
        let target = format!("repos/{rid}/readme/{sha}");
        self.enter(MockMethod::GetReadme, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| f.readmes.get(sha).cloned())
    }

    async fn get_blob(
        &self,
        node: &BaseUrl,
        rid: &str,
        sha: &str,
        path: &str,
    ) -> Result<Blob, ApiError> {
        let path = path.trim_start_matches('/');
        let target = format!("repos/{rid}/blob/{sha}/{path}");
        self.enter(MockMethod::GetBlob, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| {
            f.blobs.get(&(sha.to_string(), path.to_string())).cloned()
        })
    }

    async fn get_tree(
        &self,
        node: &BaseUrl,
        rid: &str,
        sha: &str,
        path: Option<&str>,
    ) -> Result<Tree, ApiError> {
        let target = format!("repos/{rid}/tree/{sha}/{}", path.unwrap_or(""));
        self.enter(MockMethod::GetTree, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| f.trees.get(sha).cloned())
    }

    async fn get_all_remotes(&self, node: &BaseUrl, rid: &str) -> Result<Vec<Remote>, ApiError> {
        let target = format!("repos/{rid}/remotes");
        self.enter(MockMethod::GetAllRemotes, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| Some(f.remotes.clone()))
    }

    async fn get_remote_by_peer(
        &self,
        node: &BaseUrl,
        rid: &str,
        peer: &str,
    ) -> Result<Remote, ApiError> {
        let target = format!("repos/{rid}/remotes/{peer}");
        self.enter(MockMethod::GetRemoteByPeer, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| {
            f.remotes.iter().find(|r| r.id == peer).cloned()
        })
    }

    async fn get_all_commits(
        &self,
        node: &BaseUrl,
        rid: &str,
        query: &CommitsQuery,
    ) -> Result<Vec<CommitHeader>, ApiError> {
        let target = format!("repos/{rid}/commits");
        self.enter(MockMethod::GetAllCommits, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| {
            let start = query
                .parent
                .as_ref()
                .and_then(|parent| f.history.iter().position(|c| &c.id == parent))
                .unwrap_or(0);
            Some(page(
                f.history.iter().skip(start).cloned(),
                query.page,
                query.per_page,
            ))
        })
    }

    async fn get_commit_by_sha(
        &self,
        node: &BaseUrl,
        rid: &str,
        sha: &str,
    ) -> Result<Commit, ApiError> {
        let target = format!("repos/{rid}/commits/{sha}");
        self.enter(MockMethod::GetCommitBySha, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| f.commits.get(sha).cloned())
    }

    async fn get_diff(
        &self,
        node: &BaseUrl,
        rid: &str,
        base: &str,
        oid: &str,
    ) -> Result<DiffResponse, ApiError> {
        let target = format!("repos/{rid}/diff/{base}/{oid}");
        self.enter(MockMethod::GetDiff, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| {
            f.diffs.get(&(base.to_string(), oid.to_string())).cloned()
        })
    }

    async fn get_issue_by_id(&self, node: &BaseUrl, rid: &str, id: &str) -> Result<Issue, ApiError> {
        let target = format!("repos/{rid}/issues/{id}");
        self.enter(MockMethod::GetIssueById, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| f.issues.iter().find(|i| i.id == id).cloned())
    }

    async fn get_all_issues(
        &self,
        node: &BaseUrl,
        rid: &str,
        query: &ListQuery,
    ) -> Result<Vec<Issue>, ApiError> {
        let target = format!("repos/{rid}/issues");
        self.enter(MockMethod::GetAllIssues, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| {
            Some(page(
                f.issues
                    .iter()
                    .filter(|i| i.state.status == query.status)
                    .cloned(),
                query.page,
                query.per_page,
            ))
        })
    }

    async fn get_patch_by_id(&self, node: &BaseUrl, rid: &str, id: &str) -> Result<Patch, ApiError> {
        let target = format!("repos/{rid}/patches/{id}");
        self.enter(MockMethod::GetPatchById, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| f.patches.iter().find(|p| p.id == id).cloned())
    }

    async fn get_all_patches(
        &self,
        node: &BaseUrl,
        rid: &str,
        query: &ListQuery,
    ) -> Result<Vec<Patch>, ApiError> {
        let target = format!("repos/{rid}/patches");
        self.enter(MockMethod::GetAllPatches, node, target.clone()).await?;
        self.with_repo(rid, &target, |f| {
            Some(page(
                f.patches
                    .iter()
                    .filter(|p| p.state.status == query.status)
                    .cloned(),
                query.page,
                query.per_page,
            ))
        })
    }
}
