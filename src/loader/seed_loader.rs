//! Route loading against seed nodes.
//!
//! # Responsibilities
//! - Turn a [`Route`] into a [`LoadedRoute`] by querying the route's seed
//! - Reuse repository, peer, tree and patch data from the previous loaded route
//! - Map every failure to a `notFound` or `error` loaded route
//!
//! # Design Decisions
//! - Independent requests of one view run concurrently (`tokio::try_join!`)
//! - File and README failures stay inside [`BlobResult`] so the tree still renders
//! - `load` never fails; callers always get something to display

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::config::RouterConfig;
use crate::loader::api::{ApiError, SeedApi};
use crate::loader::error::{
    handle_error, handle_node_error, handle_user_error, invalid_did, local_node_rejected,
    LoadError,
};
use crate::loader::loaded::{
    BlobResult, BrowseState, CommitLoaded, HistoryLoaded, IssueLoaded, IssuesLoaded,
    LoadedPatchView, LoadedRoute, NodeListingLoaded, PatchLoaded, PatchesLoaded, RepoContext,
    RepoLoaded, SourceLoaded, UserLoaded,
};
use crate::loader::types::{
    Blob, CommitsQuery, DiffStats, ListQuery, Patch, Remote, Repo, RepoListQuery, RepoShow,
    Revision,
};
use crate::observability::metrics;
use crate::routing::{
    detect_revision, extract_base_url, parse_revision_to_oid, BaseUrl, BranchMap, CommitRoute,
    HistoryRoute, IssueRoute, IssueStatus, IssuesRoute, PatchRoute, PatchView, PatchesRoute,
    RepoRoute, Route, SourceRoute,
};

/// Resolves routes into displayable data.
#[async_trait]
pub trait RouteLoader: Send + Sync {
    /// Load `route`. `previous` is the currently displayed route and may be
    /// used to skip refetching unchanged data.
    async fn load(&self, route: &Route, previous: &LoadedRoute) -> LoadedRoute;
}

/// [`RouteLoader`] backed by a [`SeedApi`].
#[derive(Debug, Clone)]
pub struct SeedLoader<A> {
    api: A,
    config: RouterConfig,
}

#[async_trait]
impl<A: SeedApi> RouteLoader for SeedLoader<A> {
    async fn load(&self, route: &Route, previous: &LoadedRoute) -> LoadedRoute {
        let started = Instant::now();
        let resource = route.resource();
        tracing::debug!(resource, "Loading route");

        let loaded = match route {
            Route::Home => LoadedRoute::Home {
                preferred_seeds: self
                    .config
                    .nodes
                    .preferred_seeds
                    .iter()
                    .filter_map(|seed| extract_base_url(seed, &self.config.nodes))
                    .collect(),
            },
            Route::NodeListing {
                base_url,
                page_index,
            } => self.load_node_listing(base_url, *page_index).await,
            Route::User { node, did } => self.load_user(node, did).await,
            Route::Repo(repo) => {
                if self.config.loader.reject_local_nodes && repo.node().is_local() {
                    local_node_rejected()
                } else {
                    match self.load_repo(repo, previous).await {
                        Ok(loaded) => loaded,
                        Err(e) => {
                            tracing::warn!(resource, rid = repo.repo(), error = %e, "Route load failed");
                            handle_error(&e, repo)
                        }
                    }
                }
            }
            Route::NotFound { title } => LoadedRoute::NotFound {
                title: title.clone(),
            },
            Route::Error { title, description } => LoadedRoute::error(title, description),
        };

        let outcome = match &loaded {
            LoadedRoute::NotFound { .. } => "not_found",
            LoadedRoute::Error { .. } => "error",
            _ => "ok",
        };
        metrics::record_load(resource, outcome, started.elapsed());
        loaded
    }
}

impl<A: SeedApi> SeedLoader<A> {
    pub fn new(api: A, config: RouterConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    async fn load_node_listing(&self, base_url: &BaseUrl, page_index: u32) -> LoadedRoute {
        let query = RepoListQuery {
            page: page_index,
            per_page: self.config.loader.repos_per_page,
            show: RepoShow::All,
        };
        let result = tokio::try_join!(
            self.api.get_node(base_url),
            self.api.get_stats(base_url),
            self.api.get_repos(base_url, &query),
        );
        match result {
            Ok((node, stats, repos)) => LoadedRoute::NodeListing(NodeListingLoaded {
                base_url: base_url.clone(),
                page_index,
                node,
                stats,
                repos,
            }),
            Err(e) => {
                tracing::warn!(node = %base_url.origin(), error = %e, "Node load failed");
                handle_node_error(&e)
            }
        }
    }

    async fn load_user(&self, base_url: &BaseUrl, did: &str) -> LoadedRoute {
        if !is_valid_did(did) {
            return invalid_did(did);
        }
        let result = tokio::try_join!(
            self.api.get_node(base_url),
            self.api.get_repos_by_delegate(base_url, did),
        );
        match result {
            Ok((node, repos)) => LoadedRoute::User(UserLoaded {
                base_url: base_url.clone(),
                did: did.to_string(),
                node,
                repos,
            }),
            Err(e) => {
                tracing::warn!(node = %base_url.origin(), did, error = %e, "User load failed");
                handle_user_error(&e, base_url)
            }
        }
    }

    async fn load_repo(
        &self,
        route: &RepoRoute,
        previous: &LoadedRoute,
    ) -> Result<LoadedRoute, LoadError> {
        match route {
            RepoRoute::Source(r) => self.load_tree_view(r, previous).await,
            RepoRoute::History(r) => self.load_history_view(r, previous).await,
            RepoRoute::Commit(r) => self.load_commit_view(r).await,
            RepoRoute::Issues(r) => self.load_issues_view(r).await,
            RepoRoute::Issue(r) => self.load_issue_view(r).await,
            RepoRoute::Patches(r) => self.load_patches_view(r).await,
            RepoRoute::Patch(r) => self.load_patch_view(r, previous).await,
        }
    }

    async fn fetch_context(&self, node: &BaseUrl, rid: &str) -> Result<RepoContext, ApiError> {
        let (repo, seeding_policy, seed) = tokio::try_join!(
            self.api.get_by_rid(node, rid),
            self.api.get_policy_by_rid(node, rid),
            self.api.get_node(node),
        )?;
        Ok(RepoContext {
            base_url: node.clone(),
            seeding_policy,
            repo: Arc::new(repo),
            node_avatar_url: seed.avatar_url,
        })
    }

    /// Repository context plus the peers that have at least one branch.
    async fn fetch_browse_context(
        &self,
        node: &BaseUrl,
        rid: &str,
    ) -> Result<(RepoContext, Arc<Vec<Remote>>), ApiError> {
        let (context, remotes) = tokio::try_join!(
            self.fetch_context(node, rid),
            self.api.get_all_remotes(node, rid),
        )?;
        let peers = remotes
            .into_iter()
            .filter(|remote| !remote.heads.is_empty())
            .collect();
        Ok((context, Arc::new(peers)))
    }

    /// Context and peers from the previous view when it browsed the same
    /// repository and peer, otherwise fetched.
    async fn browse_context(
        &self,
        node: &BaseUrl,
        rid: &str,
        peer: Option<&str>,
        previous: &LoadedRoute,
    ) -> Result<(RepoContext, Arc<Vec<Remote>>), ApiError> {
        match previous_browse(previous, node, rid) {
            Some((context, browse)) if browse.peer.as_deref() == peer => {
                tracing::trace!(rid, "Reusing repository data");
                Ok((context.clone(), Arc::clone(&browse.peers)))
            }
            _ => self.fetch_browse_context(node, rid).await,
        }
    }

    async fn load_tree_view(
        &self,
        route: &SourceRoute,
        previous: &LoadedRoute,
    ) -> Result<LoadedRoute, LoadError> {
        let node = &route.node;
        let rid = route.repo.as_str();
        let (context, peers) = self
            .browse_context(node, rid, route.peer.as_deref(), previous)
            .await?;

        let repo = Arc::clone(&context.repo);
        let default = default_branch(&repo)?;
        let branches = match branch_map(&repo, route.peer.as_deref(), &peers)? {
            Ok(branches) => branches,
            Err(not_found) => return Ok(not_found),
        };

        let (revision, path) = match &route.route {
            Some(raw) => {
                let detected = detect_revision(raw, &branches);
                (detected.revision, detected.path)
            }
            None => (route.revision.clone(), route.path.clone().unwrap_or_default()),
        };
        let path = if path.is_empty() { "/".to_string() } else { path };
        let commit = parse_revision_to_oid(revision.as_deref(), default, &branches)?;

        let tree = self.api.get_tree(node, rid, &commit, None);
        let blob = async {
            let result = if path == "/" {
                self.api.get_readme(node, rid, &commit).await
            } else {
                self.api.get_blob(node, rid, &commit, &path).await
            };
            blob_result(result, &path)
        };
        let (tree, blob_result) = tokio::join!(tree, blob);

        Ok(LoadedRoute::Repo(RepoLoaded::Source(SourceLoaded {
            context,
            browse: BrowseState {
                commit,
                peers,
                peer: route.peer.clone(),
                revision,
                tree: Arc::new(tree?),
            },
            path,
            blob_result,
        })))
    }

    async fn load_history_view(
        &self,
        route: &HistoryRoute,
        previous: &LoadedRoute,
    ) -> Result<LoadedRoute, LoadError> {
        let node = &route.node;
        let rid = route.repo.as_str();
        let (context, peers) = self
            .browse_context(node, rid, route.peer.as_deref(), previous)
            .await?;

        let repo = Arc::clone(&context.repo);
        let default = default_branch(&repo)?;
        let branches = match branch_map(&repo, route.peer.as_deref(), &peers)? {
            Ok(branches) => branches,
            Err(not_found) => return Ok(not_found),
        };
        let commit =
            parse_revision_to_oid(route.revision.as_deref(), default, &branches)?;

        let reused_tree = previous_browse(previous, node, rid)
            .filter(|(_, browse)| browse.commit == commit)
            .map(|(_, browse)| Arc::clone(&browse.tree));
        let tree = async {
            match reused_tree {
                Some(tree) => Ok(tree),
                None => self.api.get_tree(node, rid, &commit, None).await.map(Arc::new),
            }
        };
        let query = CommitsQuery {
            parent: Some(commit.clone()),
            page: 0,
            per_page: self.config.source.commits_per_page,
        };
        let (tree, commit_headers) =
            tokio::try_join!(tree, self.api.get_all_commits(node, rid, &query))?;

        Ok(LoadedRoute::Repo(RepoLoaded::History(HistoryLoaded {
            context,
            browse: BrowseState {
                commit,
                peers,
                peer: route.peer.clone(),
                revision: route.revision.clone(),
                tree,
            },
            commit_headers,
        })))
    }

    async fn load_commit_view(&self, route: &CommitRoute) -> Result<LoadedRoute, LoadError> {
        let (context, commit) = tokio::try_join!(
            self.fetch_context(&route.node, &route.repo),
            self.api
                .get_commit_by_sha(&route.node, &route.repo, &route.commit),
        )?;
        Ok(LoadedRoute::Repo(RepoLoaded::Commit(CommitLoaded {
            context,
            commit,
        })))
    }

    async fn load_issues_view(&self, route: &IssuesRoute) -> Result<LoadedRoute, LoadError> {
        let status = route.status.unwrap_or(IssueStatus::Open);
        let query = ListQuery {
            page: 0,
            per_page: self.config.loader.issues_per_page,
            status: status.as_str().to_string(),
        };
        let (context, issues) = tokio::try_join!(
            self.fetch_context(&route.node, &route.repo),
            self.api.get_all_issues(&route.node, &route.repo, &query),
        )?;
        Ok(LoadedRoute::Repo(RepoLoaded::Issues(IssuesLoaded {
            context,
            issues,
            status,
        })))
    }

    async fn load_issue_view(&self, route: &IssueRoute) -> Result<LoadedRoute, LoadError> {
        let (context, issue) = tokio::try_join!(
            self.fetch_context(&route.node, &route.repo),
            self.api
                .get_issue_by_id(&route.node, &route.repo, &route.issue),
        )?;
        Ok(LoadedRoute::Repo(RepoLoaded::Issue(IssueLoaded {
            context,
            issue,
        })))
    }

    async fn load_patches_view(&self, route: &PatchesRoute) -> Result<LoadedRoute, LoadError> {
        let status = route
            .search
            .as_deref()
            .and_then(search_status)
            .unwrap_or_else(|| "open".to_string());
        let query = ListQuery {
            page: 0,
            per_page: self.config.loader.patches_per_page,
            status: status.clone(),
        };
        let (context, patches) = tokio::try_join!(
            self.fetch_context(&route.node, &route.repo),
            self.api.get_all_patches(&route.node, &route.repo, &query),
        )?;
        Ok(LoadedRoute::Repo(RepoLoaded::Patches(PatchesLoaded {
            context,
            patches,
            status,
        })))
    }

    async fn load_patch_view(
        &self,
        route: &PatchRoute,
        previous: &LoadedRoute,
    ) -> Result<LoadedRoute, LoadError> {
        let node = &route.node;
        let rid = route.repo.as_str();

        let reused = match previous {
            LoadedRoute::Repo(RepoLoaded::Patch(loaded))
                if loaded.context.base_url == *node
                    && loaded.context.repo.rid == rid
                    && loaded.patch.id == route.patch =>
            {
                Some((loaded.context.clone(), Arc::clone(&loaded.patch), loaded.stats))
            }
            _ => None,
        };

        let (context, patch, reused_stats) = match reused {
            Some((context, patch, stats)) => (context, patch, Some(stats)),
            None => {
                let (context, patch) = tokio::try_join!(
                    self.fetch_context(node, rid),
                    self.api.get_patch_by_id(node, rid, &route.patch),
                )?;
                (context, Arc::new(patch), None)
            }
        };

        let latest = patch
            .revisions
            .last()
            .ok_or_else(|| LoadError::EmptyPatch(patch.id.clone()))?;

        let stats = async {
            match reused_stats {
                Some(stats) => Ok(stats),
                None => self
                    .api
                    .get_diff(node, rid, &latest.base, &latest.oid)
                    .await
                    .map(|response| response.diff.stats),
            }
        };
        let view = self.resolve_patch_view(node, rid, &patch, latest, route.view.as_ref());
        let (stats, view): (DiffStats, LoadedPatchView) = tokio::try_join!(stats, view)?;

        Ok(LoadedRoute::Repo(RepoLoaded::Patch(PatchLoaded {
            context,
            patch,
            stats,
            view,
        })))
    }

    async fn resolve_patch_view(
        &self,
        node: &BaseUrl,
        rid: &str,
        patch: &Patch,
        latest: &Revision,
        view: Option<&PatchView>,
    ) -> Result<LoadedPatchView, ApiError> {
        match view {
            None | Some(PatchView::Activity) => Ok(LoadedPatchView::Activity {
                revision: latest.id.clone(),
            }),
            Some(PatchView::Changes { revision }) => {
                let revision = revision
                    .as_deref()
                    .and_then(|id| patch.revisions.iter().find(|r| r.id == id))
                    .unwrap_or(latest);
                let response = self
                    .api
                    .get_diff(node, rid, &revision.base, &revision.oid)
                    .await?;
                Ok(LoadedPatchView::Changes {
                    revision: revision.id.clone(),
                    oid: revision.oid.clone(),
                    diff: response.diff,
                    commits: response.commits,
                    files: response.files,
                })
            }
            Some(PatchView::Diff {
                from_commit,
                to_commit,
            }) => {
                let response = self
                    .api
                    .get_diff(node, rid, from_commit.as_str(), to_commit.as_str())
                    .await?;
                Ok(LoadedPatchView::Diff {
                    from_commit: from_commit.clone(),
                    to_commit: to_commit.clone(),
                    diff: response.diff,
                    files: response.files,
                })
            }
        }
    }
}

/// The source or history view of `rid` on `node`, if that is what `previous` shows.
fn previous_browse<'a>(
    previous: &'a LoadedRoute,
    node: &BaseUrl,
    rid: &str,
) -> Option<(&'a RepoContext, &'a BrowseState)> {
    let (context, browse) = match previous {
        LoadedRoute::Repo(RepoLoaded::Source(l)) => (&l.context, &l.browse),
        LoadedRoute::Repo(RepoLoaded::History(l)) => (&l.context, &l.browse),
        _ => return None,
    };
    (context.base_url == *node && context.repo.rid == rid).then_some((context, browse))
}

fn default_branch(repo: &Repo) -> Result<&str, LoadError> {
    repo.project()
        .map(|project| project.data.default_branch.as_str())
        .ok_or_else(|| LoadError::MissingProject(repo.rid.clone()))
}

/// Branches visible for the view: the peer's heads, or the canonical default
/// branch when no peer is selected. An unknown peer yields the `notFound`
/// route to show instead.
fn branch_map(
    repo: &Repo,
    peer: Option<&str>,
    peers: &[Remote],
) -> Result<Result<BranchMap, LoadedRoute>, LoadError> {
    let project = repo
        .project()
        .ok_or_else(|| LoadError::MissingProject(repo.rid.clone()))?;
    match peer {
        None => Ok(Ok(BTreeMap::from([(
            project.data.default_branch.clone(),
            project.meta.head.clone(),
        )]))),
        Some(peer) => match peers.iter().find(|remote| remote.id == peer) {
            Some(remote) => Ok(Ok(remote.heads.clone())),
            None => Ok(Err(LoadedRoute::not_found(format!(
                "Peer {peer} could not be found"
            )))),
        },
    }
}

fn blob_result(result: Result<Blob, ApiError>, path: &str) -> BlobResult {
    match result {
        Ok(blob) => BlobResult::Loaded { blob },
        Err(e) => {
            tracing::debug!(path, error = %e, "Blob load failed");
            let message = if path == "/" {
                "The README could not be loaded"
            } else {
                "Not able to load file"
            };
            BlobResult::Failed {
                status: e.status(),
                message: message.to_string(),
                path: path.to_string(),
            }
        }
    }
}

/// `status` value of a patch listing search string such as `status=merged`.
fn search_status(search: &str) -> Option<String> {
    url::form_urlencoded::parse(search.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == "status")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

const BASE58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// `did:key:` followed by a multibase (`z`, base58btc) key.
pub fn is_valid_did(did: &str) -> bool {
    did.strip_prefix("did:key:z")
        .map(|key| !key.is_empty() && key.chars().all(|c| BASE58.contains(c)))
        .unwrap_or(false)
}
