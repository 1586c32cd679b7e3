//! Path ↔ route codec.
//!
//! # Responsibilities
//! - Decode a browser URL (path, query, fragment) into a [`Route`]
//! - Encode a [`Route`] into its canonical path
//!
//! # Grammar
//! ```text
//! /seeds/<host>[:<port>]/<rid>[/remotes/<peer>]/<keyword>[/<revision>][/<path>][?query][#hash]
//! keyword ∈ { tree, history, commits, issues, patches }
//! ```
//!
//! # Design Decisions
//! - Pure functions; the only external input is the [`RouteContext`]
//! - Decoding never fails hard: unmatched grammar is `None`, which callers turn
//!   into `notFound` (see [`resolve_location`])
//! - `tree` is omitted when nothing follows it
//! - Without a branch map the `tree` remainder is kept raw in `route`; with one
//!   it is split by [`detect_revision`]

use url::form_urlencoded;
use url::Url;

use crate::config::NodesConfig;
use crate::observability::metrics;
use crate::routing::node::{extract_base_url, node_path, BaseUrl};
use crate::routing::oid::Oid;
use crate::routing::revision::{detect_revision, BranchMap};
use crate::routing::route::{
    CommitRoute, HistoryRoute, IssueRoute, IssueStatus, IssuesRoute, PatchRoute, PatchView,
    PatchesRoute, RepoRoute, Route, SourceRoute,
};

/// Origin used to parse relative locations.
const LOCAL_ORIGIN: &str = "http://localhost/";

/// External state the decoder needs.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub nodes: &'a NodesConfig,
    /// Branch map of the repository (or peer) being browsed, if known.
    pub branches: Option<&'a BranchMap>,
}

impl<'a> RouteContext<'a> {
    pub fn new(nodes: &'a NodesConfig) -> Self {
        Self {
            nodes,
            branches: None,
        }
    }

    pub fn with_branches(mut self, branches: &'a BranchMap) -> Self {
        self.branches = Some(branches);
        self
    }
}

/// Decode a path (optionally with query and fragment) into a route.
pub fn path_to_route(path: &str, ctx: &RouteContext<'_>) -> Option<Route> {
    let url = Url::parse(LOCAL_ORIGIN).ok()?.join(path).ok()?;
    url_to_route(&url, ctx)
}

/// Decode a location into a route, falling back to `notFound`.
pub fn resolve_location(location: &str, ctx: &RouteContext<'_>) -> Route {
    match path_to_route(location, ctx) {
        Some(route) => route,
        None => {
            tracing::debug!(location, "No route matches location");
            metrics::record_decode_failure();
            Route::page_not_found()
        }
    }
}

/// Decode a parsed URL into a route.
pub fn url_to_route(url: &Url, ctx: &RouteContext<'_>) -> Option<Route> {
    let path = url.path();
    let mut segments = Segments::new(path.strip_prefix('/').unwrap_or(path));

    match segments.shift() {
        None => Some(Route::Home),
        Some("seeds") | Some("nodes") => {
            let Some(host_and_port) = segments.shift() else {
                return Some(Route::Home);
            };
            let base_url = extract_base_url(host_and_port, ctx.nodes)?;

            match segments.shift() {
                Some("users") => {
                    let did = segments.shift()?;
                    Some(Route::User {
                        node: base_url,
                        did: did.to_string(),
                    })
                }
                Some(repo) => {
                    resolve_repo_route(base_url, repo, &mut segments, url, ctx).map(Route::Repo)
                }
                None => Some(Route::NodeListing {
                    base_url,
                    page_index: query_param(url, "page")
                        .and_then(|page| page.parse().ok())
                        .unwrap_or(0),
                }),
            }
        }
        Some(_) => None,
    }
}

fn resolve_repo_route(
    node: BaseUrl,
    repo: &str,
    segments: &mut Segments<'_>,
    url: &Url,
    ctx: &RouteContext<'_>,
) -> Option<RepoRoute> {
    let repo = repo.to_string();
    let mut content = segments.shift();
    let mut peer = None;
    if content == Some("remotes") {
        peer = Some(segments.shift()?.to_string());
        content = segments.shift();
    }

    match content {
        None | Some("tree") => {
            let mut route = SourceRoute::new(node, repo);
            route.peer = peer;
            resolve_source_remainder(&mut route, &segments.rest(), ctx);
            let (line, hash) = parse_fragment(url.fragment());
            route.line = line;
            route.hash = hash;
            Some(RepoRoute::Source(route))
        }
        Some("history") => {
            let revision = segments.rest();
            Some(RepoRoute::History(HistoryRoute {
                node,
                repo,
                peer,
                revision: (!revision.is_empty()).then_some(revision),
            }))
        }
        Some("commits") => {
            let commit = segments.shift()?;
            Some(RepoRoute::Commit(CommitRoute {
                node,
                repo,
                commit: commit.to_string(),
            }))
        }
        Some("issues") => match segments.shift() {
            Some(issue) => Some(RepoRoute::Issue(IssueRoute {
                node,
                repo,
                issue: issue.to_string(),
            })),
            None => Some(RepoRoute::Issues(IssuesRoute {
                node,
                repo,
                status: query_param(url, "status").and_then(|s| IssueStatus::parse(&s)),
            })),
        },
        Some("patches") => Some(resolve_patches_route(node, repo, segments, url)),
        Some(other) => {
            tracing::trace!(keyword = other, "Unknown repository keyword");
            None
        }
    }
}

fn resolve_source_remainder(route: &mut SourceRoute, rest: &str, ctx: &RouteContext<'_>) {
    if rest.is_empty() {
        return;
    }
    match ctx.branches {
        Some(branches) => {
            let detected = detect_revision(rest, branches);
            route.revision = detected.revision;
            route.path = normalize_path(&detected.path);
        }
        None => route.route = Some(rest.to_string()),
    }
}

/// `/` is the root and stored as `None`; other paths always start with `/`.
fn normalize_path(path: &str) -> Option<String> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

fn resolve_patches_route(
    node: BaseUrl,
    repo: String,
    segments: &mut Segments<'_>,
    url: &Url,
) -> RepoRoute {
    let Some(patch) = segments.shift() else {
        return RepoRoute::Patches(PatchesRoute {
            node,
            repo,
            search: url.query().filter(|q| !q.is_empty()).map(str::to_string),
        });
    };
    let revision = segments.shift().map(str::to_string);

    let diff_view = query_param(url, "diff").and_then(|diff| {
        let (from, to) = diff.split_once("..")?;
        Some(PatchView::Diff {
            from_commit: Oid::new(from).ok()?,
            to_commit: Oid::new(to).ok()?,
        })
    });

    let view = match diff_view {
        Some(view) => Some(view),
        None => match query_param(url, "tab").as_deref() {
            Some("changes") => Some(PatchView::Changes { revision }),
            Some("activity") => Some(PatchView::Activity),
            _ => None,
        },
    };

    RepoRoute::Patch(PatchRoute {
        node,
        repo,
        patch: patch.to_string(),
        view,
    })
}

/// Split a `#L<n>` line marker from an arbitrary anchor.
pub fn parse_fragment(fragment: Option<&str>) -> (Option<u32>, Option<String>) {
    match fragment {
        None | Some("") => (None, None),
        Some(fragment) => {
            let line = fragment
                .strip_prefix('L')
                .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|digits| digits.parse().ok());
            match line {
                Some(line) => (Some(line), None),
                None => (None, Some(fragment.to_string())),
            }
        }
    }
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    let query = url.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Encode a route into its canonical path.
///
/// `notFound` and `error` have no canonical URL and return `None`.
pub fn route_to_path(route: &Route, nodes: &NodesConfig) -> Option<String> {
    match route {
        Route::Home => Some("/".to_string()),
        Route::NodeListing {
            base_url,
            page_index,
        } => {
            let mut path = node_path(base_url, nodes);
            if *page_index > 0 {
                path.push_str(&format!("?page={page_index}"));
            }
            Some(path)
        }
        Route::User { node, did } => Some(format!("{}/users/{}", node_path(node, nodes), did)),
        Route::Repo(repo) => Some(repo_route_to_path(repo, nodes)),
        Route::NotFound { .. } | Route::Error { .. } => None,
    }
}

pub fn repo_route_to_path(route: &RepoRoute, nodes: &NodesConfig) -> String {
    let mut segments = vec![node_path(route.node(), nodes), route.repo().to_string()];

    match route {
        RepoRoute::Source(source) => {
            if let Some(peer) = &source.peer {
                segments.push("remotes".to_string());
                segments.push(peer.clone());
            }

            segments.push("tree".to_string());
            let mut omit_tree = true;

            match source.route.as_deref() {
                Some(raw) if !raw.is_empty() && raw != "/" => {
                    segments.push(raw.trim_start_matches('/').to_string());
                    omit_tree = false;
                }
                _ => {
                    if let Some(revision) = &source.revision {
                        segments.push(revision.clone());
                        omit_tree = false;
                    }
                    if let Some(path) = source.path.as_deref() {
                        let path = path.trim_start_matches('/');
                        if !path.is_empty() {
                            segments.push(path.to_string());
                            omit_tree = false;
                        }
                    }
                }
            }
            if omit_tree {
                segments.pop();
            }

            let mut url = segments.join("/");
            if let Some(line) = source.line {
                url.push_str(&format!("#L{line}"));
            } else if let Some(hash) = source.hash.as_deref().filter(|h| !h.is_empty()) {
                url.push('#');
                url.push_str(hash);
            }
            url
        }
        RepoRoute::History(history) => {
            if let Some(peer) = &history.peer {
                segments.push("remotes".to_string());
                segments.push(peer.clone());
            }
            segments.push("history".to_string());
            if let Some(revision) = &history.revision {
                segments.push(revision.clone());
            }
            segments.join("/")
        }
        RepoRoute::Commit(commit) => {
            segments.push("commits".to_string());
            segments.push(commit.commit.clone());
            segments.join("/")
        }
        RepoRoute::Issues(issues) => {
            segments.push("issues".to_string());
            let mut url = segments.join("/");
            if let Some(status) = issues.status {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("status", status.as_str())
                    .finish();
                url.push('?');
                url.push_str(&query);
            }
            url
        }
        RepoRoute::Issue(issue) => {
            segments.push("issues".to_string());
            segments.push(issue.issue.clone());
            segments.join("/")
        }
        RepoRoute::Patches(patches) => {
            segments.push("patches".to_string());
            let mut url = segments.join("/");
            if let Some(search) = patches.search.as_deref().filter(|s| !s.is_empty()) {
                url.push('?');
                url.push_str(search);
            }
            url
        }
        RepoRoute::Patch(patch) => patch_route_to_path(patch, segments),
    }
}

fn patch_route_to_path(route: &PatchRoute, mut segments: Vec<String>) -> String {
    segments.push("patches".to_string());
    segments.push(route.patch.clone());
    if let Some(PatchView::Changes {
        revision: Some(revision),
    }) = &route.view
    {
        segments.push(revision.clone());
    }

    let mut url = segments.join("/");
    let Some(view) = &route.view else {
        return url;
    };

    let mut query = form_urlencoded::Serializer::new(String::new());
    match view {
        PatchView::Diff {
            from_commit,
            to_commit,
        } => query.append_pair("diff", &format!("{from_commit}..{to_commit}")),
        other => query.append_pair("tab", other.name()),
    };
    url.push('?');
    url.push_str(&query.finish());
    url
}

/// Cursor over `/`-delimited path segments. Empty segments read as absent.
struct Segments<'a> {
    parts: Vec<&'a str>,
    pos: usize,
}

impl<'a> Segments<'a> {
    fn new(path: &'a str) -> Self {
        Self {
            parts: path.split('/').collect(),
            pos: 0,
        }
    }

    fn shift(&mut self) -> Option<&'a str> {
        let part = self.parts.get(self.pos).copied();
        if part.is_some() {
            self.pos += 1;
        }
        part.filter(|p| !p.is_empty())
    }

    /// Remaining segments joined with `/`.
    fn rest(&mut self) -> String {
        let rest = self.parts[self.pos.min(self.parts.len())..].join("/");
        self.pos = self.parts.len();
        rest
    }
}
