//! Load failure mapping.
//!
//! Fetch failures never escape the loader: they become `notFound` or `error`
//! loaded routes with a human title.

use thiserror::Error;

use crate::loader::api::ApiError;
use crate::loader::loaded::LoadedRoute;
use crate::routing::{BaseUrl, RepoRoute, RevisionNotFound};

const UNKNOWN_ERROR: &str = "You stumbled on an unknown error, we aren't exactly sure what happened.";

/// Failures while loading a repository route.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Revision(#[from] RevisionNotFound),

    #[error("Repository {0} does not have a xyz.radicle.project payload.")]
    MissingProject(String),

    #[error("Patch {0} has no revisions")]
    EmptyPatch(String),
}

/// Map a repository load failure to the route shown instead.
pub fn handle_error(error: &LoadError, route: &RepoRoute) -> LoadedRoute {
    let url = route.node().origin();
    match error {
        LoadError::Api(api) if api.is_not_found() => {
            let subject = match route {
                RepoRoute::Commit(_) => "Commit",
                RepoRoute::Issue(_) => "Issue",
                RepoRoute::Patch(_) => "Patch",
                _ => "Repository",
            };
            LoadedRoute::not_found(format!("{subject} not found"))
        }
        LoadError::Api(ApiError::Response { .. }) => LoadedRoute::error(
            "Could not load this repository",
            format!("Make sure you are able to connect to the seed {url}."),
        ),
        LoadError::Api(ApiError::Parse { .. }) => LoadedRoute::error(
            "Could not parse the request",
            "The response received from the seed does not match the expected schema.",
        ),
        _ => LoadedRoute::error("Could not load this repository", UNKNOWN_ERROR),
    }
}

/// Map a node listing failure. An unreachable node reads as "not found".
pub fn handle_node_error(error: &ApiError) -> LoadedRoute {
    match error {
        ApiError::Network(_) => LoadedRoute::not_found("Node not found"),
        other => LoadedRoute::error("Not able to load this node", other.to_string()),
    }
}

/// Shown for routes pointing at a local node when local browsing is disabled.
pub fn local_node_rejected() -> LoadedRoute {
    LoadedRoute::error(
        "Local node browsing not supported",
        "You're trying to access a repository on a local node from your browser.",
    )
}

pub fn invalid_did(did: &str) -> LoadedRoute {
    tracing::debug!(did, "Invalid user DID");
    LoadedRoute::error(
        "Invalid user DID provided",
        "The provided DID is invalid. Please review the identifier for any errors and try again.",
    )
}

/// Unreachable seeds for user pages.
pub fn handle_user_error(error: &ApiError, base_url: &BaseUrl) -> LoadedRoute {
    match error {
        ApiError::Network(_) => LoadedRoute::not_found("Node not found"),
        ApiError::Parse { .. } => LoadedRoute::error(
            "Could not parse the request",
            "The response received from the seed does not match the expected schema.",
        ),
        ApiError::Response { .. } => LoadedRoute::error(
            "Could not load this node",
            format!(
                "You're trying to access a node that is not reachable, make sure the address {} is correct.",
                base_url.origin()
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{CommitRoute, IssueRoute, IssuesRoute, Scheme};

    fn node() -> BaseUrl {
        BaseUrl {
            hostname: "seed.example.org".into(),
            port: 8080,
            scheme: Scheme::Http,
        }
    }

    fn commit_route() -> RepoRoute {
        RepoRoute::Commit(CommitRoute {
            node: node(),
            repo: "rid".into(),
            commit: "abc".into(),
        })
    }

    #[test]
    fn test_not_found_subjects() {
        let error = LoadError::Api(ApiError::not_found("x"));
        assert_eq!(
            handle_error(&error, &commit_route()),
            LoadedRoute::not_found("Commit not found")
        );

        let issue = RepoRoute::Issue(IssueRoute {
            node: node(),
            repo: "rid".into(),
            issue: "i1".into(),
        });
        assert_eq!(handle_error(&error, &issue), LoadedRoute::not_found("Issue not found"));

        let issues = RepoRoute::Issues(IssuesRoute {
            node: node(),
            repo: "rid".into(),
            status: None,
        });
        assert_eq!(
            handle_error(&error, &issues),
            LoadedRoute::not_found("Repository not found")
        );
    }

    #[test]
    fn test_response_error_mentions_seed() {
        let error = LoadError::Api(ApiError::Response {
            url: "x".into(),
            status: 500,
            message: "boom".into(),
        });
        let LoadedRoute::Error { title, description } = handle_error(&error, &commit_route()) else {
            panic!("expected error route");
        };
        assert_eq!(title, "Could not load this repository");
        assert!(description.contains("http://seed.example.org:8080"));
    }

    #[test]
    fn test_parse_and_unknown_errors() {
        let parse = LoadError::Api(ApiError::Parse {
            url: "x".into(),
            message: "missing field".into(),
        });
        assert!(matches!(
            handle_error(&parse, &commit_route()),
            LoadedRoute::Error { title, .. } if title == "Could not parse the request"
        ));

        let revision = LoadError::Revision(RevisionNotFound("nope".into()));
        assert!(matches!(
            handle_error(&revision, &commit_route()),
            LoadedRoute::Error { description, .. } if description == UNKNOWN_ERROR
        ));
    }

    #[test]
    fn test_node_errors() {
        assert_eq!(
            handle_node_error(&ApiError::Network("connection refused".into())),
            LoadedRoute::not_found("Node not found")
        );
        assert!(matches!(
            handle_node_error(&ApiError::not_found("x")),
            LoadedRoute::Error { title, .. } if title == "Not able to load this node"
        ));
    }
}
