//! `HttpSeedApi` against a raw TCP mock seed.

use std::sync::{Arc, Mutex};

use seed_router::config::LoaderConfig;
use seed_router::loader::types::{CommitsQuery, SeedingPolicy};
use seed_router::loader::{
    ApiError, HttpSeedApi, LoadedRoute, RouteLoader, SeedApi, SeedLoader,
};
use seed_router::routing::{BaseUrl, Route, Scheme};

mod common;

use common::{config, repo, HEAD, RID};

fn base_url(addr: std::net::SocketAddr) -> BaseUrl {
    BaseUrl {
        hostname: addr.ip().to_string(),
        port: addr.port(),
        scheme: Scheme::Http,
    }
}

#[tokio::test]
async fn test_decodes_repository() {
    let body = serde_json::to_string(&repo()).unwrap();
    let addr = common::start_programmable_backend(move |target| {
        let body = body.clone();
        async move {
            if target == format!("/api/v1/repos/{RID}") {
                (200, body)
            } else {
                (404, r#"{"message":"Not Found","code":404}"#.to_string())
            }
        }
    })
    .await;

    let api = HttpSeedApi::new(&LoaderConfig::default()).unwrap();
    let repo = api.get_by_rid(&base_url(addr), RID).await.unwrap();
    assert_eq!(repo.project().unwrap().data.name, "heartwood");
}

#[tokio::test]
async fn test_error_status_uses_message_field() {
    let addr = common::start_programmable_backend(|_| async {
        (404, r#"{"message":"Repository not found","code":404}"#.to_string())
    })
    .await;

    let api = HttpSeedApi::new(&LoaderConfig::default()).unwrap();
    let err = api.get_by_rid(&base_url(addr), RID).await.unwrap_err();
    match err {
        ApiError::Response {
            status, message, ..
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Repository not found");
        }
        other => panic!("expected response error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_without_json_body() {
    let addr = common::start_programmable_backend(|_| async {
        (500, "internal error".to_string())
    })
    .await;

    let api = HttpSeedApi::new(&LoaderConfig::default()).unwrap();
    let err = api.get_node(&base_url(addr)).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(matches!(err, ApiError::Response { ref message, .. } if message == "Response error"));
}

#[tokio::test]
async fn test_schema_mismatch_is_parse_error() {
    let addr = common::start_programmable_backend(|_| async {
        (200, r#"{"policy":"sometimes"}"#.to_string())
    })
    .await;

    let api = HttpSeedApi::new(&LoaderConfig::default()).unwrap();
    let result: Result<SeedingPolicy, _> = api.get_policy_by_rid(&base_url(addr), RID).await;
    assert!(matches!(result, Err(ApiError::Parse { .. })));
}

#[tokio::test]
async fn test_commit_query_parameters() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let addr = common::start_programmable_backend(move |target| {
        recorded.lock().unwrap().push(target);
        async { (200, "[]".to_string()) }
    })
    .await;

    let api = HttpSeedApi::new(&LoaderConfig::default()).unwrap();
    let query = CommitsQuery {
        parent: Some(HEAD.into()),
        page: 0,
        per_page: 30,
    };
    let commits = api
        .get_all_commits(&base_url(addr), RID, &query)
        .await
        .unwrap();
    assert!(commits.is_empty());

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen.as_slice(),
        [format!("/api/v1/repos/{RID}/commits?parent={HEAD}&page=0&perPage=30")]
    );
}

#[tokio::test]
async fn test_loader_maps_seed_failure_to_error_route() {
    let addr = common::start_programmable_backend(|_| async {
        (503, r#"{"message":"Service Unavailable"}"#.to_string())
    })
    .await;

    let config = config();
    let api = HttpSeedApi::new(&config.loader).unwrap();
    let loader = SeedLoader::new(api, config);

    let route = Route::Repo(seed_router::routing::RepoRoute::Issues(
        seed_router::routing::IssuesRoute {
            node: base_url(addr),
            repo: RID.into(),
            status: None,
        },
    ));
    let loaded = loader.load(&route, &LoadedRoute::Booting).await;
    let LoadedRoute::Error { title, description } = loaded else {
        panic!("expected error route");
    };
    assert_eq!(title, "Could not load this repository");
    assert!(description.contains(&addr.port().to_string()));
}
