//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use seed_router::config::{NodesConfig, RouterConfig};
use seed_router::loader::types::{
    Author, Blob, CommitHeader, Committer, Diff, DiffResponse, DiffStats, Issue, IssueState,
    Patch, PatchState, Person, ProjectData, ProjectMeta, ProjectPayload, Remote, Repo,
    RepoPayloads, Revision, Tree,
};
use seed_router::loader::{MockSeedApi, RepoFixture};
use seed_router::routing::{BaseUrl, BranchMap, Scheme};

pub const RID: &str = "rad:z3gqcJUoA1n9HaHKufZs5FCSGazv5";
pub const HEAD: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const RELEASE: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const BASE: &str = "cccccccccccccccccccccccccccccccccccccccc";
pub const PEER: &str = "z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";

/// Config whose default seed port is 8080 over plain HTTP.
pub fn config() -> RouterConfig {
    let mut config = RouterConfig::default();
    config.nodes = nodes();
    config
}

pub fn nodes() -> NodesConfig {
    NodesConfig {
        default_httpd_port: 8080,
        default_httpd_scheme: Scheme::Http,
        ..NodesConfig::default()
    }
}

pub fn seed() -> BaseUrl {
    BaseUrl {
        hostname: "seed.example.org".into(),
        port: 8080,
        scheme: Scheme::Http,
    }
}

pub fn branches() -> BranchMap {
    BranchMap::from([
        ("main".to_string(), HEAD.to_string()),
        ("release/v1".to_string(), RELEASE.to_string()),
    ])
}

pub fn header(id: &str) -> CommitHeader {
    CommitHeader {
        id: id.into(),
        author: Person {
            name: "Alice".into(),
            email: "alice@example.org".into(),
        },
        summary: format!("Commit {}", &id[..7]),
        description: String::new(),
        parents: Vec::new(),
        committer: Committer {
            name: "Alice".into(),
            email: "alice@example.org".into(),
            time: 1_700_000_000,
        },
    }
}

pub fn blob(path: &str, commit: &str) -> Blob {
    Blob {
        binary: false,
        content: Some(format!("contents of {path}")),
        name: path.rsplit('/').next().unwrap_or(path).into(),
        path: path.into(),
        last_commit: header(commit),
    }
}

pub fn author() -> Author {
    Author {
        id: format!("did:key:{PEER}"),
        alias: Some("alice".into()),
    }
}

pub fn repo() -> Repo {
    Repo {
        rid: RID.into(),
        payloads: RepoPayloads {
            project: Some(ProjectPayload {
                data: ProjectData {
                    name: "heartwood".into(),
                    description: "Radicle heartwood protocol & stack".into(),
                    default_branch: "main".into(),
                },
                meta: ProjectMeta {
                    head: HEAD.into(),
                    patches: Default::default(),
                    issues: Default::default(),
                },
            }),
        },
        delegates: vec![author()],
        threshold: 1,
        seeding: 4,
    }
}

/// A repository with one peer (`main`, `release/v1`), a README, one file,
/// an open issue and an open patch.
pub fn repo_fixture() -> RepoFixture {
    let mut fixture = RepoFixture::new(repo());
    fixture.remotes = vec![Remote {
        id: PEER.into(),
        alias: Some("alice".into()),
        heads: branches(),
        delegate: true,
    }];
    for commit in [HEAD, RELEASE] {
        fixture.trees.insert(
            commit.into(),
            Tree {
                entries: Vec::new(),
                last_commit: header(commit),
                name: String::new(),
                path: String::new(),
            },
        );
        fixture.readmes.insert(commit.into(), blob("README.md", commit));
    }
    fixture
        .blobs
        .insert((HEAD.into(), "src/lib.rs".into()), blob("src/lib.rs", HEAD));
    fixture.history = vec![header(HEAD), header(BASE)];
    fixture.commits.insert(
        HEAD.into(),
        seed_router::loader::types::Commit {
            commit: header(HEAD),
            diff: diff(),
            files: BTreeMap::new(),
            branches: vec!["main".into()],
        },
    );
    fixture.issues = vec![Issue {
        id: "d481fe6e562dd78129589d4738f171a8380fcef".into(),
        author: author(),
        title: "Crash when opening an empty repository".into(),
        state: IssueState {
            status: "open".into(),
            reason: None,
        },
        discussion: Vec::new(),
        labels: vec!["bug".into()],
    }];
    fixture.patches = vec![Patch {
        id: "e3a2b1c4d5e6f708192a3b4c5d6e7f8091a2b3c4".into(),
        author: author(),
        title: "Handle empty repositories".into(),
        state: PatchState {
            status: "open".into(),
        },
        target: "delegates".into(),
        labels: Vec::new(),
        revisions: vec![Revision {
            id: "r1".into(),
            author: Some(author()),
            description: String::new(),
            base: BASE.into(),
            oid: HEAD.into(),
            timestamp: 1_700_000_000,
        }],
    }];
    fixture.diffs.insert(
        (BASE.into(), HEAD.into()),
        DiffResponse {
            commits: vec![header(HEAD)],
            diff: diff(),
            files: BTreeMap::new(),
        },
    );
    fixture
}

pub fn diff() -> Diff {
    Diff {
        added: Vec::new(),
        deleted: Vec::new(),
        moved: Vec::new(),
        copied: Vec::new(),
        modified: Vec::new(),
        stats: DiffStats {
            files_changed: 1,
            insertions: 10,
            deletions: 2,
        },
    }
}

/// Mock seed API serving [`repo_fixture`].
pub fn mock_api() -> MockSeedApi {
    let api = MockSeedApi::new();
    api.add_repo(repo_fixture());
    api
}

/// Start a programmable mock seed on an ephemeral port.
///
/// `f` receives the request target (path and query) and returns the status
/// and JSON body to answer with.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut request = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => request.extend_from_slice(&buf[..n]),
                            }
                        }
                        let request = String::from_utf8_lossy(&request);
                        let target = request
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = f(target).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
