//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Browser location (path, query, fragment)
//!     → codec.rs (grammar: /seeds/<host>/<rid>/<keyword>/...)
//!     → node.rs (host segment → BaseUrl)
//!     → revision.rs (tree remainder → revision + path, given a branch map)
//!     → Return: Route or None (caller maps None to notFound)
//!
//! Route
//!     → codec.rs (canonical path)
//!     → history (pushed as URL + serialized state)
//! ```
//!
//! # Design Decisions
//! - Routes are immutable values; navigation always builds a new one
//! - Pure functions only, no I/O in this subsystem
//! - Deterministic: same location and branch map always decode the same route
//! - Revision detection prefers the longest branch name (see revision.rs)

pub mod codec;
pub mod node;
pub mod oid;
pub mod revision;
pub mod route;

pub use codec::{path_to_route, resolve_location, route_to_path, url_to_route, RouteContext};
pub use node::{extract_base_url, node_path, BaseUrl, Scheme};
pub use oid::{is_commit_id, is_oid, Oid, TypeError};
pub use revision::{detect_revision, parse_revision_to_oid, BranchMap, DetectedRevision, RevisionNotFound};
pub use route::{
    CommitRoute, HistoryRoute, IssueRoute, IssueStatus, IssuesRoute, PatchRoute, PatchView,
    PatchesRoute, RepoRoute, Route, SourceRoute,
};
