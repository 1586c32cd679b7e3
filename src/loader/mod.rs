//! Route loading subsystem.
//!
//! # Data Flow
//! ```text
//! Route + previous LoadedRoute
//!     → seed_loader.rs (pick view, reuse unchanged data)
//!     → api.rs SeedApi (http.rs against a seed, mock.rs in tests)
//!     → error.rs (failures → notFound / error routes)
//!     → Return: LoadedRoute (loaded.rs)
//! ```
//!
//! # Design Decisions
//! - The loader is a trait seam; the navigator never talks HTTP itself
//! - Loading is infallible at the boundary, errors become displayable routes
//! - Reusable data is `Arc`-shared so reuse never mutates the previous route

pub mod api;
pub mod error;
pub mod http;
pub mod loaded;
pub mod mock;
pub mod seed_loader;
pub mod types;

pub use api::{ApiError, SeedApi};
pub use error::{handle_error, handle_node_error, LoadError};
pub use http::HttpSeedApi;
pub use loaded::{
    BlobResult, BrowseState, CommitLoaded, HistoryLoaded, IssueLoaded, IssuesLoaded,
    LoadedPatchView, LoadedRoute, NodeListingLoaded, PatchLoaded, PatchesLoaded, RepoContext,
    RepoLoaded, SourceLoaded, UserLoaded,
};
pub use mock::{FailOn, MockCall, MockMethod, MockSeedApi, RepoFixture};
pub use seed_loader::{is_valid_did, RouteLoader, SeedLoader};
