//! Client-side router for browsing repositories hosted on seed nodes.

pub mod config;
pub mod history;
pub mod loader;
pub mod navigator;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use history::{MemoryHistory, NavigationHistory};
pub use loader::{HttpSeedApi, LoadedRoute, RouteLoader, SeedLoader};
pub use navigator::{HistoryAction, NavigationOutcome, Navigator};
pub use routing::{path_to_route, route_to_path, Route, RouteContext};
