use thiserror::Error;

use crate::history::provider::ProviderError;

/// Navigation failures that are not recoverable into a route.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// A `popstate` payload is not a route. The codec and stored state disagree.
    #[error("history state is not a route: {0}")]
    CorruptState(#[source] serde_json::Error),

    #[error("could not serialize route state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("refusing to navigate to another origin: {0}")]
    CrossOrigin(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
