//! Native history seam.
//!
//! # Responsibilities
//! - Abstract the browser History API (`pushState`, `replaceState`, `back`)
//! - Deliver `popstate` / `hashchange` notifications to registered listeners
//!
//! # Design Decisions
//! - Listeners receive events over an unbounded mpsc channel; the browser never
//!   waits on the application, so neither does the provider
//! - State payloads are JSON values, the native equivalent of structured clone

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Handle returned by [`HistoryProvider::add_listener`].
pub type ListenerId = u64;

/// Notification from the native history.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    /// The active entry changed (back, forward, anchor click).
    PopState { state: Option<Value>, location: Url },
    /// Only the fragment of the location changed.
    HashChange { old_location: Url, new_location: Url },
}

/// The native history refused an entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("history entry rejected: {0}")]
    Rejected(String),

    #[error("invalid history url: {0}")]
    InvalidUrl(String),
}

/// Browser-like history backend.
pub trait HistoryProvider: Send {
    /// Add an entry after the current one, discarding any forward entries.
    fn push_state(&mut self, state: Value, url: &str) -> Result<(), ProviderError>;

    /// Overwrite the current entry.
    fn replace_state(&mut self, state: Value, url: &str) -> Result<(), ProviderError>;

    /// Move one entry back. The change is reported later as a `PopState` event.
    fn back(&mut self);

    /// Location of the current entry.
    fn location(&self) -> Url;

    /// State payload of the current entry, `None` for entries created without one.
    fn state(&self) -> Option<Value>;

    fn add_listener(&mut self) -> (ListenerId, mpsc::UnboundedReceiver<HistoryEvent>);

    fn remove_listener(&mut self, id: ListenerId);
}
