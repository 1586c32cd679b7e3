//! Navigation history subsystem.
//!
//! # Data Flow
//! ```text
//! push / replace (Route)
//!     → stack.rs (serialize state, write native entry, update bounded stack)
//!     → provider.rs (pushState / replaceState)
//!
//! Native traversal (back, forward, anchor click)
//!     → provider.rs (PopState / HashChange over mpsc)
//!     → stack.rs pump() (replace top, or update line/hash in place)
//!     → Return: Vec<HistoryChange> for the navigator to load
//! ```
//!
//! # Design Decisions
//! - The stack is owned by one `NavigationHistory`, never a global
//! - The provider is a trait so the same stack drives a browser or memory.rs
//! - Listener registration is tied to `initialize`/`teardown` (and Drop)

pub mod error;
pub mod memory;
pub mod provider;
pub mod stack;

pub use error::NavigationError;
pub use memory::MemoryHistory;
pub use provider::{HistoryEvent, HistoryProvider, ListenerId, ProviderError};
pub use stack::{HistoryChange, NavigationHistory};
