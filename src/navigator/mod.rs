//! Navigation orchestration.
//!
//! # Data Flow
//! ```text
//! push / replace / navigate_to_url / back
//!     → sequence.rs (take a load ticket)
//!     → RouteLoader::load (route + previous loaded route)
//!     → ticket still current?
//!         no  → discard (Superseded)
//!         yes → NavigationHistory write, publish on `active`, clear `loading`
//! ```
//!
//! # Design Decisions
//! - Last navigation wins; earlier loads are not cancelled, only ignored
//! - State is published over `tokio::sync::watch` so views can subscribe

pub mod controller;
pub mod sequence;

pub use controller::{HistoryAction, NavigationOutcome, Navigator};
pub use sequence::{LoadSequencer, LoadTicket};
