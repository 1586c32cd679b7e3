//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! codec, history, loader, navigator produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → stderr (fmt layer, filtered by RUST_LOG or config)
//!     → Prometheus recorder installed by init_metrics (rendered by the CLI)
//! ```
//!
//! # Design Decisions
//! - The recorder is installed only when `metrics_enabled` is set; otherwise updates are no-ops
//! - Log level configurable via config and environment
//! - Logging init is idempotent so tests and the CLI can both call it

pub mod logging;
pub mod metrics;
