//! Router metrics.
//!
//! # Metrics
//! - `router_navigations_total` (counter): navigations by kind (push, replace, pop, url)
//! - `router_route_loads_total` (counter): loads by resource and outcome
//! - `router_route_load_duration_seconds` (histogram): load latency by resource
//! - `router_stale_loads_total` (counter): loads discarded because a newer one started
//! - `router_decode_failures_total` (counter): locations that matched no route
//! - `router_history_depth` (gauge): entries in the navigation stack
//!
//! # Design Decisions
//! - Labels only carry bounded values (resource names, fixed kinds)
//! - The recorder is the Prometheus one, rendered on demand instead of served

use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::ObservabilityConfig;

/// Install the global Prometheus recorder when metrics are enabled.
///
/// Returns the handle used to render the exposition text, or `None` when
/// metrics are disabled or a recorder is already installed.
pub fn init_metrics(config: &ObservabilityConfig) -> Option<PrometheusHandle> {
    if !config.metrics_enabled {
        return None;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            tracing::debug!("Metrics recorder installed");
            Some(handle)
        }
        Err(error) => {
            tracing::warn!(error = %error, "Failed to install metrics recorder");
            None
        }
    }
}

pub fn record_navigation(kind: &'static str) {
    metrics::counter!("router_navigations_total", "kind" => kind).increment(1);
}

pub fn record_load(resource: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "router_route_loads_total",
        "resource" => resource,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("router_route_load_duration_seconds", "resource" => resource)
        .record(elapsed.as_secs_f64());
}

pub fn record_stale_load() {
    metrics::counter!("router_stale_loads_total").increment(1);
}

pub fn record_decode_failure() {
    metrics::counter!("router_decode_failures_total").increment(1);
}

pub fn set_history_depth(depth: usize) {
    metrics::gauge!("router_history_depth").set(depth as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_installs_nothing() {
        let config = ObservabilityConfig {
            metrics_enabled: false,
            ..ObservabilityConfig::default()
        };
        assert!(init_metrics(&config).is_none());
    }

    #[test]
    fn test_records_through_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_navigation("push");
            record_navigation("push");
            record_navigation("pop");
            record_stale_load();
            record_decode_failure();
            set_history_depth(3);
            record_load("repo.issues", "loaded", Duration::from_millis(5));
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"router_navigations_total{kind="push"} 2"#));
        assert!(rendered.contains(r#"router_navigations_total{kind="pop"} 1"#));
        assert!(rendered.contains("router_stale_loads_total 1"));
        assert!(rendered.contains("router_decode_failures_total 1"));
        assert!(rendered.contains("router_history_depth 3"));
        assert!(rendered.contains("router_route_loads_total{"));
        assert!(rendered.contains("router_route_load_duration_seconds"));
    }
}
