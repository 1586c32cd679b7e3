//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::Scheme;

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Seed node addressing defaults.
    pub nodes: NodesConfig,

    /// Navigation history settings.
    pub history: HistoryConfig,

    /// Source browsing settings.
    pub source: SourceConfig,

    /// Route loader settings.
    pub loader: LoaderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Seed node addressing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NodesConfig {
    /// Port assumed when a seed host is given without one.
    pub default_httpd_port: u16,

    /// Scheme assumed for non-local seed hosts.
    pub default_httpd_scheme: Scheme,

    /// Seeds shown on the home view (`host` or `host:port`).
    pub preferred_seeds: Vec<String>,
}

impl Default for NodesConfig {
    fn default() -> Self {
        Self {
            default_httpd_port: 443,
            default_httpd_scheme: Scheme::Https,
            preferred_seeds: vec!["seed.radicle.garden".to_string()],
        }
    }
}

/// Navigation history configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of routes kept in the in-memory stack.
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 10 }
    }
}

/// Source browsing configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Commit headers fetched per history page.
    pub commits_per_page: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            commits_per_page: 30,
        }
    }
}

/// Route loader configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Issues fetched per listing page.
    pub issues_per_page: u32,

    /// Patches fetched per listing page.
    pub patches_per_page: u32,

    /// Repositories fetched per node listing page.
    pub repos_per_page: u32,

    /// Seed API request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Refuse to browse repositories on local nodes.
    pub reject_local_nodes: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            issues_per_page: 10,
            patches_per_page: 10,
            repos_per_page: 10,
            request_timeout_secs: 10,
            reject_local_nodes: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record navigation metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}
