//! Seed node addressing.
//!
//! # Responsibilities
//! - Parse the `<host>[:<port>]` path segment into a [`BaseUrl`]
//! - Render a [`BaseUrl`] back into its `/seeds/...` path prefix
//!
//! # Design Decisions
//! - The default port is omitted when rendering, so the canonical path of a
//!   seed on the default port never carries `:port`
//! - Local aliases collapse to `http://127.0.0.1:<default port>`
//! - Local and `.onion` hosts never use TLS

use serde::{Deserialize, Serialize};

use crate::config::NodesConfig;

const LOCAL_ALIASES: [&str; 3] = ["radicle.local", "0.0.0.0", "127.0.0.1"];

/// URL scheme of a seed's HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a seed node's HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseUrl {
    pub hostname: String,
    pub port: u16,
    pub scheme: Scheme,
}

impl BaseUrl {
    /// Root URL of the node, e.g. `https://seed.example.org:443`.
    pub fn origin(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.hostname, self.port)
    }

    /// Whether this node runs on the local machine.
    pub fn is_local(&self) -> bool {
        is_local(&self.hostname)
    }
}

impl std::fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.origin())
    }
}

pub fn is_local(hostname: &str) -> bool {
    hostname == "127.0.0.1" || hostname == "0.0.0.0"
}

pub fn is_onion(hostname: &str) -> bool {
    hostname.ends_with(".onion")
}

/// Parse a `<host>[:<port>]` segment.
///
/// Returns `None` when the port is present but not a valid `u16`.
pub fn extract_base_url(host_and_port: &str, nodes: &NodesConfig) -> Option<BaseUrl> {
    let default_port = nodes.default_httpd_port;

    let (hostname, port) = match host_and_port.split_once(':') {
        Some((hostname, port)) => (hostname, Some(port.parse::<u16>().ok()?)),
        None => (host_and_port, None),
    };

    if LOCAL_ALIASES.contains(&hostname) && port.map_or(true, |p| p == default_port) {
        return Some(BaseUrl {
            hostname: "127.0.0.1".to_string(),
            port: default_port,
            scheme: Scheme::Http,
        });
    }

    match port {
        Some(port) => Some(BaseUrl {
            hostname: hostname.to_string(),
            port,
            scheme: if is_local(hostname) || is_onion(hostname) {
                Scheme::Http
            } else {
                nodes.default_httpd_scheme
            },
        }),
        None => Some(BaseUrl {
            hostname: hostname.to_string(),
            port: default_port,
            scheme: nodes.default_httpd_scheme,
        }),
    }
}

/// Path prefix of a seed, e.g. `/seeds/seed.example.org:8080`.
pub fn node_path(base_url: &BaseUrl, nodes: &NodesConfig) -> String {
    if base_url.port == nodes.default_httpd_port {
        format!("/seeds/{}", base_url.hostname)
    } else {
        format!("/seeds/{}:{}", base_url.hostname, base_url.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> NodesConfig {
        NodesConfig {
            default_httpd_port: 8080,
            default_httpd_scheme: Scheme::Https,
            preferred_seeds: Vec::new(),
        }
    }

    #[test]
    fn test_bare_host_uses_defaults() {
        let base = extract_base_url("seed.example.org", &nodes()).unwrap();
        assert_eq!(base.hostname, "seed.example.org");
        assert_eq!(base.port, 8080);
        assert_eq!(base.scheme, Scheme::Https);
    }

    #[test]
    fn test_local_aliases() {
        for alias in ["radicle.local", "0.0.0.0", "127.0.0.1", "radicle.local:8080"] {
            let base = extract_base_url(alias, &nodes()).unwrap();
            assert_eq!(base.hostname, "127.0.0.1", "{alias}");
            assert_eq!(base.scheme, Scheme::Http);
            assert_eq!(base.port, 8080);
        }
    }

    #[test]
    fn test_explicit_port() {
        let base = extract_base_url("seed.example.org:9000", &nodes()).unwrap();
        assert_eq!(base.port, 9000);
        assert_eq!(base.scheme, Scheme::Https);

        let local = extract_base_url("127.0.0.1:9000", &nodes()).unwrap();
        assert_eq!(local.scheme, Scheme::Http);

        let onion = extract_base_url("abc.onion:9000", &nodes()).unwrap();
        assert_eq!(onion.scheme, Scheme::Http);
    }

    #[test]
    fn test_invalid_port() {
        assert!(extract_base_url("seed.example.org:http", &nodes()).is_none());
    }

    #[test]
    fn test_node_path_omits_default_port() {
        let base = extract_base_url("seed.example.org", &nodes()).unwrap();
        assert_eq!(node_path(&base, &nodes()), "/seeds/seed.example.org");

        let other = extract_base_url("seed.example.org:9000", &nodes()).unwrap();
        assert_eq!(node_path(&other, &nodes()), "/seeds/seed.example.org:9000");
    }

    #[test]
    fn test_origin() {
        let base = extract_base_url("seed.example.org", &nodes()).unwrap();
        assert_eq!(base.origin(), "https://seed.example.org:8080");
    }
}
