//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, page sizes, stack bound)
//! - Check preferred seeds parse as `host` or `host:port`
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::RouterConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("nodes.default_httpd_port must be non-zero")]
    ZeroPort,

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("preferred seed '{0}' is not a valid host[:port]")]
    InvalidSeed(String),

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.nodes.default_httpd_port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    let counts = [
        ("history.max_entries", config.history.max_entries as u64),
        ("source.commits_per_page", config.source.commits_per_page as u64),
        ("loader.issues_per_page", config.loader.issues_per_page as u64),
        ("loader.patches_per_page", config.loader.patches_per_page as u64),
        ("loader.repos_per_page", config.loader.repos_per_page as u64),
        ("loader.request_timeout_secs", config.loader.request_timeout_secs),
    ];
    for (field, value) in counts {
        if value == 0 {
            errors.push(ValidationError::ZeroValue { field });
        }
    }

    for seed in &config.nodes.preferred_seeds {
        if !is_valid_seed(seed) {
            errors.push(ValidationError::InvalidSeed(seed.clone()));
        }
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_seed(seed: &str) -> bool {
    if seed.is_empty() || seed.contains('/') {
        return false;
    }
    match seed.split_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().map_or(false, |p| p > 0),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RouterConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RouterConfig::default();
        config.nodes.default_httpd_port = 0;
        config.history.max_entries = 0;
        config.nodes.preferred_seeds = vec!["seed.example.org:notaport".into()];
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroPort));
        assert!(errors.contains(&ValidationError::ZeroValue {
            field: "history.max_entries"
        }));
        assert!(errors.contains(&ValidationError::UnknownLogLevel("loud".into())));
    }

    #[test]
    fn test_seed_formats() {
        assert!(is_valid_seed("seed.example.org"));
        assert!(is_valid_seed("seed.example.org:8080"));
        assert!(!is_valid_seed("seed.example.org:0"));
        assert!(!is_valid_seed(":8080"));
        assert!(!is_valid_seed("https://seed.example.org"));
    }
}
