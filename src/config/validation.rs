//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that the static mount is a usable path prefix
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PagesConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::PagesConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &PagesConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "http.request_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.http.max_body_bytes == 0 {
        errors.push(ValidationError::new(
            "http.max_body_bytes",
            "must be greater than zero",
        ));
    }

    let mount = &config.files.mount;
    if !mount.starts_with('/') || (mount.len() > 1 && mount.ends_with('/')) {
        errors.push(ValidationError::new(
            "files.mount",
            format!("`{mount}` must start with `/` and have no trailing `/`"),
        ));
    }
    if let Some(root) = &config.files.root {
        if !root.is_dir() {
            errors.push(ValidationError::new(
                "files.root",
                format!("`{}` is not a directory", root.display()),
            ));
        }
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("`{}` is not a valid filter", config.observability.log_level),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "`{}` is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&PagesConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = PagesConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        config.http.request_timeout_secs = 0;
        config.files.mount = "static/".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "http.request_timeout_secs", "files.mount"]
        );
    }

    #[test]
    fn test_missing_root_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PagesConfig::default();
        config.files.root = Some(dir.path().join("missing"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "files.root");
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = PagesConfig::default();
        config.observability.metrics_address = "bad".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
