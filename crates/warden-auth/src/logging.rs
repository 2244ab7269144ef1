//! Structured logging setup
//!
//! Login events are emitted through `tracing` under the `warden_auth`
//! target. Hosts that already install a subscriber can ignore this module.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration for an authenticator host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Enable pretty printing for development
    pub pretty_print: bool,
    /// Include file and line number information
    pub include_location: bool,
    /// Environment filter (supports directives like "warden_auth=debug")
    pub env_filter: Option<String>,
    /// Service name announced when logging starts
    pub service_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: true,
            include_location: false,
            env_filter: None,
            service_name: None,
        }
    }
}

impl LoggingConfig {
    /// JSON output, login failures and lockouts only
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            include_location: false,
            env_filter: Some("warden_auth=info".to_string()),
            service_name: None,
        }
    }

    /// Pretty output including throttle evaluations
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            include_location: true,
            env_filter: Some("warden_auth=debug".to_string()),
            service_name: None,
        }
    }

    /// Minimal output
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            pretty_print: false,
            include_location: false,
            env_filter: Some("warden_auth=error".to_string()),
            service_name: None,
        }
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// The filter directive used when `RUST_LOG` is not set
    pub fn filter_directive(&self) -> &str {
        self.env_filter.as_deref().unwrap_or(&self.level)
    }
}

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. Fails if the
/// filter does not parse or a global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directive()))?;

    let layer = Layer::new()
        .with_writer(io::stdout)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?;
    } else if config.pretty_print {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.pretty())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?;
    }

    tracing::info!(
        service = config.service_name.as_deref().unwrap_or("warden-auth"),
        level = %config.level,
        format = if config.json_format { "json" } else { "text" },
        "Structured logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let production = LoggingConfig::production();
        assert!(production.json_format);
        assert!(!production.pretty_print);
        assert_eq!(production.filter_directive(), "warden_auth=info");

        let development = LoggingConfig::development();
        assert!(development.include_location);
        assert_eq!(development.level, "debug");

        assert_eq!(LoggingConfig::test().level, "error");
    }

    #[test]
    fn test_filter_falls_back_to_level() {
        let config = LoggingConfig::default();
        assert_eq!(config.filter_directive(), "info");

        let config = config
            .with_env_filter("warden_auth=trace")
            .with_service_name("portal");
        assert_eq!(config.filter_directive(), "warden_auth=trace");
        assert_eq!(config.service_name.as_deref(), Some("portal"));
    }
}
