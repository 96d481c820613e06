//! Autoscaler configuration
//!
//! Loaded once at startup from a YAML file and validated before any component
//! is built; a partially-valid configuration never reaches the control loop.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

fn default_probe_port() -> u16 {
    8080
}

fn default_poll_interval() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    5
}

fn default_metrics_endpoint() -> String {
    "/status".to_string()
}

fn default_scale_endpoint() -> String {
    "/replicas".to_string()
}

fn default_metric_pointer() -> String {
    "/load".to_string()
}

fn default_replicas_pointer() -> String {
    "/replicas".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Paths and request settings for the monitored service's management API.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointsConfig {
    /// Relative path polled for the load metric.
    #[serde(default = "default_metrics_endpoint")]
    pub metrics: String,

    /// Relative path scale actions are written to.
    #[serde(default = "default_scale_endpoint")]
    pub scale: String,

    /// JSON pointer selecting the numeric load value in the metrics response.
    /// An empty pointer selects the document root (bare numeric body).
    #[serde(default = "default_metric_pointer")]
    pub metric_pointer: String,

    /// JSON pointer selecting the replica count in API responses.
    #[serde(default = "default_replicas_pointer")]
    pub replicas_pointer: String,

    /// Static headers attached to every request (e.g. auth tokens).
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            metrics: default_metrics_endpoint(),
            scale: default_scale_endpoint(),
            metric_pointer: default_metric_pointer(),
            replicas_pointer: default_replicas_pointer(),
            headers: HashMap::new(),
        }
    }
}

/// Logging section of the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output logs as JSON.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Validated autoscaler configuration
///
/// Immutable once constructed; a reload requires restarting the process.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Management API root of the monitored service.
    pub base_url: String,

    /// Scale up at or above this load (0-100).
    pub scale_up_threshold: f64,

    /// Scale down at or below this load (0-100), strictly below
    /// `scale_up_threshold`.
    pub scale_down_threshold: f64,

    /// Hard floor for the fleet size.
    pub min_instances: u32,

    /// Hard ceiling for the fleet size.
    pub max_instances: u32,

    /// Port the health probe server listens on.
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    /// Seconds between control loop ticks.
    #[serde(default = "default_poll_interval", rename = "poll_interval")]
    pub poll_interval_secs: u64,

    /// Timeout in seconds for every outbound HTTP request.
    #[serde(default = "default_request_timeout", rename = "request_timeout")]
    pub request_timeout_secs: u64,

    /// Management API endpoints.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Logging settings, overridable from the CLI.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate configuration from a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(raw)
            .map_err(|e| Error::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Duration between control loop ticks.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Timeout applied to every outbound HTTP request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check every invariant the rest of the system relies on.
    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("base_url must not be empty".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        for (name, value) in [
            ("scale_up_threshold", self.scale_up_threshold),
            ("scale_down_threshold", self.scale_down_threshold),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within 0-100, got {}",
                    name, value
                )));
            }
        }
        if self.scale_down_threshold >= self.scale_up_threshold {
            return Err(Error::Config(format!(
                "scale_down_threshold ({}) must be below scale_up_threshold ({}); \
                 equal or inverted thresholds degenerate the policy to hold-only",
                self.scale_down_threshold, self.scale_up_threshold
            )));
        }
        if self.min_instances > self.max_instances {
            return Err(Error::Config(format!(
                "min_instances ({}) must not exceed max_instances ({})",
                self.min_instances, self.max_instances
            )));
        }
        if self.probe_port == 0 {
            return Err(Error::Config("probe_port must be non-zero".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Config("poll_interval must be at least 1 second".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout must be at least 1 second".into(),
            ));
        }
        for (name, path) in [
            ("endpoints.metrics", &self.endpoints.metrics),
            ("endpoints.scale", &self.endpoints.scale),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!(
                    "{} must be a path starting with '/', got '{}'",
                    name, path
                )));
            }
        }
        for (name, pointer) in [
            ("endpoints.metric_pointer", &self.endpoints.metric_pointer),
            ("endpoints.replicas_pointer", &self.endpoints.replicas_pointer),
        ] {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(Error::Config(format!(
                    "{} must be empty (document root) or a JSON pointer starting with '/', got '{}'",
                    name, pointer
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const MINIMAL: &str = r#"
base_url: http://localhost:9000
scale_up_threshold: 80
scale_down_threshold: 20
min_instances: 1
max_instances: 10
"#;

    #[test]
    fn test_minimal_config_with_defaults() {
        let config = Config::from_yaml(MINIMAL).expect("valid config");
        assert_eq!(config.probe_port, 8080);
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.endpoints.metrics, "/status");
        assert_eq!(config.endpoints.scale, "/replicas");
        assert_eq!(config.endpoints.metric_pointer, "/load");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
base_url: https://fleet.internal:8443
scale_up_threshold: 75.5
scale_down_threshold: 25.5
min_instances: 2
max_instances: 20
probe_port: 9102
poll_interval: 30
request_timeout: 3
endpoints:
  metrics: /api/v1/status
  scale: /api/v1/replicas
  metric_pointer: /cpu/highPriority
  replicas_pointer: /replicas
  headers:
    Authorization: Bearer token
logging:
  level: debug
  json: true
"#;
        let config = Config::from_yaml(raw).expect("valid config");
        assert_eq!(config.scale_up_threshold, 75.5);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.endpoints.metric_pointer, "/cpu/highPriority");
        assert_eq!(
            config.endpoints.headers.get("Authorization").map(String::as_str),
            Some("Bearer token")
        );
        assert!(config.logging.json);
    }

    #[test]
    fn test_missing_required_key_rejected() {
        let raw = r#"
scale_up_threshold: 80
scale_down_threshold: 20
min_instances: 1
max_instances: 10
"#;
        assert_matches!(Config::from_yaml(raw), Err(Error::Config(_)));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let raw = MINIMAL.replace("scale_down_threshold: 20", "scale_down_threshold: 90");
        let err = Config::from_yaml(&raw).expect_err("must be rejected");
        assert_matches!(err, Error::Config(msg) if msg.contains("scale_down_threshold"));
    }

    #[test]
    fn test_equal_thresholds_rejected() {
        let raw = MINIMAL.replace("scale_down_threshold: 20", "scale_down_threshold: 80");
        assert_matches!(Config::from_yaml(&raw), Err(Error::Config(_)));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let raw = MINIMAL.replace("scale_up_threshold: 80", "scale_up_threshold: 140");
        assert_matches!(Config::from_yaml(&raw), Err(Error::Config(_)));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let raw = MINIMAL.replace("min_instances: 1", "min_instances: 11");
        assert_matches!(Config::from_yaml(&raw), Err(Error::Config(_)));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let raw = format!("{}poll_interval: 0\n", MINIMAL);
        assert_matches!(Config::from_yaml(&raw), Err(Error::Config(_)));
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let raw = MINIMAL.replace("http://localhost:9000", "ftp://localhost:9000");
        assert_matches!(Config::from_yaml(&raw), Err(Error::Config(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let raw = format!("{}cpu_threshold: 0.5\n", MINIMAL);
        assert_matches!(Config::from_yaml(&raw), Err(Error::Config(_)));
    }

    #[test]
    fn test_relative_endpoint_rejected() {
        let raw = format!("{}endpoints:\n  metrics: status\n", MINIMAL);
        assert_matches!(Config::from_yaml(&raw), Err(Error::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_path(Path::new("/nonexistent/autoscaler.yaml"))
            .expect_err("must fail");
        assert_matches!(err, Error::Config(msg) if msg.contains("/nonexistent/autoscaler.yaml"));
    }
}
