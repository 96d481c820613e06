//! Infrastructure adapters implementing the domain ports over HTTP.
//!
//! # Adapters
//!
//! - [`http_metrics::HttpMetricSource`] - `MetricSource` polling the
//!   monitored service's metrics endpoint
//! - [`http_backend::HttpScalingBackend`] - `ScalingBackend` writing replica
//!   targets to the management API

pub mod http_backend;
pub mod http_metrics;

pub use http_backend::HttpScalingBackend;
pub use http_metrics::HttpMetricSource;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;

use crate::config::Config;
use crate::error::{Error, Result};

/// Build the reusable HTTP client both adapters hold for the process
/// lifetime: bounded timeout, configured static headers.
pub(crate) fn build_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::with_capacity(config.endpoints.headers.len());
    for (name, value) in &config.endpoints.headers {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| Error::Config(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| Error::Config(format!("invalid header value for '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Client::builder()
        .timeout(config.request_timeout())
        .default_headers(headers)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Join the configured base URL with a relative endpoint path.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Extract a finite number at `pointer` within a JSON document.
///
/// Accepts JSON numbers and numeric strings (some exporters stringify
/// floats). Returns `None` for a missing pointer target, a non-numeric value,
/// or a non-finite number.
pub(crate) fn number_at(body: &Value, pointer: &str) -> Option<f64> {
    let target = if pointer.is_empty() {
        body
    } else {
        body.pointer(pointer)?
    };
    let value = match target {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_url_strips_duplicate_slash() {
        assert_eq!(
            join_url("http://localhost:9000/", "/status"),
            "http://localhost:9000/status"
        );
        assert_eq!(
            join_url("http://localhost:9000", "/status"),
            "http://localhost:9000/status"
        );
    }

    #[test]
    fn test_number_at_nested_pointer() {
        let body = json!({"cpu": {"highPriority": 62.5}, "replicas": 4});
        assert_eq!(number_at(&body, "/cpu/highPriority"), Some(62.5));
        assert_eq!(number_at(&body, "/replicas"), Some(4.0));
    }

    #[test]
    fn test_number_at_root_pointer() {
        assert_eq!(number_at(&json!(42.5), ""), Some(42.5));
    }

    #[test]
    fn test_number_at_numeric_string() {
        let body = json!({"load": "73.2"});
        assert_eq!(number_at(&body, "/load"), Some(73.2));
    }

    #[test]
    fn test_number_at_rejects_non_numeric() {
        let body = json!({"load": "not-a-number", "nested": {"load": true}});
        assert_eq!(number_at(&body, "/load"), None);
        assert_eq!(number_at(&body, "/nested/load"), None);
        assert_eq!(number_at(&body, "/missing"), None);
    }

    #[test]
    fn test_number_at_rejects_non_finite() {
        let body = json!({"load": "NaN", "inf": "inf"});
        assert_eq!(number_at(&body, "/load"), None);
        assert_eq!(number_at(&body, "/inf"), None);
    }
}
