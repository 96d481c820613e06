//! HTTP Metric Source - "The Eyes"
//!
//! Polls the monitored service's metrics endpoint and extracts the numeric
//! load value the policy decides on.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::adapters::{build_client, join_url, number_at};
use crate::config::Config;
use crate::domain::ports::MetricSource;
use crate::domain::LoadSample;
use crate::error::{Error, Result};

/// `MetricSource` over the management API's metrics endpoint.
///
/// Holds one reusable [`Client`] with a bounded timeout; a stalled endpoint
/// surfaces as a connection error, never a hang.
pub struct HttpMetricSource {
    client: Client,
    url: String,
    metric_pointer: String,
}

impl HttpMetricSource {
    /// Create a new metric source from the validated configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            url: join_url(&config.base_url, &config.endpoints.metrics),
            metric_pointer: config.endpoints.metric_pointer.clone(),
        })
    }
}

impl std::fmt::Debug for HttpMetricSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetricSource")
            .field("url", &self.url)
            .field("metric_pointer", &self.metric_pointer)
            .finish()
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<LoadSample> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(Error::MetricConnection)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::MetricStatus {
                status: status.as_u16(),
            });
        }

        let raw = response.text().await.map_err(Error::MetricConnection)?;
        let value = parse_load(&raw, &self.metric_pointer)?;

        debug!("Sampled load {} from {}", value, self.url);
        Ok(LoadSample::new(value))
    }
}

/// Extract the load value from a response body.
///
/// The body is normally a JSON document addressed by `pointer`; a bare
/// numeric body is accepted when the pointer selects the document root.
fn parse_load(raw: &str, pointer: &str) -> Result<f64> {
    match serde_json::from_str::<Value>(raw) {
        Ok(body) => number_at(&body, pointer).ok_or_else(|| {
            Error::MetricParse(format!(
                "no finite numeric value at '{}' in metrics payload",
                pointer
            ))
        }),
        Err(_) if pointer.is_empty() => {
            let value: f64 = raw
                .trim()
                .parse()
                .map_err(|_| Error::MetricParse(format!("body is not numeric: '{}'", raw.trim())))?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(Error::MetricParse("body is not a finite number".into()))
            }
        }
        Err(e) => Err(Error::MetricParse(format!("body is not JSON: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_config(base_url: &str, timeout_secs: u64) -> Config {
        Config::from_yaml(&format!(
            r#"
base_url: {}
scale_up_threshold: 80
scale_down_threshold: 20
min_instances: 1
max_instances: 10
request_timeout: {}
"#,
            base_url, timeout_secs
        ))
        .expect("valid test config")
    }

    #[test]
    fn test_source_creation() {
        let config = test_config("http://localhost:9000", 5);
        let source = HttpMetricSource::new(&config).expect("client builds");
        assert!(format!("{:?}", source).contains("http://localhost:9000/status"));
    }

    #[test]
    fn test_parse_load_json_document() {
        let raw = r#"{"cpu": {"highPriority": 62.5}, "replicas": 4}"#;
        assert_eq!(parse_load(raw, "/cpu/highPriority").expect("parses"), 62.5);
    }

    #[test]
    fn test_parse_load_bare_number() {
        assert_eq!(parse_load("42.5\n", "").expect("parses"), 42.5);
    }

    #[test]
    fn test_parse_load_missing_field() {
        let err = parse_load(r#"{"replicas": 4}"#, "/load").expect_err("must fail");
        assert_matches!(err, Error::MetricParse(_));
    }

    #[test]
    fn test_parse_load_malformed_body() {
        assert_matches!(
            parse_load("<html>busy</html>", "/load"),
            Err(Error::MetricParse(_))
        );
        assert_matches!(parse_load("not-a-number", ""), Err(Error::MetricParse(_)));
    }

    #[test]
    fn test_fetch_connection_refused() {
        // Non-existent local port: must surface as a connection error, not
        // panic or hang.
        let config = test_config("http://localhost:19999", 1);
        let source = HttpMetricSource::new(&config).expect("client builds");

        let result = tokio_test::block_on(source.fetch());
        assert_matches!(result, Err(Error::MetricConnection(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        // Non-routable IP (RFC 5737) with a short timeout.
        let config = test_config("http://192.0.2.1:9000", 1);
        let source = HttpMetricSource::new(&config).expect("client builds");

        let result = source.fetch().await;
        assert_matches!(result, Err(Error::MetricConnection(_)));
    }
}
