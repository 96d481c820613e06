//! HTTP Scaling Backend - "The Hands"
//!
//! Writes single-step replica targets to the management API and reports the
//! backend's authoritative resulting fleet size.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::adapters::{build_client, join_url, number_at};
use crate::config::Config;
use crate::domain::ports::ScalingBackend;
use crate::error::{Error, Result};

/// `ScalingBackend` over the management API's replicas endpoint.
///
/// Every scale call moves the fleet by exactly one unit; the resulting count
/// is parsed from the backend's response, which is the source of truth for
/// actual fleet size.
pub struct HttpScalingBackend {
    client: Client,
    metrics_url: String,
    scale_url: String,
    replicas_pointer: String,
}

impl HttpScalingBackend {
    /// Create a new scaling backend from the validated configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            metrics_url: join_url(&config.base_url, &config.endpoints.metrics),
            scale_url: join_url(&config.base_url, &config.endpoints.scale),
            replicas_pointer: config.endpoints.replicas_pointer.clone(),
        })
    }

    /// Submit a replica target and return the count the backend reports back.
    #[instrument(skip(self), fields(url = %self.scale_url))]
    async fn apply(&self, target: u32) -> Result<u32> {
        let response = self
            .client
            .put(&self.scale_url)
            .json(&json!({ "replicas": target }))
            .send()
            .await
            .map_err(Error::ScaleConnection)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ScaleStatus {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::ScaleResponseParse(e.to_string()))?;
        let reported = parse_replicas(&body, &self.replicas_pointer)
            .map_err(Error::ScaleResponseParse)?;

        debug!("Backend reports {} replicas after targeting {}", reported, target);
        Ok(reported)
    }
}

impl std::fmt::Debug for HttpScalingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpScalingBackend")
            .field("scale_url", &self.scale_url)
            .field("replicas_pointer", &self.replicas_pointer)
            .finish()
    }
}

#[async_trait]
impl ScalingBackend for HttpScalingBackend {
    #[instrument(skip(self), fields(url = %self.metrics_url))]
    async fn current_instances(&self) -> Result<u32> {
        let response = self
            .client
            .get(&self.metrics_url)
            .send()
            .await
            .map_err(Error::ScaleConnection)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ScaleStatus {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::ScaleResponseParse(e.to_string()))?;
        parse_replicas(&body, &self.replicas_pointer).map_err(Error::ScaleResponseParse)
    }

    async fn scale_up(&self, current: u32) -> Result<u32> {
        let target = current
            .checked_add(1)
            .ok_or_else(|| Error::Internal("instance count overflow".into()))?;
        self.apply(target).await
    }

    async fn scale_down(&self, current: u32) -> Result<u32> {
        let target = current
            .checked_sub(1)
            .ok_or_else(|| Error::Internal("cannot scale below zero instances".into()))?;
        self.apply(target).await
    }
}

/// Extract a replica count from an API response body.
fn parse_replicas(body: &Value, pointer: &str) -> std::result::Result<u32, String> {
    let value = number_at(body, pointer)
        .ok_or_else(|| format!("no numeric replica count at '{}'", pointer))?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(format!("replica count '{}' is not a non-negative integer", value));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn test_config(base_url: &str) -> Config {
        Config::from_yaml(&format!(
            r#"
base_url: {}
scale_up_threshold: 80
scale_down_threshold: 20
min_instances: 1
max_instances: 10
request_timeout: 1
"#,
            base_url
        ))
        .expect("valid test config")
    }

    #[test]
    fn test_backend_creation() {
        let config = test_config("http://localhost:9000");
        let backend = HttpScalingBackend::new(&config).expect("client builds");
        assert!(format!("{:?}", backend).contains("http://localhost:9000/replicas"));
    }

    #[test]
    fn test_parse_replicas() {
        assert_eq!(parse_replicas(&json!({"replicas": 4}), "/replicas"), Ok(4));
        assert_eq!(
            parse_replicas(&json!({"status": {"replicas": "7"}}), "/status/replicas"),
            Ok(7)
        );
    }

    #[test]
    fn test_parse_replicas_rejects_fractional_and_negative() {
        assert!(parse_replicas(&json!({"replicas": 3.5}), "/replicas").is_err());
        assert!(parse_replicas(&json!({"replicas": -1}), "/replicas").is_err());
        assert!(parse_replicas(&json!({"state": "ok"}), "/replicas").is_err());
    }

    #[tokio::test]
    async fn test_current_instances_connection_refused() {
        let config = test_config("http://localhost:19999");
        let backend = HttpScalingBackend::new(&config).expect("client builds");

        let result = backend.current_instances().await;
        assert_matches!(result, Err(Error::ScaleConnection(_)));
    }

    #[tokio::test]
    async fn test_scale_up_connection_refused() {
        let config = test_config("http://localhost:19999");
        let backend = HttpScalingBackend::new(&config).expect("client builds");

        let result = backend.scale_up(3).await;
        assert_matches!(result, Err(Error::ScaleConnection(_)));
    }

    #[tokio::test]
    async fn test_scale_down_below_zero_is_internal() {
        let config = test_config("http://localhost:19999");
        let backend = HttpScalingBackend::new(&config).expect("client builds");

        // Never dispatched: the guard fires before any request is built.
        let result = backend.scale_down(0).await;
        assert_matches!(result, Err(Error::Internal(_)));
    }
}
