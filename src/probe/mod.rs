//! Health Probe server
//!
//! Read-only HTTP surface for external orchestration: liveness and readiness
//! probes, the current loop status as JSON, and Prometheus exposition.
//!
//! The probe only reads shared state, with a bounded wait on the loop's
//! lock; when the status is unavailable it reports an unknown state rather
//! than failing the health check outright.

use std::net::SocketAddr;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::domain::SharedStatus;
use crate::error::{Error, Result};

/// Bound on how long a status read may wait on the control loop's lock.
pub const STATUS_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Serve probe requests on `0.0.0.0:port` until the process exits.
pub async fn run_probe_server(port: u16, status: SharedStatus) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        Error::Internal(format!("Failed to bind probe server on {}: {}", addr, e))
    })?;

    info!("Probe server listening on {}", addr);

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .map_err(|e| Error::Internal(format!("Probe server accept error: {}", e)))?;

        let io = TokioIo::new(stream);
        let status = status.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let status = status.clone();
                async move {
                    Ok::<_, std::convert::Infallible>(route(req.uri().path(), &status))
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("Probe server connection error: {}", e);
            }
        });
    }
}

fn route(path: &str, status: &SharedStatus) -> Response<Full<Bytes>> {
    match path {
        "/healthz" | "/livez" => text(StatusCode::OK, "ok"),
        "/readyz" => {
            if is_ready(status) {
                text(StatusCode::OK, "ok")
            } else {
                text(StatusCode::SERVICE_UNAVAILABLE, "pending")
            }
        }
        "/status" => json(StatusCode::OK, status_payload(status)),
        "/metrics" => metrics_exposition(),
        _ => text(StatusCode::NOT_FOUND, "not found"),
    }
}

/// Ready once the loop has completed at least one tick. A held lock counts
/// as not ready; the next probe retries.
fn is_ready(status: &SharedStatus) -> bool {
    status
        .try_read_for(STATUS_LOCK_TIMEOUT)
        .map(|guard| guard.ticks_completed > 0)
        .unwrap_or(false)
}

/// Serialize the current loop status, degrading to an unknown-state payload
/// when the lock cannot be taken within the bound.
fn status_payload(status: &SharedStatus) -> String {
    match status.try_read_for(STATUS_LOCK_TIMEOUT) {
        Some(guard) => serde_json::to_string(&*guard).unwrap_or_else(|e| {
            error!("Failed to serialize loop status: {}", e);
            degraded_payload()
        }),
        None => degraded_payload(),
    }
}

fn degraded_payload() -> String {
    r#"{"state":"unknown"}"#.to_string()
}

fn metrics_exposition() -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return text(StatusCode::INTERNAL_SERVER_ERROR, "encoding error");
    }

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", encoder.format_type())
        .body(Full::new(Bytes::from(buffer)))
        .unwrap()
}

fn text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn json(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
