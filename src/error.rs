//! Error types for the fleet autoscaler

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the fleet autoscaler
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (fatal, startup-only)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Metric Fetch Errors
    // =========================================================================
    /// Metric endpoint connection error
    #[error("Metric endpoint connection error: {0}")]
    MetricConnection(#[source] reqwest::Error),

    /// Metric endpoint returned a non-success status
    #[error("Metric endpoint returned HTTP {status}")]
    MetricStatus { status: u16 },

    /// Metric payload parse error
    #[error("Failed to parse metric payload: {0}")]
    MetricParse(String),

    // =========================================================================
    // Scaling Backend Errors
    // =========================================================================
    /// Scaling backend connection error
    #[error("Scaling backend connection error: {0}")]
    ScaleConnection(#[source] reqwest::Error),

    /// Scaling backend returned a non-success status
    #[error("Scaling backend returned HTTP {status}")]
    ScaleStatus { status: u16 },

    /// Scaling backend response parse error
    #[error("Failed to parse scaling backend response: {0}")]
    ScaleResponseParse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for per-tick errors the control loop recovers from locally.
    ///
    /// Transient errors are surfaced through the loop status and logs; they
    /// never terminate the process.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::MetricConnection(_)
                | Error::MetricStatus { .. }
                | Error::MetricParse(_)
                | Error::ScaleConnection(_)
                | Error::ScaleStatus { .. }
                | Error::ScaleResponseParse(_)
        )
    }

    /// The pipeline stage an error belongs to, used as a metric label.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::MetricConnection(_) | Error::MetricStatus { .. } | Error::MetricParse(_) => {
                "fetch"
            }
            Error::ScaleConnection(_) | Error::ScaleStatus { .. } | Error::ScaleResponseParse(_) => {
                "scale"
            }
            _ => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::MetricStatus { status: 502 }.is_transient());
        assert!(Error::MetricParse("bad payload".into()).is_transient());
        assert!(Error::ScaleStatus { status: 500 }.is_transient());
        assert!(!Error::Config("missing base_url".into()).is_transient());
        assert!(!Error::Internal("boom".into()).is_transient());
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(Error::MetricParse("x".into()).stage(), "fetch");
        assert_eq!(Error::ScaleResponseParse("x".into()).stage(), "scale");
        assert_eq!(Error::Config("x".into()).stage(), "other");
    }
}
