//! Upload Errors
//!
//! A single error type for the whole reporting pipeline. The flush policy
//! only distinguishes retryable delivery faults from everything else.

/// Errors raised while configuring the uploader or delivering data.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Setup cannot continue (missing token, bad settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// The one-off connectivity check at setup failed.
    #[error("cannot reach SignalFx API at {address}: {source}")]
    Connectivity {
        address: String,
        #[source]
        source: Box<UploadError>,
    },

    /// HTTP error status, backend-reported error, malformed response or a
    /// non-200 delivery code.
    #[error("network error: {0}")]
    Network(String),

    /// Socket, TLS or timeout fault below the HTTP layer.
    #[error("transient I/O error: {0}")]
    TransientIo(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl UploadError {
    /// Whether the flush policy may try this batch once more.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Network(_) | UploadError::TransientIo(_))
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        UploadError::TransientIo(e.to_string())
    }
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        UploadError::TransientIo(e.to_string())
    }
}

pub type Result<T, E = UploadError> = std::result::Result<T, E>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_network_and_transient_are_retryable() {
        assert!(UploadError::Network("503".into()).is_retryable());
        assert!(UploadError::TransientIo("reset".into()).is_retryable());
    }

    #[test]
    fn test_setup_errors_are_not_retryable() {
        assert!(!UploadError::Config("no token".into()).is_retryable());
        assert!(!UploadError::Internal("bug".into()).is_retryable());

        let err = UploadError::Connectivity {
            address: "https://example.invalid".into(),
            source: Box::new(UploadError::Network("401".into())),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_io_error_converts_to_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let err: UploadError = io.into();
        assert!(matches!(err, UploadError::TransientIo(ref m) if m.contains("peer reset")));
    }

    #[test]
    fn test_connectivity_display_includes_cause() {
        let err = UploadError::Connectivity {
            address: "https://api.example".into(),
            source: Box::new(UploadError::Network("API call error 401".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://api.example"));
        assert!(msg.contains("401"));
    }
}
