//! Ingest Client Port
//!
//! Defines the interface for talking to the SignalFx API.

use crate::error::UploadError;
use async_trait::async_trait;
use std::time::Duration;

/// Client for the monitoring backend.
///
/// This is an outbound port. The uploader only needs a connectivity probe
/// and a way to push one encoded batch; retries above the transport level
/// are the caller's business.
#[async_trait]
pub trait IngestClient: Send + Sync {
    /// Quick check that the API is reachable and the token is accepted.
    async fn ping(&self) -> Result<(), UploadError>;

    /// Push one JSON-encoded `{"gauge": [...]}` body to the ingest endpoint.
    async fn send_kpi_data(&self, body: String) -> Result<(), UploadError>;

    /// Per-request timeout, reused by the uploader as its retry back-off.
    fn timeout(&self) -> Duration;
}
