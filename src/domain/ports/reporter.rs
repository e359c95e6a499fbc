//! Reporter Port
//!
//! Lifecycle hooks the host engine drives on every reporting module.

use crate::domain::ports::ResultsProvider;
use crate::error::UploadError;
use async_trait::async_trait;

/// A reporting module plugged into the host's run loop.
///
/// The host calls `prepare` once, `startup` when load starts, `check` on
/// every tick and `post_process` once after the test finished.
#[async_trait]
pub trait Reporter: Send {
    /// Validate settings and connect. `aggregator`, when given, gets the
    /// reporter registered as a listener.
    async fn prepare(
        &mut self,
        aggregator: Option<&mut dyn ResultsProvider>,
    ) -> Result<(), UploadError>;

    async fn startup(&mut self) -> Result<(), UploadError>;

    /// Periodic tick. Returns `true` when the reporter wants the test to
    /// finish early.
    async fn check(&mut self) -> Result<bool, UploadError>;

    async fn post_process(&mut self) -> Result<(), UploadError>;
}
