//! Link Opener Port

use crate::error::UploadError;

/// Opens a dashboard link for the user (usually in a web browser).
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), UploadError>;
}
