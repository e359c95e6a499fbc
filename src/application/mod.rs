//! Application Layer
//!
//! The upload coordinator and the buffer it drains.

mod kpi_buffer;
mod uploader;

pub use kpi_buffer::KpiBuffer;
pub use uploader::{FlushOutcome, SignalfxUploader};
