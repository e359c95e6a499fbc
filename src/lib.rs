//! SignalFx Uploader Library
//!
//! Streams aggregated load-test KPIs to SignalFx. This module exposes the
//! components for use by a host engine and in integration tests.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-export commonly used types
pub use adapters::inbound::{JsonLinesReplay, ReplayStats};
pub use adapters::outbound::{SessionConfig, SignalfxSession, SystemBrowser};
pub use application::{FlushOutcome, KpiBuffer, SignalfxUploader};
pub use config::{load_config, BrowserOpen, Settings};
pub use domain::entities::{DataPoint, GaugeBody, GaugeRecord, KpiSet, MetricValue};
pub use domain::ports::{AggregatorListener, IngestClient, LinkOpener, Reporter, ResultsProvider};
pub use domain::services::DatapointSerializer;
pub use domain::value_objects::{Dimensions, SessionId};
pub use error::UploadError;
