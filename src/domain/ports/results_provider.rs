//! Results Provider Port
//!
//! The capability roles the host engine's aggregator exposes to reporters.

use crate::domain::entities::DataPoint;
use std::sync::Arc;

/// Receives one aggregated sample per elapsed measurement window.
pub trait AggregatorListener: Send + Sync {
    fn aggregated_second(&self, data: DataPoint);
}

/// An aggregator that listeners can subscribe to.
///
/// This is an inbound port: the host owns the implementation and calls
/// every registered listener as samples become available.
pub trait ResultsProvider: Send {
    fn add_listener(&mut self, listener: Arc<dyn AggregatorListener>);
}
