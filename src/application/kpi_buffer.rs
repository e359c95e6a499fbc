//! KPI Buffer
//!
//! Samples waiting for the next flush, shared between the aggregator side
//! and the uploader.

use crate::domain::entities::DataPoint;
use crate::domain::ports::AggregatorListener;
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle to the pending samples, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct KpiBuffer {
    inner: Arc<Mutex<Vec<DataPoint>>>,
}

impl KpiBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, point: DataPoint) {
        self.inner.lock().push(point);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Remove and return everything buffered so far in one step.
    pub fn take(&self) -> Vec<DataPoint> {
        std::mem::take(&mut *self.inner.lock())
    }
}

impl AggregatorListener for KpiBuffer {
    fn aggregated_second(&self, data: DataPoint) {
        self.push(data);
    }
}
