//! Datapoint Serializer - Domain service
//!
//! Fans each aggregated sample out into flat, individually tagged gauge
//! records understood by the SignalFx ingest API.

use crate::domain::entities::{DataPoint, GaugeBody, GaugeRecord, KpiSet, MetricValue, TimeRange};
use crate::domain::value_objects::{Dimensions, OVERALL_LABEL};

/// Default factor applied to timestamps and response times (s -> ms).
pub const DEFAULT_TIMES_MULTIPLIER: f64 = 1000.0;

/// Converts a buffer of samples into a gauge body.
#[derive(Debug, Clone)]
pub struct DatapointSerializer {
    multiplier: f64,
}

impl Default for DatapointSerializer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMES_MULTIPLIER)
    }
}

impl DatapointSerializer {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    /// Build the gauge body for `buffer`.
    ///
    /// Records come out in sample order, then label order, then
    /// fixed metrics, percentiles and response codes. `range` is advanced
    /// from the first and last sample. `is_final` does not change the shape.
    pub fn serialize(
        &self,
        buffer: &[DataPoint],
        tags: &Dimensions,
        is_final: bool,
        range: &mut TimeRange,
    ) -> GaugeBody {
        let mut gauge = Vec::new();

        if let (Some(first), Some(last)) = (buffer.first(), buffer.last()) {
            range.observe(first.timestamp, last.timestamp);

            for point in buffer {
                let timestamp = self.scale_timestamp(point.timestamp);
                for (label, kpis) in &point.current {
                    let label = if label.is_empty() { OVERALL_LABEL } else { label };
                    let dimensions = tags.with("label", label);
                    self.convert(kpis, timestamp, &dimensions, &mut gauge);
                }
            }
        }

        tracing::debug!(
            "serialized {} samples into {} gauge records (final={})",
            buffer.len(),
            gauge.len(),
            is_final
        );

        GaugeBody { gauge }
    }

    /// Serialize and JSON-encode in one step.
    pub fn encode(
        &self,
        buffer: &[DataPoint],
        tags: &Dimensions,
        is_final: bool,
        range: &mut TimeRange,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.serialize(buffer, tags, is_final, range))
    }

    fn convert(
        &self,
        kpis: &KpiSet,
        timestamp: i64,
        dimensions: &Dimensions,
        out: &mut Vec<GaugeRecord>,
    ) {
        let record = |metric: &str, value: MetricValue| GaugeRecord {
            timestamp,
            metric: metric.to_string(),
            dimensions: dimensions.clone(),
            value,
        };

        let tmin = kpis.percentile("0.0").map_or(0, |v| self.scale_time(v));
        let tmax = kpis.percentile("100.0").map_or(0, |v| self.scale_time(v));
        let tavg = self.multiplier * kpis.avg_resp_time;

        out.push(record("RPS", MetricValue::Int(kpis.sample_count as i64)));
        out.push(record("Threads", MetricValue::Int(kpis.concurrency as i64)));
        out.push(record("Failures", MetricValue::Int(kpis.failures as i64)));
        out.push(record("min", MetricValue::Int(tmin)));
        out.push(record("max", MetricValue::Int(tmax)));
        out.push(record("avg", MetricValue::Float(tavg)));

        for (key, value) in &kpis.percentiles {
            out.push(record(&format!("p{key}"), MetricValue::Int(self.scale_time(*value))));
        }

        for (code, count) in &kpis.resp_codes {
            out.push(GaugeRecord {
                timestamp,
                metric: "rc".to_string(),
                dimensions: dimensions.with("rc", code.as_str()),
                value: MetricValue::Int(*count as i64),
            });
        }
    }

    fn scale_timestamp(&self, ts: i64) -> i64 {
        (ts as f64 * self.multiplier) as i64
    }

    // truncates toward zero
    fn scale_time(&self, seconds: f64) -> i64 {
        (self.multiplier * seconds) as i64
    }
}
