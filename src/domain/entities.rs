//! Domain Entities - Core business objects
//!
//! Aggregated samples coming in from the load-testing engine and the gauge
//! records going out to the ingest API.

use crate::domain::value_objects::Dimensions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated KPIs of one label over one measurement window.
///
/// Field names on the wire follow the aggregator's own JSON dump so that
/// recorded results can be replayed as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    /// Number of samples (requests) in the window
    #[serde(rename = "throughput", default)]
    pub sample_count: u64,
    /// Active virtual users
    #[serde(default)]
    pub concurrency: u64,
    /// Failed samples
    #[serde(rename = "fail", default)]
    pub failures: u64,
    /// Percentile key (e.g. `"95.0"`) to response time in seconds
    #[serde(rename = "perc", default)]
    pub percentiles: BTreeMap<String, f64>,
    /// Average response time in seconds
    #[serde(rename = "avg_rt", default)]
    pub avg_resp_time: f64,
    /// Response code to occurrence count
    #[serde(rename = "rc", default)]
    pub resp_codes: BTreeMap<String, u64>,
}

impl KpiSet {
    pub fn percentile(&self, key: &str) -> Option<f64> {
        self.percentiles.get(key).copied()
    }
}

/// One timestamped measurement window delivered by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Window timestamp, seconds since the epoch
    #[serde(rename = "ts")]
    pub timestamp: i64,
    /// Per-label KPIs; the empty label is the overall bucket
    #[serde(default)]
    pub current: BTreeMap<String, KpiSet>,
}

impl DataPoint {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            current: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>, kpis: KpiSet) -> Self {
        self.current.insert(label.into(), kpis);
        self
    }
}

/// Numeric value of a gauge record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

/// The atomic unit of the ingest wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeRecord {
    pub timestamp: i64,
    pub metric: String,
    pub dimensions: Dimensions,
    pub value: MetricValue,
}

/// Request body for the ingest endpoint: `{"gauge": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GaugeBody {
    pub gauge: Vec<GaugeRecord>,
}

impl GaugeBody {
    pub fn len(&self) -> usize {
        self.gauge.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauge.is_empty()
    }
}

/// First and last sample timestamps seen during the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub first_ts: Option<i64>,
    pub last_ts: Option<i64>,
}

impl TimeRange {
    pub fn observe(&mut self, first: i64, last: i64) {
        self.first_ts = Some(self.first_ts.map_or(first, |ts| ts.min(first)));
        self.last_ts = Some(self.last_ts.map_or(last, |ts| ts.max(last)));
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_datapoint_deserializes_aggregator_dump() {
        let json = r#"{
            "ts": 1500000000,
            "current": {
                "": {
                    "throughput": 12,
                    "concurrency": 4,
                    "fail": 1,
                    "perc": {"0.0": 0.01, "90.0": 0.2, "100.0": 0.5},
                    "avg_rt": 0.12,
                    "rc": {"200": 11, "500": 1}
                }
            }
        }"#;

        let point: DataPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.timestamp, 1500000000);

        let overall = &point.current[""];
        assert_eq!(overall.sample_count, 12);
        assert_eq!(overall.concurrency, 4);
        assert_eq!(overall.failures, 1);
        assert_eq!(overall.percentile("90.0"), Some(0.2));
        assert_eq!(overall.resp_codes["500"], 1);
    }

    #[test]
    fn test_kpiset_missing_fields_default() {
        let kpis: KpiSet = serde_json::from_str(r#"{"throughput": 3}"#).unwrap();
        assert_eq!(kpis.sample_count, 3);
        assert!(kpis.percentiles.is_empty());
        assert!(kpis.resp_codes.is_empty());
        assert_eq!(kpis.avg_resp_time, 0.0);
    }

    #[test]
    fn test_metric_value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&MetricValue::Int(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&MetricValue::Float(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn test_gauge_body_shape() {
        let body = GaugeBody {
            gauge: vec![GaugeRecord {
                timestamp: 1000,
                metric: "RPS".into(),
                dimensions: [("label", "OVERALL")].into_iter().collect(),
                value: MetricValue::Int(5),
            }],
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "gauge": [{
                    "timestamp": 1000,
                    "metric": "RPS",
                    "dimensions": {"label": "OVERALL"},
                    "value": 5
                }]
            })
        );
    }

    #[test]
    fn test_time_range_tracks_min_and_max() {
        let mut range = TimeRange::default();
        assert_eq!(range.first_ts, None);

        range.observe(100, 110);
        range.observe(90, 105);
        range.observe(120, 130);

        assert_eq!(range.first_ts, Some(90));
        assert_eq!(range.last_ts, Some(130));
    }
}
