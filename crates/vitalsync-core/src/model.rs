//! Engine output types: per-day snapshots and per-metric series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::range::DateRange;
use crate::source::{DataPoint, SourceKind};
use crate::stats::MetricStats;

/// One scalar per metric for a single day.
///
/// A missing key means no source had data for that metric. It is never
/// filled in with zero, and values are always finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    values: BTreeMap<String, f64>,
    sources: BTreeMap<String, SourceKind>,
}

impl Snapshot {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
            sources: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, metric_id: &str, value: f64, source: SourceKind) {
        if value.is_finite() {
            self.values.insert(metric_id.to_string(), value);
            self.sources.insert(metric_id.to_string(), source);
        }
    }

    pub fn get(&self, metric_id: &str) -> Option<f64> {
        self.values.get(metric_id).copied()
    }

    pub fn contains(&self, metric_id: &str) -> bool {
        self.values.contains_key(metric_id)
    }

    /// Which source produced a metric's value.
    pub fn source_of(&self, metric_id: &str) -> Option<SourceKind> {
        self.sources.get(metric_id).copied()
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Chronological readings for one metric over a range.
///
/// An empty series has all-zero stats and `source == None`; that means "no
/// data", not a zero reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric_id: String,
    pub range: DateRange,
    pub points: Vec<DataPoint>,
    pub stats: MetricStats,
    pub source: Option<SourceKind>,
}

impl MetricSeries {
    pub fn empty(metric_id: impl Into<String>, range: DateRange) -> Self {
        Self {
            metric_id: metric_id.into(),
            range,
            points: Vec::new(),
            stats: MetricStats::default(),
            source: None,
        }
    }

    pub fn has_data(&self) -> bool {
        !self.points.is_empty()
    }
}
