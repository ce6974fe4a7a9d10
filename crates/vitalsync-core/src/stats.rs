//! Derived series statistics.
//!
//! Stats are never stored: they are recomputed from the points every time a
//! series is built. An empty input yields all zeros, which callers must read
//! as "no data" (check the point count, not the numbers).

use serde::{Deserialize, Serialize};

use crate::source::DataPoint;

/// Summary statistics over a series of readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub total: f64,
    /// Percent change of `total` against the preceding equal-length window.
    pub trend_percent: f64,
}

impl Default for MetricStats {
    fn default() -> Self {
        Self {
            average: 0.0,
            min: 0.0,
            max: 0.0,
            total: 0.0,
            trend_percent: 0.0,
        }
    }
}

impl MetricStats {
    /// Compute average/min/max/total. Trend is left at zero.
    pub fn from_points(points: &[DataPoint]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut total = 0.0;
        for p in points {
            min = min.min(p.value);
            max = max.max(p.value);
            total += p.value;
        }
        Self {
            average: total / points.len() as f64,
            min,
            max,
            total,
            trend_percent: 0.0,
        }
    }

    /// Attach a trend computed against a baseline window total.
    pub fn with_trend(mut self, baseline_total: Option<f64>) -> Self {
        self.trend_percent = trend_percent(self.total, baseline_total);
        self
    }
}

/// `(current - baseline) / |baseline| * 100`, or 0 when there is no usable
/// baseline.
pub fn trend_percent(current_total: f64, baseline_total: Option<f64>) -> f64 {
    match baseline_total {
        Some(base) if base != 0.0 && base.is_finite() && current_total.is_finite() => {
            (current_total - base) / base.abs() * 100.0
        }
        _ => 0.0,
    }
}
