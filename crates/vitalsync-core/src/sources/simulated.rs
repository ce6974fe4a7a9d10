//! Deterministic stand-in sources.
//!
//! Values are derived from `(seed, metric, day)` so repeated reads agree and
//! the cloud copy mirrors the device history. Latency, failure rate and
//! gaps are configurable to exercise the engine's fallback paths.

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::{Aggregation, MetricCatalog, MetricDefinition};
use crate::error::SourceError;
use crate::range::DateRange;
use crate::source::{CloudHistorySource, DataPoint, NativeHealthSource};

/// Per-(metric, day) generator shared by both simulated sources.
fn day_rng(seed: u64, metric_id: &str, day: NaiveDate) -> StdRng {
    let mut h = DefaultHasher::new();
    seed.hash(&mut h);
    metric_id.hash(&mut h);
    day.hash(&mut h);
    StdRng::seed_from_u64(h.finish())
}

/// Daily value inside the metric's reference range, plus the first draw
/// (used to decide simulated failures).
fn simulate_day(seed: u64, def: &MetricDefinition, day: NaiveDate) -> (f64, f64) {
    let mut rng = day_rng(seed, def.id, day);
    let fail_draw: f64 = rng.random();
    let (low, high) = def.reference_range;
    // Bias toward the middle of the range so sums look plausible.
    let t = (rng.random::<f64>() + rng.random::<f64>()) / 2.0;
    (low + (high - low) * t, fail_draw)
}

fn point_for(def: &MetricDefinition, day: NaiveDate, value: f64) -> DataPoint {
    let noon = day.and_time(NaiveTime::MIN).and_utc() + TimeDelta::hours(12);
    let point = DataPoint::new(noon, value);
    match def.aggregation {
        Aggregation::Average => {
            let spread = (def.reference_range.1 - def.reference_range.0) * 0.1;
            point.with_bounds(value - spread, value + spread)
        }
        Aggregation::Sum | Aggregation::Latest => point,
    }
}

/// Simulated on-device store.
pub struct SimulatedNativeSource {
    catalog: Arc<MetricCatalog>,
    seed: u64,
    latency: Duration,
    failure_rate: f64,
    missing: HashSet<String>,
}

impl SimulatedNativeSource {
    pub fn new(catalog: Arc<MetricCatalog>, seed: u64) -> Self {
        Self {
            catalog,
            seed,
            latency: Duration::ZERO,
            failure_rate: 0.0,
            missing: HashSet::new(),
        }
    }

    /// Delay every read by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fraction of (metric, day) reads that fail, in `[0, 1]`.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Metrics the device never recorded.
    pub fn with_missing<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing.extend(ids.into_iter().map(Into::into));
        self
    }

    fn lookup(&self, metric_id: &str) -> Result<Option<&MetricDefinition>, SourceError> {
        let def = self
            .catalog
            .definition_of(metric_id)
            .ok_or_else(|| SourceError::Unsupported(metric_id.to_string()))?;
        if self.missing.contains(metric_id) {
            return Ok(None);
        }
        Ok(Some(def))
    }
}

#[async_trait]
impl NativeHealthSource for SimulatedNativeSource {
    async fn read_scalar(
        &self,
        metric_id: &str,
        date: NaiveDate,
    ) -> Result<Option<f64>, SourceError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let Some(def) = self.lookup(metric_id)? else {
            return Ok(None);
        };
        if !def.native_scalar {
            return Err(SourceError::Unsupported(metric_id.to_string()));
        }
        let (value, fail_draw) = simulate_day(self.seed, def, date);
        if fail_draw < self.failure_rate {
            return Err(SourceError::Platform(format!(
                "simulated read failure for {metric_id}"
            )));
        }
        Ok(Some(value))
    }

    async fn read_range(
        &self,
        metric_id: &str,
        range: DateRange,
    ) -> Result<Vec<DataPoint>, SourceError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let Some(def) = self.lookup(metric_id)? else {
            return Ok(Vec::new());
        };
        if !def.native_range {
            return Err(SourceError::Unsupported(metric_id.to_string()));
        }
        // A failure on the first day fails the whole query.
        let (_, fail_draw) = simulate_day(self.seed, def, range.start());
        if fail_draw < self.failure_rate {
            return Err(SourceError::Platform(format!(
                "simulated query failure for {metric_id}"
            )));
        }
        Ok(range
            .iter_days()
            .map(|day| point_for(def, day, simulate_day(self.seed, def, day).0))
            .collect())
    }
}

/// Simulated cloud history service. Serves only cloud-eligible metrics.
pub struct SimulatedCloudSource {
    catalog: Arc<MetricCatalog>,
    seed: u64,
    latency: Duration,
    offline: bool,
}

impl SimulatedCloudSource {
    pub fn new(catalog: Arc<MetricCatalog>, seed: u64) -> Self {
        Self {
            catalog,
            seed,
            latency: Duration::ZERO,
            offline: false,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every request fails with a network error.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }
}

#[async_trait]
impl CloudHistorySource for SimulatedCloudSource {
    async fn fetch_series(
        &self,
        metric_id: &str,
        range: DateRange,
    ) -> Result<Vec<DataPoint>, SourceError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.offline {
            return Err(SourceError::Network("cloud history unreachable".into()));
        }
        let def = self
            .catalog
            .definition_of(metric_id)
            .filter(|d| d.cloud_fallback)
            .ok_or_else(|| SourceError::Unsupported(metric_id.to_string()))?;
        Ok(range
            .iter_days()
            .map(|day| point_for(def, day, simulate_day(self.seed, def, day).0))
            .collect())
    }
}
