//! Metric aggregation engine.
//!
//! Per metric and per window the engine:
//! 1. Looks up source eligibility in the catalog
//! 2. Reads the native store first, through the timeout guard
//! 3. Falls back to the cloud exactly once, only for cloud-eligible metrics,
//!    and only when native produced nothing
//! 4. Lets the first non-empty source win outright (no blending)
//! 5. Recomputes stats from the points it kept
//!
//! Source failures are absorbed here and surface as missing data.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use crate::catalog::{MetricCatalog, MetricDefinition};
use crate::config::{EngineConfig, TrendPolicy};
use crate::guard::{GuardStats, GuardedRead, TimeoutGuardedReader};
use crate::model::{MetricSeries, Snapshot};
use crate::range::DateRange;
use crate::source::{CloudHistorySource, DataPoint, NativeHealthSource, SourceKind};
use crate::stats::MetricStats;

/// Orchestrates native-first reads with bounded waits and cloud fallback.
pub struct MetricAggregationEngine {
    catalog: Arc<MetricCatalog>,
    native: TimeoutGuardedReader,
    cloud: Option<Arc<dyn CloudHistorySource>>,
    config: EngineConfig,
}

impl MetricAggregationEngine {
    /// Engine without a cloud source: fallback is never attempted.
    pub fn new(
        catalog: Arc<MetricCatalog>,
        native: Arc<dyn NativeHealthSource>,
        config: EngineConfig,
    ) -> Self {
        let native = TimeoutGuardedReader::new(native, config.native_timeout())
            .with_max_in_flight(config.max_concurrent_reads);
        Self {
            catalog,
            native,
            cloud: None,
            config,
        }
    }

    /// Attach the cloud history source used for fallback.
    pub fn with_cloud(mut self, cloud: Arc<dyn CloudHistorySource>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn has_cloud(&self) -> bool {
        self.cloud.is_some()
    }

    /// Native read counters (timeouts, failures, late discards).
    pub fn guard_stats(&self) -> GuardStats {
        self.native.stats()
    }

    /// Today's-style value for every catalog metric on `date`.
    ///
    /// Metrics no source could answer are omitted, never zeroed.
    pub async fn snapshot(&self, date: NaiveDate) -> Snapshot {
        let reads: Vec<_> = self
            .catalog
            .all()
            .iter()
            .map(|def| async move { (def.id, self.resolve_scalar(def, date).await) })
            .collect();
        let resolved: Vec<_> = stream::iter(reads)
            .buffer_unordered(self.config.max_concurrent_reads.max(1))
            .collect()
            .await;

        let mut snapshot = Snapshot::empty(date);
        let mut from_cloud = 0usize;
        for (id, hit) in resolved {
            if let Some((value, source)) = hit {
                if source == SourceKind::Cloud {
                    from_cloud += 1;
                }
                snapshot.insert(id, value, source);
            }
        }
        info!(
            "snapshot {date}: {}/{} metrics resolved ({from_cloud} via cloud)",
            snapshot.len(),
            self.catalog.len()
        );
        snapshot
    }

    /// Readings and stats for one metric over `range`.
    ///
    /// Unknown metrics and metrics with no data yield an empty series.
    pub async fn series(&self, metric_id: &str, range: DateRange) -> MetricSeries {
        let Some(def) = self.catalog.definition_of(metric_id) else {
            debug!("{metric_id}: not in catalog, returning empty series");
            return MetricSeries::empty(metric_id, range);
        };

        let Some((points, source)) = self.resolve_points(def, range).await else {
            debug!("{metric_id}: no data for {range}");
            return MetricSeries::empty(metric_id, range);
        };

        let baseline = match self.config.trend {
            TrendPolicy::Off => None,
            TrendPolicy::PrecedingWindow => {
                let prev = self.read_from(source, def, range.preceding()).await;
                (!prev.is_empty()).then(|| MetricStats::from_points(&prev).total)
            }
        };
        let stats = MetricStats::from_points(&points).with_trend(baseline);

        MetricSeries {
            metric_id: def.id.to_string(),
            range,
            points,
            stats,
            source: Some(source),
        }
    }

    /// [`series`](Self::series) for several metrics with bounded fan-out.
    /// Results are returned in request order.
    pub async fn series_many(&self, metric_ids: &[&str], range: DateRange) -> Vec<MetricSeries> {
        stream::iter(metric_ids.iter().copied())
            .map(|id| self.series(id, range))
            .buffered(self.config.max_concurrent_reads.max(1))
            .collect()
            .await
    }

    async fn resolve_scalar(
        &self,
        def: &MetricDefinition,
        date: NaiveDate,
    ) -> Option<(f64, SourceKind)> {
        if def.native_scalar {
            if let GuardedRead::Ready(value) = self.native.read(def.id, date).await {
                return Some((value, SourceKind::Native));
            }
        }
        if !def.cloud_fallback {
            return None;
        }
        let points = self.cloud_points(def, DateRange::single(date)).await;
        def.aggregation
            .reduce(&points)
            .filter(|v| v.is_finite())
            .map(|v| (v, SourceKind::Cloud))
    }

    async fn resolve_points(
        &self,
        def: &MetricDefinition,
        range: DateRange,
    ) -> Option<(Vec<DataPoint>, SourceKind)> {
        if def.native_range {
            let points = self.native_points(def, range).await;
            if !points.is_empty() {
                return Some((points, SourceKind::Native));
            }
        }
        if def.cloud_fallback {
            let points = self.cloud_points(def, range).await;
            if !points.is_empty() {
                return Some((points, SourceKind::Cloud));
            }
        }
        None
    }

    /// Baseline reads stay on the source that served the current window.
    async fn read_from(
        &self,
        source: SourceKind,
        def: &MetricDefinition,
        range: DateRange,
    ) -> Vec<DataPoint> {
        match source {
            SourceKind::Native => self.native_points(def, range).await,
            SourceKind::Cloud => self.cloud_points(def, range).await,
        }
    }

    async fn native_points(&self, def: &MetricDefinition, range: DateRange) -> Vec<DataPoint> {
        match self.native.read_range(def.id, range).await {
            GuardedRead::Ready(points) => clean_points(points, range),
            GuardedRead::Unavailable(_) => Vec::new(),
        }
    }

    async fn cloud_points(&self, def: &MetricDefinition, range: DateRange) -> Vec<DataPoint> {
        if !def.cloud_fallback {
            return Vec::new();
        }
        let Some(cloud) = &self.cloud else {
            return Vec::new();
        };
        let fetch = cloud.fetch_series(def.id, range);
        match tokio::time::timeout(self.config.cloud_timeout(), fetch).await {
            Ok(Ok(points)) => clean_points(points, range),
            Ok(Err(e)) => {
                warn!("{}: cloud fallback failed for {range}: {e}", def.id);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "{}: cloud fallback exceeded {}ms",
                    def.id, self.config.cloud_timeout_ms
                );
                Vec::new()
            }
        }
    }
}

/// Keep finite in-range readings, oldest first.
fn clean_points(mut points: Vec<DataPoint>, range: DateRange) -> Vec<DataPoint> {
    points.retain(|p| p.value.is_finite() && range.contains(&p.timestamp));
    points.sort_by_key(|p| p.timestamp);
    points
}
