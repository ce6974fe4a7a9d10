//! Read-mode adapters over resolved engine output.
//!
//! Both builders are pure and synchronous: they reshape a [`Snapshot`] or a
//! set of [`MetricSeries`] for summary views and never touch a source.

use serde::Serialize;

use crate::catalog::{MetricCatalog, MetricCategory, MetricDefinition};
use crate::model::{MetricSeries, Snapshot};
use crate::source::SourceKind;
use crate::stats::MetricStats;

/// One resolved "today" value with its display metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEntry {
    pub metric_id: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub category: MetricCategory,
    pub value: f64,
    pub source: Option<SourceKind>,
}

/// Entries grouped under one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup<T> {
    pub category: MetricCategory,
    pub entries: Vec<T>,
}

/// Shapes a snapshot for display.
pub struct SnapshotBuilder<'a> {
    catalog: &'a MetricCatalog,
    snapshot: &'a Snapshot,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(catalog: &'a MetricCatalog, snapshot: &'a Snapshot) -> Self {
        Self { catalog, snapshot }
    }

    /// Every metric with data, in catalog order.
    pub fn entries(&self) -> Vec<SnapshotEntry> {
        self.catalog
            .all()
            .iter()
            .filter_map(|def| self.entry(def))
            .collect()
    }

    /// Entries grouped by category; categories without data are left out.
    pub fn by_category(&self) -> Vec<CategoryGroup<SnapshotEntry>> {
        group(self.entries().into_iter().map(|e| (e.category, e)))
    }

    /// The first `n` metrics with data, in catalog order.
    pub fn top_n(&self, n: usize) -> Vec<SnapshotEntry> {
        self.catalog
            .all()
            .iter()
            .filter_map(|def| self.entry(def))
            .take(n)
            .collect()
    }

    /// Catalog metrics the snapshot has no value for.
    pub fn missing(&self) -> Vec<&'a MetricDefinition> {
        self.catalog
            .all()
            .iter()
            .filter(|def| !self.snapshot.contains(def.id))
            .collect()
    }

    fn entry(&self, def: &MetricDefinition) -> Option<SnapshotEntry> {
        self.snapshot.get(def.id).map(|value| SnapshotEntry {
            metric_id: def.id,
            name: def.name,
            unit: def.unit,
            category: def.category,
            value,
            source: self.snapshot.source_of(def.id),
        })
    }
}

/// Compact per-series row for list views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub metric_id: String,
    pub name: String,
    pub unit: String,
    pub category: Option<MetricCategory>,
    pub points: usize,
    pub stats: MetricStats,
    pub source: Option<SourceKind>,
}

/// Shapes a set of series for display.
pub struct SeriesBuilder<'a> {
    catalog: &'a MetricCatalog,
    series: &'a [MetricSeries],
}

impl<'a> SeriesBuilder<'a> {
    pub fn new(catalog: &'a MetricCatalog, series: &'a [MetricSeries]) -> Self {
        Self { catalog, series }
    }

    /// Series that actually have points.
    pub fn with_data(&self) -> Vec<&'a MetricSeries> {
        self.series.iter().filter(|s| s.has_data()).collect()
    }

    /// Summaries of series with data, grouped by category. Series for ids
    /// the catalog does not know are skipped.
    pub fn by_category(&self) -> Vec<CategoryGroup<SeriesSummary>> {
        group(
            self.summaries()
                .into_iter()
                .filter(|s| s.points > 0)
                .filter_map(|s| s.category.map(|category| (category, s))),
        )
    }

    /// The `n` series with the largest absolute trend, biggest first.
    pub fn top_movers(&self, n: usize) -> Vec<SeriesSummary> {
        let mut rows: Vec<_> = self
            .summaries()
            .into_iter()
            .filter(|s| s.points > 0)
            .collect();
        rows.sort_by(|a, b| {
            b.stats
                .trend_percent
                .abs()
                .total_cmp(&a.stats.trend_percent.abs())
        });
        rows.truncate(n);
        rows
    }

    /// One row per input series, in input order.
    pub fn summaries(&self) -> Vec<SeriesSummary> {
        self.series
            .iter()
            .map(|s| {
                let def = self.catalog.definition_of(&s.metric_id);
                SeriesSummary {
                    metric_id: s.metric_id.clone(),
                    name: def.map_or_else(|| s.metric_id.clone(), |d| d.name.to_string()),
                    unit: def.map(|d| d.unit.to_string()).unwrap_or_default(),
                    category: def.map(|d| d.category),
                    points: s.points.len(),
                    stats: s.stats,
                    source: s.source,
                }
            })
            .collect()
    }
}

/// Group items by category, categories in display order.
fn group<T>(items: impl IntoIterator<Item = (MetricCategory, T)>) -> Vec<CategoryGroup<T>> {
    let mut groups: Vec<CategoryGroup<T>> = MetricCategory::ALL
        .into_iter()
        .map(|category| CategoryGroup {
            category,
            entries: Vec::new(),
        })
        .collect();
    for (category, item) in items {
        if let Some(g) = groups.iter_mut().find(|g| g.category == category) {
            g.entries.push(item);
        }
    }
    groups.retain(|g| !g.entries.is_empty());
    groups
}
