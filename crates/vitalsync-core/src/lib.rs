//! # vitalsync-core
//!
//! **One consistent view of health metrics from two unreliable sources.**
//!
//! `vitalsync-core` reconciles readings from an on-device health store and a
//! cloud history service. It decides, per metric and per window, which source
//! to ask, bounds how long it waits, and tells "no data" apart from a real
//! zero.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vitalsync_core::{
//!     DateRange, EngineConfig, MetricAggregationEngine, MetricCatalog,
//!     SimulatedCloudSource, SimulatedNativeSource,
//! };
//!
//! # async fn demo() {
//! let catalog = Arc::new(MetricCatalog::builtin());
//! let native = Arc::new(SimulatedNativeSource::new(catalog.clone(), 42));
//! let cloud = Arc::new(SimulatedCloudSource::new(catalog.clone(), 42));
//! let engine = MetricAggregationEngine::new(catalog, native, EngineConfig::default())
//!     .with_cloud(cloud);
//!
//! let today = chrono::Utc::now().date_naive();
//! let snapshot = engine.snapshot(today).await;
//! println!("{} metrics have data today", snapshot.len());
//!
//! let week = DateRange::last_days(today, 7).unwrap();
//! let steps = engine.series("steps", week).await;
//! println!("7-day total: {}", steps.stats.total);
//! # }
//! ```
//!
//! ## Architecture
//!
//! Catalog → Guarded native read → (cloud fallback) → Stats → Builders
//!
//! - Native is always asked first, through a [`TimeoutGuardedReader`].
//! - Only the four cloud-eligible metrics may fall back to the cloud, and
//!   only once per call.
//! - The first source with data wins outright; sources are never blended.
//! - Every source failure degrades to "no data" for that metric.

pub mod builders;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod model;
pub mod range;
pub mod source;
pub mod sources;
pub mod stats;

pub use builders::{CategoryGroup, SeriesBuilder, SeriesSummary, SnapshotBuilder, SnapshotEntry};
pub use catalog::{Aggregation, MetricCatalog, MetricCategory, MetricDefinition};
pub use config::{EngineConfig, TrendPolicy};
pub use engine::MetricAggregationEngine;
pub use error::{CatalogError, ConfigError, RangeError, SourceError};
pub use guard::{GuardStats, GuardedRead, Settle, TimeoutGuardedReader, UnavailableReason};
pub use model::{MetricSeries, Snapshot};
pub use range::DateRange;
pub use source::{CloudHistorySource, DataPoint, NativeHealthSource, SourceKind};
pub use sources::{HttpCloudSource, SimulatedCloudSource, SimulatedNativeSource};
pub use stats::{MetricStats, trend_percent};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
