//! Source collaborators and the data they produce.
//!
//! Every backing store implements one of two async traits:
//! [`NativeHealthSource`] for the on-device store and [`CloudHistorySource`]
//! for the network history service. The engine only ever talks to them
//! through these traits.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::range::DateRange;

/// One reading. Produced per read and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Named sub-values, e.g. systolic/diastolic or sleep stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<BTreeMap<String, f64>>,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            min: None,
            max: None,
            components: None,
        }
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, value: f64) -> Self {
        self.components
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value);
        self
    }
}

/// Which collaborator answered a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Native,
    Cloud,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Cloud => write!(f, "cloud"),
        }
    }
}

/// The on-device health store.
///
/// Calls may be slow and are not guaranteed to be cancellable; the engine
/// always wraps them in a timeout guard.
#[async_trait]
pub trait NativeHealthSource: Send + Sync {
    /// Today's-style scalar for one metric on one day. `Ok(None)` = no data.
    async fn read_scalar(&self, metric_id: &str, date: NaiveDate)
    -> Result<Option<f64>, SourceError>;

    /// All readings for one metric within `range`.
    async fn read_range(
        &self,
        metric_id: &str,
        range: DateRange,
    ) -> Result<Vec<DataPoint>, SourceError>;
}

/// The authenticated cloud history service. Only consulted for metrics the
/// catalog marks as cloud-eligible.
#[async_trait]
pub trait CloudHistorySource: Send + Sync {
    async fn fetch_series(
        &self,
        metric_id: &str,
        range: DateRange,
    ) -> Result<Vec<DataPoint>, SourceError>;
}
