//! Static registry of metric definitions.
//!
//! The catalog is built once at startup and shared read-only (usually behind
//! an `Arc`). Every metric declares its unit, category, how it reduces to a
//! single value, and which sources may serve it. Only the small, closed set of
//! metrics marked `cloud_fallback` may ever reach the cloud history service.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::source::DataPoint;

/// Category of health metric, used for grouping in summary views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    /// Movement, energy and workouts.
    Activity,
    /// Body measurements.
    Body,
    /// Heart rate and rhythm.
    Heart,
    /// Blood pressure, oxygen, glucose.
    Vitals,
    /// Breathing and lung function.
    Respiratory,
    /// Sleep duration and stages.
    Sleep,
    /// Dietary intake.
    Nutrition,
    /// Gait and balance.
    Mobility,
    /// Mindfulness and mood.
    Mindfulness,
    /// Sound exposure.
    Hearing,
    /// Cycle tracking.
    Reproductive,
    /// Daylight and UV.
    Environment,
    /// Hygiene events.
    Hygiene,
}

impl MetricCategory {
    /// Every category in display order.
    pub const ALL: [MetricCategory; 13] = [
        Self::Activity,
        Self::Body,
        Self::Heart,
        Self::Vitals,
        Self::Respiratory,
        Self::Sleep,
        Self::Nutrition,
        Self::Mobility,
        Self::Mindfulness,
        Self::Hearing,
        Self::Reproductive,
        Self::Environment,
        Self::Hygiene,
    ];

    /// Parse a category label (case-insensitive).
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.to_string() == label)
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activity => write!(f, "activity"),
            Self::Body => write!(f, "body"),
            Self::Heart => write!(f, "heart"),
            Self::Vitals => write!(f, "vitals"),
            Self::Respiratory => write!(f, "respiratory"),
            Self::Sleep => write!(f, "sleep"),
            Self::Nutrition => write!(f, "nutrition"),
            Self::Mobility => write!(f, "mobility"),
            Self::Mindfulness => write!(f, "mindfulness"),
            Self::Hearing => write!(f, "hearing"),
            Self::Reproductive => write!(f, "reproductive"),
            Self::Environment => write!(f, "environment"),
            Self::Hygiene => write!(f, "hygiene"),
        }
    }
}

/// How a day's worth of readings collapses into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Cumulative quantities (steps, energy, sleep hours).
    Sum,
    /// Discrete samples (heart rate, SpO2).
    Average,
    /// Slow-moving measurements where the newest reading wins (weight).
    Latest,
}

impl Aggregation {
    /// Reduce chronologically ordered points. `None` for an empty slice.
    pub fn reduce(&self, points: &[DataPoint]) -> Option<f64> {
        if points.is_empty() {
            return None;
        }
        match self {
            Self::Sum => Some(points.iter().map(|p| p.value).sum()),
            Self::Average => {
                Some(points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64)
            }
            Self::Latest => points
                .iter()
                .max_by_key(|p| p.timestamp)
                .map(|p| p.value),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum => write!(f, "sum"),
            Self::Average => write!(f, "average"),
            Self::Latest => write!(f, "latest"),
        }
    }
}

/// Immutable description of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDefinition {
    /// Stable identifier (e.g. `"steps"`).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Display unit.
    pub unit: &'static str,
    pub category: MetricCategory,
    pub aggregation: Aggregation,
    /// Typical daily value range `(low, high)` for display hints.
    pub reference_range: (f64, f64),
    /// Native store can answer a single-day scalar read.
    pub native_scalar: bool,
    /// Native store can answer a range read.
    pub native_range: bool,
    /// May fall back to the cloud history service.
    pub cloud_fallback: bool,
}

impl MetricDefinition {
    /// A native-only metric readable both as scalar and range.
    pub const fn new(
        id: &'static str,
        name: &'static str,
        unit: &'static str,
        category: MetricCategory,
        aggregation: Aggregation,
        reference_range: (f64, f64),
    ) -> Self {
        Self {
            id,
            name,
            unit,
            category,
            aggregation,
            reference_range,
            native_scalar: true,
            native_range: true,
            cloud_fallback: false,
        }
    }

    /// Mark the metric as eligible for cloud fallback.
    pub const fn with_cloud_fallback(mut self) -> Self {
        self.cloud_fallback = true;
        self
    }

    /// The native store only exposes history for this metric, not a daily scalar.
    pub const fn range_only(mut self) -> Self {
        self.native_scalar = false;
        self
    }

    /// Whether the native store can serve this metric at all.
    pub fn native_eligible(&self) -> bool {
        self.native_scalar || self.native_range
    }
}

use Aggregation::{Average, Latest, Sum};
use MetricCategory::*;

#[allow(clippy::too_many_arguments)]
const fn m(
    id: &'static str,
    name: &'static str,
    unit: &'static str,
    category: MetricCategory,
    aggregation: Aggregation,
    low: f64,
    high: f64,
) -> MetricDefinition {
    MetricDefinition::new(id, name, unit, category, aggregation, (low, high))
}

/// The builtin catalog, in display order.
#[rustfmt::skip]
static BUILTIN_METRICS: &[MetricDefinition] = &[
    // Activity
    m("steps", "Steps", "count", Activity, Sum, 0.0, 30000.0),
    m("distance_walking_running", "Walking + Running Distance", "km", Activity, Sum, 0.0, 40.0),
    m("distance_cycling", "Cycling Distance", "km", Activity, Sum, 0.0, 150.0),
    m("distance_swimming", "Swimming Distance", "m", Activity, Sum, 0.0, 5000.0),
    m("distance_wheelchair", "Wheelchair Distance", "km", Activity, Sum, 0.0, 40.0),
    m("flights_climbed", "Flights Climbed", "count", Activity, Sum, 0.0, 100.0),
    m("active_energy", "Active Energy", "kcal", Activity, Sum, 0.0, 3000.0),
    m("basal_energy", "Resting Energy", "kcal", Activity, Sum, 800.0, 2500.0),
    m("exercise_minutes", "Exercise Minutes", "min", Activity, Sum, 0.0, 300.0),
    m("stand_minutes", "Stand Minutes", "min", Activity, Sum, 0.0, 600.0),
    m("stand_hours", "Stand Hours", "h", Activity, Sum, 0.0, 24.0),
    m("move_minutes", "Move Minutes", "min", Activity, Sum, 0.0, 600.0),
    m("push_count", "Wheelchair Pushes", "count", Activity, Sum, 0.0, 5000.0),
    m("swimming_strokes", "Swimming Strokes", "count", Activity, Sum, 0.0, 5000.0),
    m("workout_count", "Workouts", "count", Activity, Sum, 0.0, 10.0),
    m("workout_duration", "Workout Duration", "min", Activity, Sum, 0.0, 300.0),
    m("vo2_max", "Cardio Fitness (VO2 max)", "mL/kg/min", Activity, Latest, 15.0, 70.0).range_only(),
    m("physical_effort", "Physical Effort", "kcal/hr·kg", Activity, Average, 1.0, 15.0),
    m("running_speed", "Running Speed", "m/s", Activity, Average, 1.0, 7.0),
    m("running_power", "Running Power", "W", Activity, Average, 100.0, 500.0),
    m("running_stride_length", "Running Stride Length", "m", Activity, Average, 0.5, 2.5),
    m("running_ground_contact_time", "Ground Contact Time", "ms", Activity, Average, 150.0, 350.0),
    m("running_vertical_oscillation", "Vertical Oscillation", "cm", Activity, Average, 4.0, 14.0),
    m("cycling_speed", "Cycling Speed", "km/h", Activity, Average, 5.0, 50.0),
    m("cycling_power", "Cycling Power", "W", Activity, Average, 50.0, 400.0),
    m("cycling_cadence", "Cycling Cadence", "rpm", Activity, Average, 40.0, 120.0),
    // Body
    m("body_mass", "Weight", "kg", Body, Latest, 30.0, 200.0).with_cloud_fallback(),
    m("body_mass_index", "Body Mass Index", "kg/m²", Body, Latest, 12.0, 50.0),
    m("body_fat_percentage", "Body Fat", "%", Body, Latest, 3.0, 60.0),
    m("lean_body_mass", "Lean Body Mass", "kg", Body, Latest, 20.0, 120.0),
    m("height", "Height", "cm", Body, Latest, 100.0, 220.0),
    m("waist_circumference", "Waist Circumference", "cm", Body, Latest, 50.0, 160.0),
    m("body_temperature", "Body Temperature", "°C", Body, Average, 35.0, 39.0),
    m("basal_body_temperature", "Basal Body Temperature", "°C", Body, Average, 35.5, 37.5),
    m("wrist_temperature", "Wrist Temperature Deviation", "°C", Body, Average, -2.0, 2.0),
    // Heart
    m("heart_rate", "Heart Rate", "bpm", Heart, Average, 40.0, 180.0),
    m("resting_heart_rate", "Resting Heart Rate", "bpm", Heart, Average, 35.0, 100.0).with_cloud_fallback(),
    m("walking_heart_rate_average", "Walking Heart Rate Average", "bpm", Heart, Average, 60.0, 140.0),
    m("heart_rate_variability", "Heart Rate Variability", "ms", Heart, Average, 10.0, 150.0).with_cloud_fallback(),
    m("heart_rate_recovery", "Cardio Recovery", "bpm", Heart, Average, 5.0, 60.0),
    m("atrial_fibrillation_burden", "AFib History", "%", Heart, Latest, 0.0, 100.0).range_only(),
    m("high_heart_rate_events", "High Heart Rate Notifications", "count", Heart, Sum, 0.0, 10.0),
    m("low_heart_rate_events", "Low Heart Rate Notifications", "count", Heart, Sum, 0.0, 10.0),
    m("irregular_rhythm_events", "Irregular Rhythm Notifications", "count", Heart, Sum, 0.0, 10.0),
    m("peripheral_perfusion_index", "Peripheral Perfusion Index", "%", Heart, Average, 0.2, 20.0),
    // Vitals
    m("blood_pressure_systolic", "Blood Pressure (Systolic)", "mmHg", Vitals, Average, 80.0, 180.0),
    m("blood_pressure_diastolic", "Blood Pressure (Diastolic)", "mmHg", Vitals, Average, 50.0, 120.0),
    m("blood_oxygen", "Blood Oxygen", "%", Vitals, Average, 85.0, 100.0),
    m("blood_glucose", "Blood Glucose", "mg/dL", Vitals, Average, 60.0, 250.0),
    m("insulin_delivery", "Insulin Delivery", "IU", Vitals, Sum, 0.0, 100.0),
    m("blood_alcohol_content", "Blood Alcohol Content", "%", Vitals, Average, 0.0, 0.3),
    m("electrodermal_activity", "Electrodermal Activity", "µS", Vitals, Average, 0.1, 20.0),
    // Respiratory
    m("respiratory_rate", "Respiratory Rate", "breaths/min", Respiratory, Average, 8.0, 30.0),
    m("forced_vital_capacity", "Forced Vital Capacity", "L", Respiratory, Latest, 1.0, 7.0),
    m("forced_expiratory_volume", "Forced Expiratory Volume", "L", Respiratory, Latest, 1.0, 6.0),
    m("peak_expiratory_flow", "Peak Expiratory Flow", "L/min", Respiratory, Latest, 100.0, 800.0),
    m("inhaler_usage", "Inhaler Usage", "count", Respiratory, Sum, 0.0, 20.0),
    m("sleeping_breathing_disturbances", "Breathing Disturbances", "count/h", Respiratory, Average, 0.0, 30.0),
    // Sleep
    m("sleep_duration", "Time Asleep", "h", Sleep, Sum, 0.0, 14.0).with_cloud_fallback(),
    m("sleep_in_bed", "Time in Bed", "h", Sleep, Sum, 0.0, 16.0),
    m("sleep_core", "Core Sleep", "h", Sleep, Sum, 0.0, 10.0),
    m("sleep_deep", "Deep Sleep", "h", Sleep, Sum, 0.0, 4.0),
    m("sleep_rem", "REM Sleep", "h", Sleep, Sum, 0.0, 4.0),
    m("sleep_awake", "Awake", "h", Sleep, Sum, 0.0, 4.0),
    m("sleep_efficiency", "Sleep Efficiency", "%", Sleep, Average, 50.0, 100.0),
    m("sleep_latency", "Sleep Latency", "min", Sleep, Average, 0.0, 120.0),
    // Nutrition
    m("dietary_energy", "Dietary Energy", "kcal", Nutrition, Sum, 0.0, 5000.0),
    m("dietary_protein", "Protein", "g", Nutrition, Sum, 0.0, 300.0),
    m("dietary_carbohydrates", "Carbohydrates", "g", Nutrition, Sum, 0.0, 600.0),
    m("dietary_fat_total", "Total Fat", "g", Nutrition, Sum, 0.0, 250.0),
    m("dietary_fat_saturated", "Saturated Fat", "g", Nutrition, Sum, 0.0, 100.0),
    m("dietary_fiber", "Fiber", "g", Nutrition, Sum, 0.0, 80.0),
    m("dietary_sugar", "Sugar", "g", Nutrition, Sum, 0.0, 200.0),
    m("dietary_sodium", "Sodium", "mg", Nutrition, Sum, 0.0, 6000.0),
    m("dietary_cholesterol", "Cholesterol", "mg", Nutrition, Sum, 0.0, 800.0),
    m("dietary_calcium", "Calcium", "mg", Nutrition, Sum, 0.0, 2500.0),
    m("dietary_iron", "Iron", "mg", Nutrition, Sum, 0.0, 50.0),
    m("dietary_potassium", "Potassium", "mg", Nutrition, Sum, 0.0, 6000.0),
    m("dietary_vitamin_c", "Vitamin C", "mg", Nutrition, Sum, 0.0, 500.0),
    m("dietary_vitamin_d", "Vitamin D", "mcg", Nutrition, Sum, 0.0, 100.0),
    m("dietary_caffeine", "Caffeine", "mg", Nutrition, Sum, 0.0, 800.0),
    m("dietary_water", "Water", "mL", Nutrition, Sum, 0.0, 5000.0),
    // Mobility
    m("walking_speed", "Walking Speed", "m/s", Mobility, Average, 0.3, 2.0),
    m("walking_step_length", "Walking Step Length", "cm", Mobility, Average, 30.0, 100.0),
    m("walking_asymmetry", "Walking Asymmetry", "%", Mobility, Average, 0.0, 40.0),
    m("walking_double_support", "Double Support Time", "%", Mobility, Average, 15.0, 45.0),
    m("walking_steadiness", "Walking Steadiness", "%", Mobility, Latest, 0.0, 100.0).range_only(),
    m("stair_ascent_speed", "Stair Speed: Up", "m/s", Mobility, Average, 0.1, 1.0),
    m("stair_descent_speed", "Stair Speed: Down", "m/s", Mobility, Average, 0.1, 1.0),
    m("six_minute_walk_distance", "Six-Minute Walk", "m", Mobility, Latest, 100.0, 800.0).range_only(),
    m("number_of_falls", "Number of Falls", "count", Mobility, Sum, 0.0, 5.0),
    // Mindfulness
    m("mindful_minutes", "Mindful Minutes", "min", Mindfulness, Sum, 0.0, 180.0),
    m("state_of_mind", "State of Mind", "valence", Mindfulness, Average, -1.0, 1.0),
    // Hearing
    m("environmental_audio_exposure", "Environmental Sound Levels", "dBA", Hearing, Average, 30.0, 100.0),
    m("headphone_audio_exposure", "Headphone Audio Levels", "dBA", Hearing, Average, 30.0, 100.0),
    m("environmental_sound_reduction", "Environmental Sound Reduction", "dBA", Hearing, Average, 0.0, 40.0),
    // Reproductive
    m("menstrual_flow", "Menstrual Flow", "level", Reproductive, Latest, 0.0, 4.0),
    m("cervical_mucus_quality", "Cervical Mucus Quality", "level", Reproductive, Latest, 0.0, 5.0),
    m("ovulation_test_result", "Ovulation Test Result", "level", Reproductive, Latest, 0.0, 4.0),
    m("sexual_activity", "Sexual Activity", "count", Reproductive, Sum, 0.0, 10.0),
    // Environment
    m("uv_exposure", "UV Index", "index", Environment, Average, 0.0, 12.0),
    m("time_in_daylight", "Time in Daylight", "min", Environment, Sum, 0.0, 600.0),
    // Hygiene
    m("toothbrushing_events", "Toothbrushing", "count", Hygiene, Sum, 0.0, 5.0),
    m("handwashing_events", "Handwashing", "count", Hygiene, Sum, 0.0, 30.0),
];

/// Read-only registry of metric definitions.
///
/// Lookups never fail: an unknown id simply returns `None`.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    definitions: Vec<MetricDefinition>,
    index: HashMap<&'static str, usize>,
}

impl MetricCatalog {
    /// The standard catalog of ~100 metrics.
    pub fn builtin() -> Self {
        let definitions = BUILTIN_METRICS.to_vec();
        let index = definitions
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id, i))
            .collect();
        Self { definitions, index }
    }

    /// Build a custom catalog. Ids must be unique.
    pub fn from_definitions(definitions: Vec<MetricDefinition>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if index.insert(def.id, i).is_some() {
                return Err(CatalogError::DuplicateId(def.id.to_string()));
            }
        }
        Ok(Self { definitions, index })
    }

    pub fn definition_of(&self, id: &str) -> Option<&MetricDefinition> {
        self.index.get(id).map(|&i| &self.definitions[i])
    }

    pub fn all(&self) -> &[MetricDefinition] {
        &self.definitions
    }

    pub fn by_category(&self, category: MetricCategory) -> Vec<&MetricDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.category == category)
            .collect()
    }

    /// The closed fallback subset allowed to query the cloud.
    pub fn cloud_eligible(&self) -> Vec<&MetricDefinition> {
        self.definitions.iter().filter(|d| d.cloud_fallback).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Position of a metric in display order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
