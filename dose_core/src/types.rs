//! Core domain types for the dose journal.
//!
//! This module defines the records the journal keeps:
//! - Injection events (one per administered dose)
//! - Wellness observations (weight, intake, custom metrics)
//! - Reminders raised ahead of the next injection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Injection Types
// ============================================================================

/// A single administered dose
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InjectionEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub medication: String,
    pub dose_mg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_effects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u32>,
}

/// Input for logging a new injection
///
/// Every field is optional; the journal fills gaps from the current time
/// and the medication settings.
#[derive(Clone, Debug, Default)]
pub struct NewInjection {
    pub timestamp: Option<DateTime<Utc>>,
    pub medication: Option<String>,
    pub dose_mg: Option<f64>,
    pub site: Option<String>,
    pub notes: Option<String>,
    pub side_effects: Vec<String>,
}

// ============================================================================
// Wellness Types
// ============================================================================

/// Value of a user-defined metric
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Numeric(f64),
    Text(String),
}

impl MetricValue {
    /// Interpret free-form user input: finite numbers stay numeric,
    /// anything else is kept as text.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => MetricValue::Numeric(n),
            _ => MetricValue::Text(trimmed.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Numeric(n) => Some(*n),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Numeric(n) => write!(f, "{}", n),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

/// A set of body/health metrics captured at one instant
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WellnessObservation {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_ounces: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_metrics: BTreeMap<String, MetricValue>,
}

impl WellnessObservation {
    /// True when the observation records nothing at all
    pub fn is_empty(&self) -> bool {
        self.weight.is_none()
            && self.protein_grams.is_none()
            && self.water_ounces.is_none()
            && self.calories.is_none()
            && self.notes.is_none()
            && self.custom_metrics.is_empty()
    }
}

/// Input for recording a new wellness observation
#[derive(Clone, Debug, Default)]
pub struct NewObservation {
    pub timestamp: Option<DateTime<Utc>>,
    pub weight: Option<f64>,
    pub protein_grams: Option<f64>,
    pub water_ounces: Option<f64>,
    pub calories: Option<f64>,
    pub notes: Option<String>,
    pub custom_metrics: BTreeMap<String, MetricValue>,
}

// ============================================================================
// Reminder Types
// ============================================================================

/// What a reminder is about
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Shot,
    Wellness,
    Custom,
}

/// A reminder raised for the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub message: String,
    pub read: bool,
    pub kind: ReminderKind,
}
