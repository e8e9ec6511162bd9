//! Data export: a combined CSV of shots and wellness, and a full JSON bundle.

use crate::{InjectionEvent, Reminder, Result, WellnessObservation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Column names, in the field order of [`CsvRow`]
const CSV_HEADERS: [&str; 10] = [
    "Date",
    "Type",
    "Medication",
    "Dose (mg)",
    "Location",
    "Weight",
    "Protein (g)",
    "Water (oz)",
    "Calories",
    "Notes",
];

/// A row in the CSV output
///
/// Shots fill the medication columns, wellness observations the metric
/// columns; the other side is left blank.
#[derive(Debug, Serialize)]
struct CsvRow {
    date: String,
    kind: &'static str,
    medication: Option<String>,
    dose_mg: Option<f64>,
    location: Option<String>,
    weight: Option<f64>,
    protein_grams: Option<f64>,
    water_ounces: Option<f64>,
    calories: Option<f64>,
    notes: Option<String>,
}

impl From<&InjectionEvent> for CsvRow {
    fn from(shot: &InjectionEvent) -> Self {
        CsvRow {
            date: shot.timestamp.to_rfc3339(),
            kind: "Shot",
            medication: Some(shot.medication.clone()),
            dose_mg: Some(shot.dose_mg),
            location: shot.site.clone(),
            weight: None,
            protein_grams: None,
            water_ounces: None,
            calories: None,
            notes: shot.notes.clone(),
        }
    }
}

impl From<&WellnessObservation> for CsvRow {
    fn from(obs: &WellnessObservation) -> Self {
        CsvRow {
            date: obs.timestamp.to_rfc3339(),
            kind: "Wellness",
            medication: None,
            dose_mg: None,
            location: None,
            weight: obs.weight,
            protein_grams: obs.protein_grams,
            water_ounces: obs.water_ounces,
            calories: obs.calories,
            notes: obs.notes.clone(),
        }
    }
}

/// Write shots and wellness observations as one CSV, oldest first
///
/// Returns the number of data rows written.
pub fn write_csv<W: Write>(
    injections: &[InjectionEvent],
    observations: &[WellnessObservation],
    writer: W,
) -> Result<usize> {
    let mut rows: Vec<(DateTime<Utc>, CsvRow)> = injections
        .iter()
        .map(|s| (s.timestamp, CsvRow::from(s)))
        .chain(observations.iter().map(|o| (o.timestamp, CsvRow::from(o))))
        .collect();
    // Stable: a shot and an observation at the same instant keep shot first
    rows.sort_by_key(|(t, _)| *t);

    // Headers are written up front so an empty journal still gets them
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(CSV_HEADERS)?;

    for (_, row) in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!("Exported {} rows to CSV", rows.len());
    Ok(rows.len())
}

/// Write the CSV export to a file
pub fn write_csv_file(
    injections: &[InjectionEvent],
    observations: &[WellnessObservation],
    path: &Path,
) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let count = write_csv(injections, observations, file)?;
    tracing::info!("Wrote CSV export to {:?}", path);
    Ok(count)
}

/// Everything in the journal, for backup or transfer
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExportBundle {
    pub shots: Vec<InjectionEvent>,
    pub wellness: Vec<WellnessObservation>,
    pub reminders: Vec<Reminder>,
    pub export_date: DateTime<Utc>,
}

impl ExportBundle {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Default name for a JSON export taken at `now`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("doselog-data-{}.json", now.format("%Y-%m-%d"))
}
