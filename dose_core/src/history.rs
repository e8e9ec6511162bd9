//! Calendar-oriented views over the journal.
//!
//! These group records by the user's local calendar, for the month-by-month
//! shot list and the per-day detail view.

use crate::{InjectionEvent, WellnessObservation};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// Everything recorded on one local calendar day
#[derive(Clone, Debug, Default)]
pub struct DayEntries<'a> {
    pub injections: Vec<&'a InjectionEvent>,
    pub observations: Vec<&'a WellnessObservation>,
}

impl DayEntries<'_> {
    pub fn is_empty(&self) -> bool {
        self.injections.is_empty() && self.observations.is_empty()
    }
}

/// Injections logged within one calendar month
#[derive(Clone, Debug)]
pub struct MonthGroup<'a> {
    pub year: i32,
    pub month: u32,
    /// Newest first
    pub injections: Vec<&'a InjectionEvent>,
}

impl MonthGroup<'_> {
    /// Heading such as "March 2024"
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", self.year, self.month))
    }
}

fn local_day<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

/// Collect the records whose local date is `day`, oldest first
pub fn entries_on<'a, Tz: TimeZone>(
    injections: &'a [InjectionEvent],
    observations: &'a [WellnessObservation],
    day: NaiveDate,
    tz: &Tz,
) -> DayEntries<'a> {
    let mut entries = DayEntries {
        injections: injections
            .iter()
            .filter(|i| local_day(i.timestamp, tz) == day)
            .collect(),
        observations: observations
            .iter()
            .filter(|o| local_day(o.timestamp, tz) == day)
            .collect(),
    };
    entries.injections.sort_by_key(|i| i.timestamp);
    entries.observations.sort_by_key(|o| o.timestamp);

    tracing::debug!(
        "{} injections and {} observations on {}",
        entries.injections.len(),
        entries.observations.len(),
        day
    );
    entries
}

/// Group injections by local calendar month, newest month first
pub fn group_by_month<'a, Tz: TimeZone>(
    injections: &'a [InjectionEvent],
    tz: &Tz,
) -> Vec<MonthGroup<'a>> {
    let mut sorted: Vec<&InjectionEvent> = injections.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut groups: Vec<MonthGroup<'a>> = Vec::new();
    for shot in sorted {
        let day = local_day(shot.timestamp, tz);
        let (year, month) = (day.year(), day.month());

        match groups.last_mut() {
            Some(group) if group.year == year && group.month == month => {
                group.injections.push(shot);
            }
            _ => groups.push(MonthGroup {
                year,
                month,
                injections: vec![shot],
            }),
        }
    }

    groups
}
