//! Adherence and trend engine.
//!
//! Pure functions over snapshots of the journal:
//! - Project the next injection date from a fixed weekly cadence
//! - Count the current run of on-schedule injections
//! - Merge weight observations and doses into one chart timeline
//! - Summarize weight change between the first and last weigh-in
//!
//! Nothing here reads the clock or touches storage; callers pass `now`
//! and the current records.

use crate::config::MedicationConfig;
use crate::{InjectionEvent, WellnessObservation};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Assumed interval between doses
pub const CADENCE_DAYS: i64 = 7;

/// How far (in whole days, rounded up) a dose may land from its expected
/// date and still extend the streak
pub const TOLERANCE_DAYS: i64 = 2;

/// Lead time used for the projection when nothing has been logged yet
pub const COLD_START_DAYS: i64 = 1;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Project when the next injection is due
///
/// With no history the projection is one day after `now`; otherwise it is
/// one cadence after the most recent injection.
pub fn next_injection_date(injections: &[InjectionEvent], now: DateTime<Utc>) -> DateTime<Utc> {
    match injections.iter().map(|i| i.timestamp).max() {
        Some(latest) => latest + Duration::days(CADENCE_DAYS),
        None => now + Duration::days(COLD_START_DAYS),
    }
}

/// Count consecutive on-schedule injections, ending at the latest one
///
/// Each dose is compared with the previous dose plus one cadence. Landing
/// within the tolerance window extends the run; anything else starts a new
/// run at that dose. The expected date always re-anchors on the actual
/// dose so small deviations don't accumulate.
pub fn adherence_streak(injections: &[InjectionEvent]) -> u32 {
    let mut timestamps: Vec<DateTime<Utc>> = injections.iter().map(|i| i.timestamp).collect();
    timestamps.sort();

    let Some((&first, rest)) = timestamps.split_first() else {
        return 0;
    };

    let mut streak = 1;
    let mut expected = first;

    for &actual in rest {
        expected += Duration::days(CADENCE_DAYS);

        if day_difference(actual, expected) <= TOLERANCE_DAYS {
            streak += 1;
        } else {
            tracing::debug!(
                "Streak broken at {} (expected around {})",
                actual,
                expected
            );
            streak = 1;
        }
        expected = actual;
    }

    streak
}

/// Absolute difference between two instants in days, rounded up
fn day_difference(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    let millis = (a - b).num_milliseconds().abs();
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// One point on the weight/dose chart
#[derive(Clone, Debug, PartialEq)]
pub struct TimelinePoint {
    pub timestamp: DateTime<Utc>,
    pub weight: Option<f64>,
    pub dose_mg: Option<f64>,
    pub medication: Option<String>,
}

/// Merge weigh-ins and doses into a single ascending timeline
///
/// Records are joined on the exact instant. A weigh-in and a dose logged at
/// different times of the same day stay separate, adjacent points. When
/// several records share an instant, the first one in input order wins.
pub fn merge_timeline(
    injections: &[InjectionEvent],
    observations: &[WellnessObservation],
) -> Vec<TimelinePoint> {
    let weighed: Vec<(DateTime<Utc>, f64)> = observations
        .iter()
        .filter_map(|o| o.weight.map(|w| (o.timestamp, w)))
        .collect();

    let mut timestamps: Vec<DateTime<Utc>> = weighed
        .iter()
        .map(|(t, _)| *t)
        .chain(injections.iter().map(|i| i.timestamp))
        .collect();
    timestamps.sort();
    timestamps.dedup();

    timestamps
        .into_iter()
        .map(|timestamp| {
            let weight = weighed
                .iter()
                .find(|(t, _)| *t == timestamp)
                .map(|(_, w)| *w);
            let shot = injections.iter().find(|i| i.timestamp == timestamp);

            TimelinePoint {
                timestamp,
                weight,
                dose_mg: shot.map(|s| s.dose_mg),
                medication: shot.map(|s| s.medication.clone()),
            }
        })
        .collect()
}

/// Weight change between the first and last weigh-in
#[derive(Clone, Debug, PartialEq)]
pub struct WeightChange {
    pub first_weight: f64,
    pub last_weight: f64,
    pub total_change: f64,
    pub percent_change: f64,
    /// Average change per 7 days across the whole span
    pub weekly_average: f64,
    pub span_days: f64,
}

/// Result of weight-change analysis
#[derive(Clone, Debug, PartialEq)]
pub enum WeightTrend {
    /// Not enough distinct weigh-ins to compute a meaningful change
    InsufficientData,
    Change(WeightChange),
}

impl WeightTrend {
    pub fn change(&self) -> Option<&WeightChange> {
        match self {
            WeightTrend::Change(change) => Some(change),
            WeightTrend::InsufficientData => None,
        }
    }
}

/// Summarize weight change across all weigh-ins
///
/// Needs at least two weigh-ins spanning a non-zero interval and a non-zero
/// starting weight; anything less is reported as insufficient data.
pub fn weight_change(observations: &[WellnessObservation]) -> WeightTrend {
    let mut weighed: Vec<(DateTime<Utc>, f64)> = observations
        .iter()
        .filter_map(|o| o.weight.map(|w| (o.timestamp, w)))
        .collect();
    weighed.sort_by_key(|(t, _)| *t);

    let (Some(&(first_at, first_weight)), Some(&(last_at, last_weight))) =
        (weighed.first(), weighed.last())
    else {
        return WeightTrend::InsufficientData;
    };

    if weighed.len() < 2 {
        return WeightTrend::InsufficientData;
    }

    let span_days = (last_at - first_at).num_milliseconds() as f64 / MILLIS_PER_DAY as f64;
    if span_days <= 0.0 || first_weight == 0.0 {
        tracing::debug!(
            "Weight change undefined (span {} days, first weight {})",
            span_days,
            first_weight
        );
        return WeightTrend::InsufficientData;
    }

    let total_change = last_weight - first_weight;
    let percent_change = total_change / first_weight * 100.0;
    let weekly_average = total_change / (span_days / CADENCE_DAYS as f64);

    if !(percent_change.is_finite() && weekly_average.is_finite()) {
        return WeightTrend::InsufficientData;
    }

    WeightTrend::Change(WeightChange {
        first_weight,
        last_weight,
        total_change,
        percent_change,
        weekly_average,
        span_days,
    })
}

/// Where the user stands relative to the projected next dose
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextDoseStatus {
    /// Nothing logged yet
    NoHistory,
    DueToday,
    DueIn { days: i64 },
    Overdue { days: i64 },
}

/// Classify the projected next dose relative to `now`
///
/// "Today" is judged on the calendar of `tz`; the day counts round up like
/// the countdown on a summary card.
pub fn next_dose_status<Tz: TimeZone>(
    injections: &[InjectionEvent],
    now: DateTime<Utc>,
    tz: &Tz,
) -> NextDoseStatus {
    if injections.is_empty() {
        return NextDoseStatus::NoHistory;
    }

    let next = next_injection_date(injections, now);
    if next.with_timezone(tz).date_naive() == now.with_timezone(tz).date_naive() {
        return NextDoseStatus::DueToday;
    }

    let days = ((next - now).num_milliseconds() as f64 / MILLIS_PER_DAY as f64).ceil() as i64;
    if days < 0 {
        NextDoseStatus::Overdue { days: -days }
    } else {
        NextDoseStatus::DueIn { days }
    }
}

/// The projected next injection, pre-filled for display
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedInjection {
    pub at: DateTime<Utc>,
    pub medication: String,
    pub dose_mg: f64,
    pub site: Option<String>,
    pub sequence_number: u32,
}

/// Number for the next logged injection
///
/// One past the highest stored number, or past the count when older records
/// have no numbers. Deleting a shot never makes a number repeat.
pub fn next_sequence_number(injections: &[InjectionEvent]) -> u32 {
    let highest = injections
        .iter()
        .filter_map(|i| i.sequence_number)
        .max()
        .unwrap_or(0);
    highest.max(injections.len() as u32) + 1
}

/// Plan the next injection from the most recent one
///
/// Medication, dose and site repeat the latest injection; with no history
/// they come from the medication settings.
pub fn plan_next_injection(
    injections: &[InjectionEvent],
    defaults: &MedicationConfig,
    now: DateTime<Utc>,
) -> PlannedInjection {
    let at = next_injection_date(injections, now);
    let latest = injections.iter().max_by_key(|i| i.timestamp);

    match latest {
        Some(last) => PlannedInjection {
            at,
            medication: last.medication.clone(),
            dose_mg: last.dose_mg,
            site: last.site.clone(),
            sequence_number: next_sequence_number(injections),
        },
        None => PlannedInjection {
            at,
            medication: defaults.name.clone(),
            dose_mg: defaults.default_dose_mg,
            site: defaults.default_site.clone(),
            sequence_number: 1,
        },
    }
}
