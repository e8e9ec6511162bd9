//! Shot reminders.
//!
//! A reminder fires `lead_days` before the projected next injection, at the
//! configured local time of day. Reminders that fired are kept as records so
//! the same reminder is not raised twice.

use crate::config::ReminderConfig;
use crate::{Error, Reminder, ReminderKind, Result};
use chrono::{DateTime, Duration, LocalResult, TimeZone, Utc};
use uuid::Uuid;

/// When the reminder for `next_injection` should fire
///
/// Returns `None` when reminders are disabled.
pub fn reminder_at<Tz: TimeZone>(
    next_injection: DateTime<Utc>,
    settings: &ReminderConfig,
    tz: &Tz,
) -> Result<Option<DateTime<Utc>>> {
    if !settings.enabled {
        return Ok(None);
    }

    let time = settings.time_of_day()?;
    let day = (next_injection - Duration::days(i64::from(settings.lead_days)))
        .with_timezone(tz)
        .date_naive();
    let local = day.and_time(time);

    let at = match tz.from_local_datetime(&local) {
        LocalResult::Single(at) => at,
        // Repeated wall-clock hour: take the first occurrence
        LocalResult::Ambiguous(first, _) => first,
        // Skipped by a DST change: the same wall-clock reading one hour on
        LocalResult::None => tz
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest()
            .ok_or_else(|| {
                Error::Config(format!(
                    "Reminder time {} does not exist on {} in this time zone",
                    settings.time, day
                ))
            })?,
    };

    Ok(Some(at.with_timezone(&Utc)))
}

/// Raise a shot reminder if one is due and hasn't been raised yet
///
/// A reminder is due once `now` reaches its firing time and the shot itself
/// is not yet in the past.
pub fn pending_reminder<Tz: TimeZone>(
    now: DateTime<Utc>,
    next_injection: DateTime<Utc>,
    settings: &ReminderConfig,
    existing: &[Reminder],
    tz: &Tz,
) -> Result<Option<Reminder>> {
    let Some(at) = reminder_at(next_injection, settings, tz)? else {
        return Ok(None);
    };

    if now < at || now >= next_injection {
        return Ok(None);
    }

    let already_raised = existing
        .iter()
        .any(|r| r.kind == ReminderKind::Shot && r.date == at);
    if already_raised {
        tracing::debug!("Shot reminder for {} already raised", at);
        return Ok(None);
    }

    tracing::info!("Raising shot reminder scheduled for {}", at);
    Ok(Some(Reminder {
        id: Uuid::new_v4(),
        date: at,
        message: settings.message.clone(),
        read: false,
        kind: ReminderKind::Shot,
    }))
}

impl Reminder {
    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, NaiveDateTime};

    /// UTC until 02:00 local on 2024-03-10, then UTC+1; 02:00-03:00 that
    /// day never happens on the wall clock
    #[derive(Clone, Copy, Debug)]
    struct SpringForward;

    impl SpringForward {
        fn switch_local() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .and_hms_opt(2, 0, 0)
                .unwrap()
        }

        fn before() -> FixedOffset {
            FixedOffset::east_opt(0).unwrap()
        }

        fn after() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, _: &NaiveDate) -> LocalResult<FixedOffset> {
            LocalResult::Single(Self::before())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let switch = Self::switch_local();
            if *local < switch {
                LocalResult::Single(Self::before())
            } else if *local >= switch + Duration::hours(1) {
                LocalResult::Single(Self::after())
            } else {
                LocalResult::None
            }
        }

        fn offset_from_utc_date(&self, _: &NaiveDate) -> FixedOffset {
            Self::before()
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            // The switch happens at 02:00 UTC (02:00 local before the change)
            if *utc < Self::switch_local() {
                Self::before()
            } else {
                Self::after()
            }
        }
    }

    fn next_shot() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_reminder_at_default_settings() {
        let settings = ReminderConfig::default();
        let at = reminder_at(next_shot(), &settings, &Utc).unwrap();
        assert_eq!(at, Some(Utc.with_ymd_and_hms(2024, 5, 9, 9, 0, 0).unwrap()));
    }

    #[test]
    fn test_reminder_at_uses_local_time() {
        let settings = ReminderConfig {
            time: "08:30".into(),
            lead_days: 2,
            ..ReminderConfig::default()
        };
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();

        let at = reminder_at(next_shot(), &settings, &minus_five).unwrap();
        // 08:30 at UTC-5 on May 8th
        assert_eq!(at, Some(Utc.with_ymd_and_hms(2024, 5, 8, 13, 30, 0).unwrap()));
    }

    #[test]
    fn test_reminder_in_dst_gap_rolls_forward() {
        let settings = ReminderConfig {
            time: "02:30".into(),
            ..ReminderConfig::default()
        };
        let next = Utc.with_ymd_and_hms(2024, 3, 11, 18, 0, 0).unwrap();

        // 02:30 doesn't exist on the 10th; 03:30 at UTC+1 does
        let at = reminder_at(next, &settings, &SpringForward).unwrap();
        assert_eq!(at, Some(Utc.with_ymd_and_hms(2024, 3, 10, 2, 30, 0).unwrap()));

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let reminder = pending_reminder(now, next, &settings, &[], &SpringForward)
            .unwrap()
            .expect("reminder should be due");
        assert_eq!(reminder.date, at.unwrap());
    }

    #[test]
    fn test_reminder_disabled() {
        let settings = ReminderConfig {
            enabled: false,
            ..ReminderConfig::default()
        };
        assert_eq!(reminder_at(next_shot(), &settings, &Utc).unwrap(), None);
    }

    #[test]
    fn test_reminder_bad_time_is_config_error() {
        let settings = ReminderConfig {
            time: "25:99".into(),
            ..ReminderConfig::default()
        };
        assert!(matches!(
            reminder_at(next_shot(), &settings, &Utc),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_pending_reminder_window() {
        let settings = ReminderConfig::default();
        let fires_at = Utc.with_ymd_and_hms(2024, 5, 9, 9, 0, 0).unwrap();

        let too_early = fires_at - Duration::minutes(1);
        assert!(pending_reminder(too_early, next_shot(), &settings, &[], &Utc)
            .unwrap()
            .is_none());

        let reminder = pending_reminder(fires_at, next_shot(), &settings, &[], &Utc)
            .unwrap()
            .expect("reminder should be due");
        assert_eq!(reminder.date, fires_at);
        assert_eq!(reminder.kind, ReminderKind::Shot);
        assert!(!reminder.read);
        assert_eq!(reminder.message, settings.message);

        let shot_passed = next_shot() + Duration::hours(1);
        assert!(pending_reminder(shot_passed, next_shot(), &settings, &[], &Utc)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_pending_reminder_not_raised_twice() {
        let settings = ReminderConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 5, 9, 12, 0, 0).unwrap();

        let mut first = pending_reminder(now, next_shot(), &settings, &[], &Utc)
            .unwrap()
            .unwrap();
        first.mark_read();
        assert!(first.read);

        let again = pending_reminder(now, next_shot(), &settings, &[first], &Utc).unwrap();
        assert!(again.is_none());
    }
}
