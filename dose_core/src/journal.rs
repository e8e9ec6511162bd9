//! The dose journal: record keeping on top of a collection store.
//!
//! The journal owns the load-modify-save cycle for each collection and fills
//! in defaults for new records from the user's settings. Derived values are
//! always recomputed from the stored records by the engine.

use crate::config::Config;
use crate::engine::{self, NextDoseStatus, TimelinePoint, WeightTrend};
use crate::store::{Collection, CollectionStore};
use crate::{
    Error, InjectionEvent, NewInjection, NewObservation, Reminder, Result, WellnessObservation,
};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Everything the summary screen needs, computed from one snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub injection_count: usize,
    pub observation_count: usize,
    pub streak: u32,
    pub next_injection: DateTime<Utc>,
    pub status: NextDoseStatus,
    pub weight_trend: WeightTrend,
    pub timeline: Vec<TimelinePoint>,
}

/// Record-keeping service over a [`CollectionStore`]
#[derive(Debug)]
pub struct Journal<S: CollectionStore> {
    store: S,
    config: Config,
}

impl<S: CollectionStore> Journal<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Injections
    // ------------------------------------------------------------------

    pub fn injections(&self) -> Result<Vec<InjectionEvent>> {
        self.store.load(Collection::Shots)
    }

    /// Log a new injection, filling gaps from settings
    ///
    /// The sequence number continues from the highest one stored.
    pub fn add_injection(&mut self, new: NewInjection, now: DateTime<Utc>) -> Result<InjectionEvent> {
        let mut shots = self.injections()?;
        let medication = &self.config.medication;

        let dose_mg = new.dose_mg.unwrap_or(medication.default_dose_mg);
        check_dose(dose_mg)?;

        let shot = InjectionEvent {
            id: Uuid::new_v4(),
            timestamp: new.timestamp.unwrap_or(now),
            medication: new.medication.unwrap_or_else(|| medication.name.clone()),
            dose_mg,
            site: new.site.or_else(|| medication.default_site.clone()),
            notes: new.notes.filter(|n| !n.trim().is_empty()),
            side_effects: new.side_effects,
            sequence_number: Some(engine::next_sequence_number(&shots)),
        };

        shots.push(shot.clone());
        self.store.save(Collection::Shots, &shots)?;

        tracing::info!(
            "Logged shot #{} ({} {}mg) at {}",
            shot.sequence_number.unwrap_or_default(),
            shot.medication,
            shot.dose_mg,
            shot.timestamp
        );
        Ok(shot)
    }

    /// Replace an existing injection with the same id
    pub fn update_injection(&mut self, updated: InjectionEvent) -> Result<()> {
        check_dose(updated.dose_mg)?;
        let mut shots = self.injections()?;
        let id = updated.id;
        let slot = shots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(Error::NotFound(id))?;
        *slot = updated;

        self.store.save(Collection::Shots, &shots)?;
        tracing::info!("Updated shot {}", id);
        Ok(())
    }

    pub fn delete_injection(&mut self, id: Uuid) -> Result<InjectionEvent> {
        let mut shots = self.injections()?;
        let index = shots
            .iter()
            .position(|s| s.id == id)
            .ok_or(Error::NotFound(id))?;
        let removed = shots.remove(index);

        self.store.save(Collection::Shots, &shots)?;
        tracing::info!("Deleted shot {}", id);
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Wellness observations
    // ------------------------------------------------------------------

    pub fn observations(&self) -> Result<Vec<WellnessObservation>> {
        self.store.load(Collection::Wellness)
    }

    pub fn add_observation(
        &mut self,
        new: NewObservation,
        now: DateTime<Utc>,
    ) -> Result<WellnessObservation> {
        let observation = WellnessObservation {
            id: Uuid::new_v4(),
            timestamp: new.timestamp.unwrap_or(now),
            weight: new.weight,
            protein_grams: new.protein_grams,
            water_ounces: new.water_ounces,
            calories: new.calories,
            notes: new.notes.filter(|n| !n.trim().is_empty()),
            custom_metrics: new.custom_metrics,
        };

        check_observation(&observation)?;

        let mut all = self.observations()?;
        all.push(observation.clone());
        self.store.save(Collection::Wellness, &all)?;

        tracing::info!("Recorded wellness observation at {}", observation.timestamp);
        Ok(observation)
    }

    pub fn update_observation(&mut self, updated: WellnessObservation) -> Result<()> {
        check_observation(&updated)?;
        let mut all = self.observations()?;
        let id = updated.id;
        let slot = all
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(Error::NotFound(id))?;
        *slot = updated;

        self.store.save(Collection::Wellness, &all)?;
        tracing::info!("Updated wellness observation {}", id);
        Ok(())
    }

    pub fn delete_observation(&mut self, id: Uuid) -> Result<WellnessObservation> {
        let mut all = self.observations()?;
        let index = all
            .iter()
            .position(|o| o.id == id)
            .ok_or(Error::NotFound(id))?;
        let removed = all.remove(index);

        self.store.save(Collection::Wellness, &all)?;
        tracing::info!("Deleted wellness observation {}", id);
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Reminders
    // ------------------------------------------------------------------

    pub fn reminders(&self) -> Result<Vec<Reminder>> {
        self.store.load(Collection::Reminders)
    }

    pub fn record_reminder(&mut self, reminder: Reminder) -> Result<()> {
        let mut all = self.reminders()?;
        all.push(reminder);
        self.store.save(Collection::Reminders, &all)
    }

    pub fn mark_reminder_read(&mut self, id: Uuid) -> Result<()> {
        let mut all = self.reminders()?;
        all.iter_mut()
            .find(|r| r.id == id)
            .ok_or(Error::NotFound(id))?
            .mark_read();
        self.store.save(Collection::Reminders, &all)
    }

    /// Check whether a shot reminder is due at `now` and record it if so
    pub fn check_reminder<Tz: TimeZone>(
        &mut self,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<Option<Reminder>> {
        let shots = self.injections()?;
        if shots.is_empty() {
            return Ok(None);
        }

        let next = engine::next_injection_date(&shots, now);
        let existing = self.reminders()?;
        let pending =
            crate::reminder::pending_reminder(now, next, &self.config.reminders, &existing, tz)?;

        if let Some(ref reminder) = pending {
            self.record_reminder(reminder.clone())?;
        }
        Ok(pending)
    }

    // ------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------

    pub fn snapshot<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> Result<Snapshot> {
        let shots = self.injections()?;
        let observations = self.observations()?;

        Ok(Snapshot {
            injection_count: shots.len(),
            observation_count: observations.len(),
            streak: engine::adherence_streak(&shots),
            next_injection: engine::next_injection_date(&shots, now),
            status: engine::next_dose_status(&shots, now, tz),
            weight_trend: engine::weight_change(&observations),
            timeline: engine::merge_timeline(&shots, &observations),
        })
    }

    /// Delete every stored shot, observation and reminder
    pub fn clear_all(&mut self) -> Result<()> {
        for collection in Collection::ALL {
            self.store.clear(collection)?;
        }
        tracing::info!("Cleared all journal data");
        Ok(())
    }
}

fn check_dose(dose_mg: f64) -> Result<()> {
    if !dose_mg.is_finite() || dose_mg <= 0.0 {
        return Err(Error::Other(format!("Dose must be positive, got {}", dose_mg)));
    }
    Ok(())
}

/// Reject values JSON can't hold (NaN, infinities) and empty records
fn check_observation(observation: &WellnessObservation) -> Result<()> {
    let fixed = [
        ("weight", observation.weight),
        ("protein", observation.protein_grams),
        ("water", observation.water_ounces),
        ("calories", observation.calories),
    ];
    let custom = observation
        .custom_metrics
        .iter()
        .filter_map(|(name, value)| value.as_number().map(|n| (name.as_str(), Some(n))));

    for (name, value) in fixed.into_iter().chain(custom) {
        if let Some(value) = value {
            if !value.is_finite() {
                return Err(Error::Other(format!(
                    "{} must be a finite number, got {}",
                    name, value
                )));
            }
        }
    }

    if observation.is_empty() {
        return Err(Error::Other("Nothing to record".into()));
    }
    Ok(())
}
