use std::collections::HashMap;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::TrackerResult;
use crate::habit::{self, Habit, HabitId};
use crate::ledger::ProgressLedger;
use crate::registry::HabitRegistry;
use crate::report::{self, ReportGrid, ReportTable};
use crate::store::{HabitStore, Identity, MemoryStore};
use crate::TrackerError;

/// One habit's state on a given day, in display order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitStatus {
    pub position: u32,
    pub name: String,
    pub completed: bool,
}

/// Everything the daily view needs: the checklist plus the stat cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySnapshot {
    pub date: NaiveDate,
    pub habits: Vec<HabitStatus>,
    pub completed: usize,
    pub percentage: u8,
}

#[derive(Default)]
struct TrackerState {
    registry: HabitRegistry,
    ledger: ProgressLedger,
}

/// Owns one user's registry and ledger and keeps them consistent with the
/// store. Mutations follow a write-ahead discipline: the store confirms
/// first, memory changes second, so the screen never shows state the store
/// does not hold. Registry and ledger live behind a single lock; a reader
/// can never observe one renumbered without the other.
pub struct HabitService {
    identity: Identity,
    store: Box<dyn HabitStore>,
    state: RwLock<TrackerState>,
}

pub struct HabitServiceBuilder {
    identity: Identity,
    store: Option<Box<dyn HabitStore>>,
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self {
            identity: Identity::new("local"),
            store: None,
        }
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Identity::new(identity);
        self
    }

    pub fn with_store(mut self, store: Box<dyn HabitStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> TrackerResult<HabitService> {
        let service = HabitService {
            identity: self.identity,
            store: self.store.unwrap_or_else(|| Box::new(MemoryStore::new())),
            state: RwLock::new(TrackerState::default()),
        };
        service.reload()?;
        Ok(service)
    }
}

impl Default for HabitServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Rebuilds in-memory state from the store. Called once on startup and
    /// again whenever a partial renumbering left memory untrustworthy.
    pub fn reload(&self) -> TrackerResult<()> {
        let mut stored = self.store.load_habits(&self.identity)?;
        stored.sort_by_key(|record| record.position);

        let mut registry = HabitRegistry::new();
        let mut id_by_position: HashMap<u32, HabitId> = HashMap::new();
        let mut compacted = false;
        for (index, record) in stored.iter().enumerate() {
            if record.position as usize != index {
                compacted = true;
            }
            let pushed = registry.push(record.name.clone());
            id_by_position.insert(record.position, pushed.id);
        }
        if compacted {
            warn!(identity = %self.identity, "stored habit positions are not contiguous; compacting");
        }

        let mut ledger = ProgressLedger::new();
        let mut dropped = 0usize;
        for record in self.store.load_progress(&self.identity)? {
            match id_by_position.get(&record.position) {
                Some(id) => ledger.set(record.date, *id, record.completed),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(
                identity = %self.identity,
                dropped,
                "dropped completion records pointing at unknown positions"
            );
        }

        let mut state = self.state.write();
        debug!(
            identity = %self.identity,
            habits = registry.len(),
            records = ledger.len(),
            "hydrated tracker state"
        );
        state.registry = registry;
        state.ledger = ledger;
        Ok(())
    }

    /// Validates, persists, then appends the habit at the next position.
    #[instrument(skip(self))]
    pub fn add_habit(&self, name: &str) -> TrackerResult<Habit> {
        let name = habit::normalize_name(name)?;
        let mut state = self.state.write();
        let position = state.registry.len() as u32;
        self.store.insert_habit(&self.identity, &name, position)?;
        let added = state.registry.push(name);
        debug!(identity = %self.identity, position = added.position, "habit added");
        Ok(added)
    }

    /// Removes the habit at `position` and renumbers everything after it.
    ///
    /// The store sees a fixed sequence: delete the habit row, purge its
    /// completion rows, then shift each greater position down by one in
    /// ascending order. A failure on the first step leaves the store
    /// untouched and is reported as a plain store error. A failure after
    /// the first step aborts the remaining steps and surfaces
    /// `Inconsistent`; the caller must `reload` before trusting reads
    /// again. Memory is only updated after the whole sequence succeeds.
    #[instrument(skip(self))]
    pub fn remove_habit(&self, position: u32) -> TrackerResult<()> {
        let mut state = self.state.write();
        let count = state.registry.len() as u32;
        if position >= count {
            return Err(TrackerError::UnknownPosition(position));
        }

        self.store.delete_habit(&self.identity, position)?;

        if let Err(err) = self.store.delete_progress(&self.identity, position) {
            warn!(identity = %self.identity, position, %err, "completion purge failed after habit delete");
            return Err(TrackerError::Inconsistent {
                applied: format!("habit {position} deleted, completion purge failed"),
            });
        }
        for old in (position + 1)..count {
            if let Err(err) = self.store.reindex_habit(&self.identity, old, old - 1) {
                warn!(identity = %self.identity, old, %err, "reindex failed mid-renumbering");
                return Err(TrackerError::Inconsistent {
                    applied: format!("renumbering stopped at position {old}"),
                });
            }
        }

        let removed = state.registry.remove(position)?;
        state.ledger.purge_habit(removed.id);
        debug!(identity = %self.identity, position, name = %removed.name, "habit removed");
        Ok(())
    }

    /// Records an explicit completion state for one habit on one date and
    /// returns it. Retrying the same call is harmless; the target state is
    /// in the request, not derived from whatever happens to be stored.
    #[instrument(skip(self))]
    pub fn set_completion(
        &self,
        date: NaiveDate,
        position: u32,
        completed: bool,
    ) -> TrackerResult<bool> {
        let mut state = self.state.write();
        let id = state
            .registry
            .id_at(position)
            .ok_or(TrackerError::UnknownPosition(position))?;
        self.store
            .upsert_progress(&self.identity, date, position, completed)?;
        state.ledger.set(date, id, completed);
        Ok(completed)
    }

    /// Flips one habit's state for a date as a single confirmed
    /// transition: the target is resolved up front and then written
    /// explicitly, never as a blind invert in the store.
    pub fn toggle(&self, date: NaiveDate, position: u32) -> TrackerResult<bool> {
        let target = {
            let state = self.state.read();
            let id = state
                .registry
                .id_at(position)
                .ok_or(TrackerError::UnknownPosition(position))?;
            !state.ledger.completed(date, id)
        };
        self.set_completion(date, position, target)
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.state.read().registry.habits()
    }

    pub fn habit_count(&self) -> usize {
        self.state.read().registry.len()
    }

    pub fn completed(&self, date: NaiveDate, position: u32) -> TrackerResult<bool> {
        let state = self.state.read();
        let id = state
            .registry
            .id_at(position)
            .ok_or(TrackerError::UnknownPosition(position))?;
        Ok(state.ledger.completed(date, id))
    }

    pub fn completion_count(&self, date: NaiveDate) -> usize {
        self.state.read().ledger.completion_count(date)
    }

    pub fn progress_percentage(&self, date: NaiveDate) -> u8 {
        let state = self.state.read();
        state
            .ledger
            .progress_percentage(date, state.registry.len())
    }

    /// Checklist plus stat-card numbers for one day.
    pub fn day_snapshot(&self, date: NaiveDate) -> DaySnapshot {
        let state = self.state.read();
        let habits: Vec<HabitStatus> = state
            .registry
            .habits()
            .into_iter()
            .map(|habit| HabitStatus {
                completed: state.ledger.completed(date, habit.id),
                position: habit.position,
                name: habit.name,
            })
            .collect();
        let completed = habits.iter().filter(|status| status.completed).count();
        DaySnapshot {
            date,
            percentage: state.ledger.progress_percentage(date, habits.len()),
            completed,
            habits,
        }
    }

    /// Date × habit grid over an inclusive interval, ascending by date.
    pub fn report(&self, from: NaiveDate, to: NaiveDate) -> TrackerResult<ReportGrid> {
        let state = self.state.read();
        report::generate(from, to, &state.registry, &state.ledger)
    }

    /// Export projection for the external document renderer.
    pub fn export_table(&self, from: NaiveDate, to: NaiveDate) -> TrackerResult<ReportTable> {
        Ok(ReportTable::from_grid(&self.report(from, to)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, n).unwrap()
    }

    fn service() -> HabitService {
        HabitService::builder().identity("tester").build().unwrap()
    }

    #[test]
    fn build_starts_empty_with_memory_store() {
        let service = service();
        assert!(service.habits().is_empty());
        assert_eq!(service.progress_percentage(day(1)), 0);
    }

    #[test]
    fn add_rejects_blank_names_before_any_write() {
        let service = service();
        assert!(matches!(
            service.add_habit("   "),
            Err(TrackerError::EmptyName)
        ));
        assert!(service.habits().is_empty());
    }

    #[test]
    fn toggle_on_unknown_position_is_rejected() {
        let service = service();
        service.add_habit("Exercise").unwrap();
        assert!(matches!(
            service.toggle(day(1), 3),
            Err(TrackerError::UnknownPosition(3))
        ));
    }

    #[test]
    fn set_completion_is_idempotent_for_the_same_target() {
        let service = service();
        service.add_habit("Exercise").unwrap();
        assert!(service.set_completion(day(1), 0, true).unwrap());
        assert!(service.set_completion(day(1), 0, true).unwrap());
        assert!(service.completed(day(1), 0).unwrap());
        assert_eq!(service.completion_count(day(1)), 1);
    }

    #[test]
    fn day_snapshot_matches_stats() {
        let service = service();
        service.add_habit("Exercise").unwrap();
        service.add_habit("Read").unwrap();
        service.toggle(day(1), 0).unwrap();

        let snapshot = service.day_snapshot(day(1));
        assert_eq!(snapshot.completed, 1);
        assert_eq!(snapshot.percentage, 50);
        assert_eq!(snapshot.habits.len(), 2);
        assert!(snapshot.habits[0].completed);
        assert!(!snapshot.habits[1].completed);
    }

    #[test]
    fn export_table_round_trips_through_report() {
        let service = service();
        service.add_habit("Exercise").unwrap();
        service.set_completion(day(1), 0, true).unwrap();
        let table = service.export_table(day(1), day(1)).unwrap();
        assert_eq!(table.header, vec!["Date", "Exercise"]);
        assert_eq!(table.rows, vec![vec!["1 Nov", "DONE"]]);
    }
}
