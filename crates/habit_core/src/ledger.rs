use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::habit::HabitId;

/// Composite key of one completion record: one habit on one calendar day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntryKey {
    pub date: NaiveDate,
    pub habit: HabitId,
}

/// Sparse date × habit completion table. An absent entry reads as
/// "not completed", not "unknown".
#[derive(Debug, Default, Clone)]
pub struct ProgressLedger {
    entries: BTreeMap<EntryKey, bool>,
}

impl ProgressLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn completed(&self, date: NaiveDate, habit: HabitId) -> bool {
        self.entries
            .get(&EntryKey { date, habit })
            .copied()
            .unwrap_or(false)
    }

    /// Records an explicit completion state. A `false` write is kept as a
    /// record rather than removed; only purges delete entries.
    pub fn set(&mut self, date: NaiveDate, habit: HabitId, done: bool) {
        self.entries.insert(EntryKey { date, habit }, done);
    }

    /// Drops every record of the given habit across all dates. Ids are
    /// stable, so removing a habit never requires rewriting the records
    /// of the habits that survive it.
    pub fn purge_habit(&mut self, habit: HabitId) {
        self.entries.retain(|key, _| key.habit != habit);
    }

    /// Number of habits recorded as completed on `date`.
    pub fn completion_count(&self, date: NaiveDate) -> usize {
        self.day_entries(date).filter(|(_, done)| **done).count()
    }

    /// Completion percentage for `date`, rounded to the nearest integer.
    /// Zero habits means zero percent.
    pub fn progress_percentage(&self, date: NaiveDate, total_habits: usize) -> u8 {
        if total_habits == 0 {
            return 0;
        }
        let completed = self.completion_count(date) as f64;
        ((completed / total_habits as f64) * 100.0).round() as u8
    }

    fn day_entries(&self, date: NaiveDate) -> impl Iterator<Item = (&EntryKey, &bool)> {
        let start = EntryKey {
            date,
            habit: HabitId::MIN,
        };
        let end = EntryKey {
            date,
            habit: HabitId::MAX,
        };
        self.entries.range(start..=end)
    }
}
