use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authenticated scope for persisted data. Session issuance belongs to the
/// shell; the core only keys storage by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Habit row as the store keeps it: positional key plus name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitRecord {
    pub position: u32,
    pub name: String,
}

/// Completion row as the store keeps it. The conflict key is
/// `(identity, date, position)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressRecord {
    pub date: NaiveDate,
    pub position: u32,
    pub completed: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
    #[error("storage did not answer within {0:?}")]
    Timeout(Duration),
    #[error("storage rejected the write: {0}")]
    Rejected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence collaborator. Implementations must answer within a bounded
/// time (`Timeout` rather than a hang) and must not reorder the calls a
/// single caller issues. The store is passive: it never renumbers on its
/// own, it only applies the exact writes it is handed.
pub trait HabitStore: Send + Sync {
    fn load_habits(&self, identity: &Identity) -> StoreResult<Vec<HabitRecord>>;
    fn load_progress(&self, identity: &Identity) -> StoreResult<Vec<ProgressRecord>>;
    fn insert_habit(&self, identity: &Identity, name: &str, position: u32) -> StoreResult<()>;
    fn delete_habit(&self, identity: &Identity, position: u32) -> StoreResult<()>;
    fn reindex_habit(
        &self,
        identity: &Identity,
        old_position: u32,
        new_position: u32,
    ) -> StoreResult<()>;
    fn upsert_progress(
        &self,
        identity: &Identity,
        date: NaiveDate,
        position: u32,
        completed: bool,
    ) -> StoreResult<()>;
    /// Bulk delete: every completion row at `position`, across all dates.
    fn delete_progress(&self, identity: &Identity, position: u32) -> StoreResult<()>;
}

#[derive(Debug, Default, Clone)]
struct UserBucket {
    habits: Vec<HabitRecord>,
    progress: Vec<ProgressRecord>,
}

/// In-process store. The default backend when the shell supplies nothing
/// else, and the substrate test doubles wrap.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, UserBucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_bucket<T>(&self, identity: &Identity, apply: impl FnOnce(&mut UserBucket) -> T) -> T {
        let mut users = self.users.lock();
        apply(users.entry(identity.as_str().to_string()).or_default())
    }
}

impl HabitStore for MemoryStore {
    fn load_habits(&self, identity: &Identity) -> StoreResult<Vec<HabitRecord>> {
        Ok(self.with_bucket(identity, |bucket| bucket.habits.clone()))
    }

    fn load_progress(&self, identity: &Identity) -> StoreResult<Vec<ProgressRecord>> {
        Ok(self.with_bucket(identity, |bucket| bucket.progress.clone()))
    }

    fn insert_habit(&self, identity: &Identity, name: &str, position: u32) -> StoreResult<()> {
        self.with_bucket(identity, |bucket| {
            bucket.habits.push(HabitRecord {
                position,
                name: name.to_string(),
            });
        });
        Ok(())
    }

    fn delete_habit(&self, identity: &Identity, position: u32) -> StoreResult<()> {
        self.with_bucket(identity, |bucket| {
            bucket.habits.retain(|record| record.position != position);
        });
        Ok(())
    }

    fn reindex_habit(
        &self,
        identity: &Identity,
        old_position: u32,
        new_position: u32,
    ) -> StoreResult<()> {
        self.with_bucket(identity, |bucket| {
            for record in &mut bucket.habits {
                if record.position == old_position {
                    record.position = new_position;
                }
            }
            for record in &mut bucket.progress {
                if record.position == old_position {
                    record.position = new_position;
                }
            }
        });
        Ok(())
    }

    fn upsert_progress(
        &self,
        identity: &Identity,
        date: NaiveDate,
        position: u32,
        completed: bool,
    ) -> StoreResult<()> {
        self.with_bucket(identity, |bucket| {
            match bucket
                .progress
                .iter_mut()
                .find(|record| record.date == date && record.position == position)
            {
                Some(record) => record.completed = completed,
                None => bucket.progress.push(ProgressRecord {
                    date,
                    position,
                    completed,
                }),
            }
        });
        Ok(())
    }

    fn delete_progress(&self, identity: &Identity, position: u32) -> StoreResult<()> {
        self.with_bucket(identity, |bucket| {
            bucket.progress.retain(|record| record.position != position);
        });
        Ok(())
    }
}
