use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use habit_core::store::{
    HabitRecord, HabitStore, Identity, ProgressRecord, StoreError, StoreResult,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    users: BTreeMap<String, UserBucket>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserBucket {
    habits: Vec<HabitRecord>,
    progress: Vec<ProgressRecord>,
}

/// Device-local persistence: one JSON document holding every identity's
/// habits and completion rows, rewritten after each confirmed mutation and
/// read once at startup. A missing file is an empty document; content that
/// fails to parse is reported as corrupt instead of being overwritten.
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> StoreResult<CacheDocument> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|err| StoreError::Corrupt(err.to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(CacheDocument::default()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn write_document(&self, document: &CacheDocument) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(document)
            .map_err(|err| StoreError::Rejected(err.to_string()))?;
        fs::write(&self.path, raw)?;
        Ok(())
    }

    fn mutate(
        &self,
        identity: &Identity,
        apply: impl FnOnce(&mut UserBucket),
    ) -> StoreResult<()> {
        let _held = self.guard.lock();
        let mut document = self.read_document()?;
        let bucket = document
            .users
            .entry(identity.as_str().to_string())
            .or_default();
        apply(bucket);
        self.write_document(&document)?;
        debug!(path = %self.path.display(), identity = %identity, "cache rewritten");
        Ok(())
    }

    fn read_bucket<T>(
        &self,
        identity: &Identity,
        project: impl FnOnce(&UserBucket) -> T,
    ) -> StoreResult<T>
    where
        T: Default,
    {
        let _held = self.guard.lock();
        let document = self.read_document()?;
        Ok(document
            .users
            .get(identity.as_str())
            .map(project)
            .unwrap_or_default())
    }
}

impl HabitStore for JsonFileStore {
    fn load_habits(&self, identity: &Identity) -> StoreResult<Vec<HabitRecord>> {
        self.read_bucket(identity, |bucket| bucket.habits.clone())
    }

    fn load_progress(&self, identity: &Identity) -> StoreResult<Vec<ProgressRecord>> {
        self.read_bucket(identity, |bucket| bucket.progress.clone())
    }

    fn insert_habit(&self, identity: &Identity, name: &str, position: u32) -> StoreResult<()> {
        self.mutate(identity, |bucket| {
            bucket.habits.push(HabitRecord {
                position,
                name: name.to_string(),
            });
        })
    }

    fn delete_habit(&self, identity: &Identity, position: u32) -> StoreResult<()> {
        self.mutate(identity, |bucket| {
            bucket.habits.retain(|record| record.position != position);
        })
    }

    fn reindex_habit(
        &self,
        identity: &Identity,
        old_position: u32,
        new_position: u32,
    ) -> StoreResult<()> {
        self.mutate(identity, |bucket| {
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
        })
    }

    fn upsert_progress(
        &self,
        identity: &Identity,
        date: NaiveDate,
        position: u32,
        completed: bool,
    ) -> StoreResult<()> {
        self.mutate(identity, |bucket| {
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
        })
    }

    fn delete_progress(&self, identity: &Identity, position: u32) -> StoreResult<()> {
        self.mutate(identity, |bucket| {
            bucket.progress.retain(|record| record.position != position);
        })
    }
}
