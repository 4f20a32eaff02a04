use serde::{Deserialize, Serialize};

use crate::error::TrackerResult;
use crate::habit::{Habit, HabitId};
use crate::TrackerError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct RegistryEntry {
    id: HabitId,
    name: String,
}

/// Ordered collection of habits. A habit's position is its index in the
/// backing vector, so valid positions are always exactly `[0, len)` with
/// no gaps or duplicates.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HabitRegistry {
    entries: Vec<RegistryEntry>,
    next_id: u64,
}

impl HabitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a habit at position `len`, assigning it a fresh id.
    /// The name must already be validated.
    pub fn push(&mut self, name: String) -> Habit {
        let id = HabitId(self.next_id);
        self.next_id += 1;
        self.entries.push(RegistryEntry {
            id,
            name: name.clone(),
        });
        Habit {
            id,
            position: (self.entries.len() - 1) as u32,
            name,
        }
    }

    /// Removes the habit at `position`. Every habit after it slides down
    /// one slot; ids are untouched.
    pub fn remove(&mut self, position: u32) -> TrackerResult<Habit> {
        if position as usize >= self.entries.len() {
            return Err(TrackerError::UnknownPosition(position));
        }
        let entry = self.entries.remove(position as usize);
        Ok(Habit {
            id: entry.id,
            position,
            name: entry.name,
        })
    }

    /// Current habits in position order.
    pub fn habits(&self) -> Vec<Habit> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Habit {
                id: entry.id,
                position: index as u32,
                name: entry.name.clone(),
            })
            .collect()
    }

    pub fn id_at(&self, position: u32) -> Option<HabitId> {
        self.entries.get(position as usize).map(|entry| entry.id)
    }

    pub fn name_at(&self, position: u32) -> Option<&str> {
        self.entries
            .get(position as usize)
            .map(|entry| entry.name.as_str())
    }

    pub fn position_of(&self, id: HabitId) -> Option<u32> {
        self.entries
            .iter()
            .position(|entry| entry.id == id)
            .map(|index| index as u32)
    }
}
