use serde::{Deserialize, Serialize};

use crate::error::TrackerResult;
use crate::TrackerError;

/// Stable in-session identity of a habit. Display positions are derived
/// from registry order, so ids survive the removal of earlier habits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HabitId(pub(crate) u64);

impl HabitId {
    pub(crate) const MIN: HabitId = HabitId(u64::MIN);
    pub(crate) const MAX: HabitId = HabitId(u64::MAX);
}

/// Read model handed to callers: the habit together with its current slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: HabitId,
    pub position: u32,
    pub name: String,
}

/// Trims a proposed habit name, rejecting names that trim to nothing.
/// Runs before any persistence call or in-memory mutation.
pub fn normalize_name(input: &str) -> TrackerResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::EmptyName);
    }
    Ok(trimmed.to_string())
}
