use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("habit name cannot be empty")]
    EmptyName,
    #[error("invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },
    #[error("no habit at position {0}")]
    UnknownPosition(u32),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("store left partially renumbered ({applied}); reload required")]
    Inconsistent { applied: String },
}

pub type TrackerResult<T> = Result<T, TrackerError>;
