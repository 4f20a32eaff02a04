use chrono::NaiveDate;
use serde::Serialize;

use crate::error::TrackerResult;
use crate::ledger::ProgressLedger;
use crate::registry::HabitRegistry;
use crate::TrackerError;

pub const DONE_MARK: &str = "DONE";
pub const EMPTY_MARK: &str = "-";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportRow {
    pub date: NaiveDate,
    pub cells: Vec<bool>,
}

/// Date × habit presence grid. Rows are always ascending by date; callers
/// pick the display order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportGrid {
    pub habits: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl ReportGrid {
    /// History-table order: newest date first.
    pub fn rows_newest_first(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().rev()
    }
}

/// Inclusive day-by-day sequence from `from` through `to`. Dates advance
/// by whole calendar days, so month and year boundaries need no special
/// handling, and naive dates cannot drift when recomputed later in the day.
pub fn date_range(from: NaiveDate, to: NaiveDate) -> TrackerResult<Vec<NaiveDate>> {
    if to < from {
        return Err(TrackerError::InvalidRange { from, to });
    }
    let mut dates = Vec::new();
    let mut current = from;
    while current <= to {
        dates.push(current);
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(dates)
}

/// Projects registry and ledger over a date interval. Pure: mutates
/// nothing, reads absent records as not completed, and yields one row per
/// date even when no habits exist.
pub fn generate(
    from: NaiveDate,
    to: NaiveDate,
    registry: &HabitRegistry,
    ledger: &ProgressLedger,
) -> TrackerResult<ReportGrid> {
    let habits = registry.habits();
    let rows = date_range(from, to)?
        .into_iter()
        .map(|date| ReportRow {
            cells: habits
                .iter()
                .map(|habit| ledger.completed(date, habit.id))
                .collect(),
            date,
        })
        .collect();
    Ok(ReportGrid {
        habits: habits.into_iter().map(|habit| habit.name).collect(),
        rows,
    })
}

/// Tabular projection handed to the external document renderer: a header
/// row of "Date" plus habit names, then one row per date, oldest first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn from_grid(grid: &ReportGrid) -> Self {
        let mut header = Vec::with_capacity(grid.habits.len() + 1);
        header.push("Date".to_string());
        header.extend(grid.habits.iter().cloned());

        let rows = grid
            .rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(row.cells.len() + 1);
                cells.push(display_date(row.date));
                cells.extend(row.cells.iter().map(|done| {
                    if *done { DONE_MARK } else { EMPTY_MARK }.to_string()
                }));
                cells
            })
            .collect();

        Self { header, rows }
    }
}

/// Short human form used in the report's date column, e.g. "7 Aug".
pub fn display_date(date: NaiveDate) -> String {
    date.format("%-d %b").to_string()
}

/// External document renderers (PDF, spreadsheet) implement this. The core
/// owns the table shape, never the binary output.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, table: &ReportTable);
}
