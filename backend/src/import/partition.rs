//! Partition of per-row validation results.
//!
//! Rows are split into records ready for persistence and row errors ready for
//! display, both in sheet order. A submission is only persisted when it has
//! no error rows at all.

use serde::Serialize;

use crate::models::{RowError, ValidatedRecord};

/// Validation result of one sheet row, keyed by its row number.
pub type RowResult = (u32, Result<ValidatedRecord, Vec<String>>);

/// Valid records and error rows of one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub valid_records: Vec<ValidatedRecord>,
    pub error_rows: Vec<RowError>,
}

impl Partition {
    /// True when nothing blocks persistence.
    pub fn is_clean(&self) -> bool {
        self.error_rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.valid_records.len() + self.error_rows.len()
    }
}

/// Split row results of `sheet` into valid records and error rows.
pub fn partition(sheet: &str, results: impl IntoIterator<Item = RowResult>) -> Partition {
    let mut out = Partition::default();

    for (row, result) in results {
        match result {
            Ok(record) => out.valid_records.push(record),
            Err(errors) => out.error_rows.push(RowError {
                sheet: sheet.to_string(),
                row,
                errors,
            }),
        }
    }

    out
}

/// Row errors of one sheet, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetErrors {
    pub sheet: String,
    pub rows: Vec<RowError>,
}

/// Group row errors by sheet, keeping first-seen sheet order and row order.
pub fn group_by_sheet(errors: &[RowError]) -> Vec<SheetErrors> {
    let mut groups: Vec<SheetErrors> = Vec::new();

    for error in errors {
        match groups.iter_mut().find(|g| g.sheet == error.sheet) {
            Some(group) => group.rows.push(error.clone()),
            None => groups.push(SheetErrors {
                sheet: error.sheet.clone(),
                rows: vec![error.clone()],
            }),
        }
    }

    groups
}
