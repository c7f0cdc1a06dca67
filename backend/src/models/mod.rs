//! Domain models for the Sheetload import pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`CellValue`] - Raw spreadsheet cell, tagged by kind
//! - [`RawRow`] - One data row with its 1-based sheet row number
//! - [`Field`] - The four required transaction columns
//! - [`ValidatedRecord`] - Normalized transaction ready for persistence
//! - [`RowError`] - Validation reasons for one sheet row
//! - [`ImportOutcome`] - Result of a whole import attempt

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Cell Values
// =============================================================================

/// A raw cell value as read from the sheet.
///
/// Validators pattern-match on the tag; no implicit coercion happens at
/// extraction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    /// Text cell.
    String(String),
    /// Numeric cell (integers are widened).
    Number(f64),
    /// Date or date-time cell.
    Date(NaiveDateTime),
    /// Boolean cell.
    Bool(bool),
    /// Blank, missing or error cell.
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text content, only for text cells.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Date(dt) if dt.time() == chrono::NaiveTime::MIN => {
                write!(f, "{}", dt.date().format("%Y-%m-%d"))
            }
            CellValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Empty => Ok(()),
        }
    }
}

/// One data row of a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based sheet row number (the header is row 1).
    pub number: u32,
    /// Cells by absolute column index.
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn new(number: u32, cells: Vec<CellValue>) -> Self {
        Self { number, cells }
    }

    /// Cell at `column`; columns past the end of the row read as empty.
    pub fn cell(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&CellValue::Empty)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

// =============================================================================
// Required Fields
// =============================================================================

/// A required transaction column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    Name,
    Amount,
    Date,
    Verified,
}

impl Field {
    /// All required fields, in reporting order.
    pub const ALL: [Field; 4] = [Field::Name, Field::Amount, Field::Date, Field::Verified];

    /// Exact header text for this field.
    pub fn header(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Amount => "Amount",
            Field::Date => "Date",
            Field::Verified => "Verified",
        }
    }

    /// Match a header cell text exactly (case-sensitive, untrimmed).
    pub fn from_header(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.header() == text)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

// =============================================================================
// Validation Results
// =============================================================================

/// A transaction row that passed every rule.
///
/// Built only by the row validator, so every instance satisfies the rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRecord {
    name: String,
    amount: f64,
    date: NaiveDate,
    verified: bool,
}

impl ValidatedRecord {
    pub(crate) fn new(name: impl Into<String>, amount: f64, date: NaiveDate, verified: bool) -> Self {
        Self {
            name: name.into(),
            amount,
            date,
            verified,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn verified(&self) -> bool {
        self.verified
    }
}

/// Validation failures for a single sheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub sheet: String,
    pub row: u32,
    pub errors: Vec<String>,
}

/// Why an import was refused before any row was validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RejectReason {
    /// The header row does not carry exactly the required columns.
    InvalidHeaders {
        missing: Vec<Field>,
        unexpected: Vec<String>,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InvalidHeaders { .. } => f.write_str("Invalid column headers"),
        }
    }
}

/// Result of one import attempt. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Every row was valid and `count` records were persisted.
    Accepted {
        count: usize,
        records: Vec<ValidatedRecord>,
    },
    /// The file was refused as a whole.
    Rejected(RejectReason),
    /// At least one row failed; nothing was persisted.
    ValidationFailed(Vec<RowError>),
}

impl ImportOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ImportOutcome::Accepted { .. })
    }
}
