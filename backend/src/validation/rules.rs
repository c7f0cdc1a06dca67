//! Per-row transaction rules.
//!
//! All four rules run on every row so that every reason surfaces together.
//! Reasons are reported in field order: name, amount, date, verified.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use super::headers::HeaderMap;
use crate::models::{CellValue, Field, RawRow, ValidatedRecord};

pub const NAME_REQUIRED: &str = "Name is required";
pub const AMOUNT_INVALID: &str = "Amount must be numeric and greater than zero";
pub const DATE_INVALID: &str = "Date must be valid and within the current month";
pub const VERIFIED_INVALID: &str = "Verified must be Yes or No";

/// Text layouts accepted for date cells stored as text.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

type RuleResult<T> = Result<T, &'static str>;

/// Validate one row against the required fields.
///
/// `reference_date` fixes what "the current month" means for the date rule.
pub fn validate_row(
    row: &RawRow,
    headers: &HeaderMap,
    reference_date: NaiveDate,
) -> Result<ValidatedRecord, Vec<String>> {
    let name = check_name(row.cell(headers.column(Field::Name)));
    let amount = check_amount(row.cell(headers.column(Field::Amount)));
    let date = check_date(row.cell(headers.column(Field::Date)), reference_date);
    let verified = check_verified(row.cell(headers.column(Field::Verified)));

    match (name, amount, date, verified) {
        (Ok(name), Ok(amount), Ok(date), Ok(verified)) => {
            Ok(ValidatedRecord::new(name, amount, date, verified))
        }
        (name, amount, date, verified) => Err([name.err(), amount.err(), date.err(), verified.err()]
            .into_iter()
            .flatten()
            .map(String::from)
            .collect()),
    }
}

/// Names are trimmed; non-text cells are rendered as they display.
pub fn check_name(cell: &CellValue) -> RuleResult<String> {
    let name = match cell {
        CellValue::Empty => return Err(NAME_REQUIRED),
        CellValue::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };

    if name.is_empty() {
        Err(NAME_REQUIRED)
    } else {
        Ok(name)
    }
}

pub fn check_amount(cell: &CellValue) -> RuleResult<f64> {
    let amount = match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(n) if n.is_finite() && n > 0.0 => Ok(n),
        _ => Err(AMOUNT_INVALID),
    }
}

pub fn check_date(cell: &CellValue, reference_date: NaiveDate) -> RuleResult<NaiveDate> {
    let date = match cell {
        CellValue::Date(dt) => Some(dt.date()),
        CellValue::String(s) => parse_date_text(s),
        _ => None,
    };

    match date {
        Some(d) if same_month(d, reference_date) => Ok(d),
        _ => Err(DATE_INVALID),
    }
}

/// Only the exact texts "Yes" and "No" are accepted.
pub fn check_verified(cell: &CellValue) -> RuleResult<bool> {
    match cell.as_text() {
        Some("Yes") => Ok(true),
        Some("No") => Ok(false),
        _ => Err(VERIFIED_INVALID),
    }
}

/// Parse a date written as text. Times and offsets are dropped.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

pub fn same_month(date: NaiveDate, reference: NaiveDate) -> bool {
    date.year() == reference.year() && date.month() == reference.month()
}
