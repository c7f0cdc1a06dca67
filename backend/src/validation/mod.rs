//! Transaction validation.
//!
//! - [`headers`] - Column mapper: header row → required field positions
//! - [`rules`] - Row validator: four independent per-field rules
//! - [`schema`] - JSON Schema check of the persisted record shape
//!
//! # Example
//!
//! ```rust,ignore
//! use chrono::NaiveDate;
//! use sheetload::models::{CellValue, RawRow};
//! use sheetload::validation::{map_headers, validate_row, HeaderPolicy};
//!
//! let headers: Vec<CellValue> = ["Name", "Amount", "Date", "Verified"]
//!     .iter()
//!     .map(|h| CellValue::String(h.to_string()))
//!     .collect();
//! let map = map_headers(&headers, HeaderPolicy::Strict).unwrap();
//!
//! let row = RawRow::new(2, vec![
//!     CellValue::String("Alice".into()),
//!     CellValue::String("123.45".into()),
//!     CellValue::String("2026-10-03".into()),
//!     CellValue::String("Yes".into()),
//! ]);
//! let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
//! let record = validate_row(&row, &map, today).unwrap();
//! assert!(record.verified());
//! ```

pub mod headers;
pub mod rules;
pub mod schema;

pub use headers::{map_headers, HeaderMap, HeaderPolicy};
pub use rules::{
    validate_row, AMOUNT_INVALID, DATE_INVALID, NAME_REQUIRED, VERIFIED_INVALID,
};
pub use schema::{validate, validate_record, validate_transaction};
