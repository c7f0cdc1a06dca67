//! Column mapping: header row → required field positions.
//!
//! The header row is scanned once. Every text cell equal to a required field
//! name records its column index; a repeated name overwrites the earlier
//! index. The import is refused unless all four fields were found.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{CellValue, Field, RejectReason};

/// How header cells that are not required fields are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderPolicy {
    /// Any non-empty unknown header cell refuses the import.
    #[default]
    Strict,
    /// Unknown columns are ignored.
    AllowExtra,
}

/// Column index of every required field. Always complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    columns: BTreeMap<Field, usize>,
}

impl HeaderMap {
    /// Column index of `field`.
    pub fn column(&self, field: Field) -> usize {
        // Construction guarantees every field is present.
        self.columns[&field]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        self.columns.iter().map(|(f, c)| (*f, *c))
    }
}

/// Map the header row, or refuse the whole import.
///
/// # Example
/// ```ignore
/// use sheetload::models::{CellValue, Field};
/// use sheetload::validation::{map_headers, HeaderPolicy};
///
/// let headers: Vec<CellValue> = ["Verified", "Date", "Amount", "Name"]
///     .iter()
///     .map(|h| CellValue::String(h.to_string()))
///     .collect();
/// let map = map_headers(&headers, HeaderPolicy::Strict).unwrap();
/// assert_eq!(map.column(Field::Name), 3);
/// ```
pub fn map_headers(headers: &[CellValue], policy: HeaderPolicy) -> Result<HeaderMap, RejectReason> {
    let mut columns = BTreeMap::new();
    let mut unexpected = Vec::new();

    for (index, cell) in headers.iter().enumerate() {
        match cell.as_text().and_then(Field::from_header) {
            Some(field) => {
                columns.insert(field, index);
            }
            None if !cell.is_empty() => unexpected.push(cell.to_string()),
            None => {}
        }
    }

    let missing: Vec<Field> = Field::ALL
        .into_iter()
        .filter(|f| !columns.contains_key(f))
        .collect();

    if policy == HeaderPolicy::AllowExtra {
        unexpected.clear();
    }

    if missing.is_empty() && unexpected.is_empty() {
        Ok(HeaderMap { columns })
    } else {
        Err(RejectReason::InvalidHeaders { missing, unexpected })
    }
}
