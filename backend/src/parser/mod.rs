//! Cell extraction from uploaded spreadsheets.
//!
//! Workbooks (xlsx, xlsm, xlsb, xls, ods) are read with calamine from memory.
//! Plain text under a csv/tsv/txt name (or no name) is read as delimited text,
//! with encoding and delimiter auto-detection. Anything else is malformed.
//! No validation here: cells come out tagged, as stored.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Cursor;
use std::path::Path;

use crate::error::{ExtractError, ExtractResult};
use crate::models::{CellValue, RawRow};

#[cfg(test)]
pub(crate) mod fixtures;

/// Sheet name used for delimited files without a file name.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "xla", "ods"];
const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Bytes inspected when deciding whether a payload is text.
const TEXT_SNIFF_LEN: usize = 8 * 1024;

/// Which sheet of a workbook to read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SheetSelector {
    #[default]
    First,
    Named(String),
    /// 0-based position in workbook order.
    Index(usize),
}

impl SheetSelector {
    /// `None` or a blank name selects the first sheet.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(n) if !n.is_empty() => SheetSelector::Named(n.to_string()),
            _ => SheetSelector::First,
        }
    }
}

/// Container format of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Binary or zipped workbook.
    Workbook,
    /// Delimited text (CSV, TSV, ...).
    Delimited,
}

impl SourceFormat {
    /// Detect the format from magic bytes, then from the file extension.
    ///
    /// Returns `None` for payloads that are neither a workbook nor plain
    /// text under a delimited-text extension (or no file name at all).
    pub fn detect(bytes: &[u8], file_name: Option<&str>) -> Option<Self> {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
            return Some(SourceFormat::Workbook);
        }

        let extension = file_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some(ext) if WORKBOOK_EXTENSIONS.contains(&ext) => Some(SourceFormat::Workbook),
            Some(ext) if !DELIMITED_EXTENSIONS.contains(&ext) => None,
            _ if looks_like_text(bytes) => Some(SourceFormat::Delimited),
            _ => None,
        }
    }
}

/// True when the start of `bytes` has no control characters besides
/// whitespace. Binary formats (images, PDFs, archives) fail quickly.
fn looks_like_text(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .take(TEXT_SNIFF_LEN)
        .all(|&b| b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x0c))
}

fn detect_format(bytes: &[u8], file_name: Option<&str>) -> ExtractResult<SourceFormat> {
    SourceFormat::detect(bytes, file_name).ok_or_else(|| {
        ExtractError::MalformedFile(format!(
            "{} is neither a workbook nor delimited text",
            file_name.unwrap_or("upload")
        ))
    })
}

/// One sheet split into its header row and data rows.
#[derive(Debug, Clone)]
pub struct ExtractedSheet {
    /// Sheet name, used when reporting row errors
    pub sheet: String,
    /// Cells of sheet row 1
    pub headers: Vec<CellValue>,
    /// Non-blank rows 2..N in sheet order
    pub rows: Vec<RawRow>,
    /// Detected container format
    pub format: SourceFormat,
    /// Detected text encoding (delimited files only)
    pub encoding: Option<String>,
    /// Detected delimiter (delimited files only)
    pub delimiter: Option<char>,
}

/// Read the selected sheet of an in-memory upload.
///
/// # Example
/// ```ignore
/// use sheetload::parser::{extract_sheet, SheetSelector};
///
/// let sheet = extract_sheet(b"Name;Amount\nAlice;10", None, &SheetSelector::First)?;
/// assert_eq!(sheet.rows.len(), 1);
/// assert_eq!(sheet.rows[0].number, 2);
/// ```
pub fn extract_sheet(
    bytes: &[u8],
    file_name: Option<&str>,
    selector: &SheetSelector,
) -> ExtractResult<ExtractedSheet> {
    match detect_format(bytes, file_name)? {
        SourceFormat::Workbook => read_workbook_sheet(bytes, selector),
        SourceFormat::Delimited => read_delimited(bytes, file_name, selector),
    }
}

/// Read the selected sheet of a file on disk.
pub fn extract_sheet_file<P: AsRef<Path>>(
    path: P,
    selector: &SheetSelector,
) -> ExtractResult<ExtractedSheet> {
    let bytes = std::fs::read(path.as_ref())?;
    let file_name = path.as_ref().file_name().and_then(|n| n.to_str());
    extract_sheet(&bytes, file_name, selector)
}

/// List the sheet names of an upload, in workbook order.
pub fn sheet_names(bytes: &[u8], file_name: Option<&str>) -> ExtractResult<Vec<String>> {
    match detect_format(bytes, file_name)? {
        SourceFormat::Workbook => Ok(open_workbook(bytes)?.sheet_names()),
        SourceFormat::Delimited => Ok(vec![delimited_sheet_name(file_name)]),
    }
}

// =============================================================================
// Workbooks
// =============================================================================

fn open_workbook(bytes: &[u8]) -> ExtractResult<Sheets<Cursor<Vec<u8>>>> {
    open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ExtractError::MalformedFile(e.to_string()))
}

fn read_workbook_sheet(bytes: &[u8], selector: &SheetSelector) -> ExtractResult<ExtractedSheet> {
    let mut workbook = open_workbook(bytes)?;
    let names = workbook.sheet_names();

    let sheet = match selector {
        SheetSelector::First => names
            .first()
            .cloned()
            .ok_or_else(|| ExtractError::SheetNotFound("workbook has no sheets".to_string()))?,
        SheetSelector::Named(name) if names.contains(name) => name.clone(),
        SheetSelector::Named(name) => return Err(ExtractError::SheetNotFound(name.clone())),
        SheetSelector::Index(i) => names
            .get(*i)
            .cloned()
            .ok_or_else(|| ExtractError::SheetNotFound(format!("#{}", i)))?,
    };

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ExtractError::MalformedFile(format!("cannot read sheet '{}': {}", sheet, e)))?;

    let (headers, rows) = split_header(rows_from_range(&range));

    Ok(ExtractedSheet {
        sheet,
        headers,
        rows,
        format: SourceFormat::Workbook,
        encoding: None,
        delimiter: None,
    })
}

/// Convert a used range into rows with absolute positions.
///
/// A range that does not start at A1 is padded so that column indexes and
/// row numbers match what the user sees in the sheet.
fn rows_from_range(range: &Range<Data>) -> Vec<RawRow> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    range
        .rows()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = vec![CellValue::Empty; start_col as usize];
            cells.extend(row.iter().map(cell_from_data));
            RawRow::new(start_row + i as u32 + 1, cells)
        })
        .collect()
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt.as_datetime().map(CellValue::Date).unwrap_or(CellValue::Empty),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::String(s.clone())),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Row 1 is the header; blank data rows are dropped.
fn split_header(rows: Vec<RawRow>) -> (Vec<CellValue>, Vec<RawRow>) {
    let mut headers = Vec::new();
    let mut data = Vec::new();

    for row in rows {
        if row.number == 1 {
            headers = row.cells;
        } else if !row.is_blank() {
            data.push(row);
        }
    }

    (headers, data)
}

// =============================================================================
// Delimited text
// =============================================================================

fn delimited_sheet_name(file_name: Option<&str>) -> String {
    file_name
        .and_then(|n| Path::new(n).file_stem())
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SHEET_NAME)
        .to_string()
}

fn read_delimited(
    bytes: &[u8],
    file_name: Option<&str>,
    selector: &SheetSelector,
) -> ExtractResult<ExtractedSheet> {
    let sheet = delimited_sheet_name(file_name);
    match selector {
        SheetSelector::Named(name) if *name != sheet => {
            return Err(ExtractError::SheetNotFound(name.clone()));
        }
        SheetSelector::Index(i) if *i != 0 => {
            return Err(ExtractError::SheetNotFound(format!("#{}", i)));
        }
        _ => {}
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let content = content.trim_start_matches('\u{feff}');
    let delimiter = detect_delimiter(content);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    // The reader skips empty lines; they still occupy a sheet row, so they
    // are counted from the input right after each record.
    let source = content.as_bytes();
    let mut number = blank_lines_at(source, 0);
    let mut record = csv::StringRecord::new();
    let mut rows = Vec::new();

    loop {
        let more = reader.read_record(&mut record).map_err(|e| {
            ExtractError::MalformedFile(format!("record {}: {}", rows.len() + 1, e))
        })?;
        if !more {
            break;
        }
        number += 1;

        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::String(field.to_string())
                }
            })
            .collect();

        rows.push(RawRow::new(number, cells));

        number += blank_lines_at(source, reader.position().byte() as usize);
    }

    let (headers, rows) = split_header(rows);

    Ok(ExtractedSheet {
        sheet,
        headers,
        rows,
        format: SourceFormat::Delimited,
        encoding: Some(encoding),
        delimiter: Some(delimiter),
    })
}

/// Number of empty lines starting at byte `offset`.
///
/// CR, LF and CRLF each end one line. A CRLF whose CR closed the previous
/// record is not counted again.
fn blank_lines_at(source: &[u8], offset: usize) -> u32 {
    let mut i = offset;
    if i > 0 && source.get(i - 1) == Some(&b'\r') && source.get(i) == Some(&b'\n') {
        i += 1;
    }

    let mut count = 0;
    while let Some(&b) = source.get(i) {
        match b {
            b'\r' => {
                i += if source.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
            }
            b'\n' => i += 1,
            _ => break,
        }
        count += 1;
    }
    count
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the specified encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}
