//! High-level import pipeline.
//!
//! Combines every step of an import:
//!
//! 1. Extract the selected sheet (header row + data rows)
//! 2. Map the header row onto the required columns (all-or-nothing gate)
//! 3. Validate every data row independently
//! 4. Partition rows into records and row errors
//! 5. Persist the records, only when no row failed
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetload::api::logs::LogBroadcaster;
//! use sheetload::import::{run_import, ImportContext};
//! use sheetload::store::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::connect("sqlite://transactions.db").await?;
//!     let bytes = std::fs::read("october.xlsx")?;
//!     let ctx = ImportContext::today().with_file_name("october.xlsx");
//!     let outcome = run_import(&bytes, &ctx, &store, &LogBroadcaster::new()).await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

use chrono::{Local, NaiveDate};
use std::path::Path;
use uuid::Uuid;

use super::partition::{partition, Partition};
use crate::api::logs::LogBroadcaster;
use crate::error::{ExtractError, ImportError, ImportResult};
use crate::models::{ImportOutcome, RejectReason};
use crate::parser::{extract_sheet, ExtractedSheet, SheetSelector, SourceFormat};
use crate::store::RecordStore;
use crate::validation::{map_headers, validate_row, HeaderPolicy};

/// Rows shown in the log when a submission has errors.
const LOGGED_ERROR_ROWS: usize = 5;

/// Everything an import needs besides the file and the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportContext {
    /// Date whose month the Date column must fall in
    pub reference_date: NaiveDate,
    /// Sheet to read
    pub sheet: SheetSelector,
    /// Treatment of unknown header cells
    pub header_policy: HeaderPolicy,
    /// Original file name, used for format detection and naming CSV sheets
    pub file_name: Option<String>,
}

impl ImportContext {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            sheet: SheetSelector::First,
            header_policy: HeaderPolicy::Strict,
            file_name: None,
        }
    }

    /// Context pinned to the local calendar date.
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn with_sheet(mut self, sheet: SheetSelector) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn with_header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.header_policy = policy;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Result of validating a file without touching the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Header row refused; no data row was looked at.
    Rejected(RejectReason),
    /// Every data row was validated.
    Partitioned { sheet: String, partition: Partition },
}

/// Extract, map and validate an upload.
pub fn evaluate(bytes: &[u8], ctx: &ImportContext, logs: &LogBroadcaster) -> ImportResult<Evaluation> {
    logs.info("📖 Reading spreadsheet...");
    let extracted = extract_sheet(bytes, ctx.file_name.as_deref(), &ctx.sheet).map_err(|e| {
        logs.error(e.to_string());
        e
    })?;
    log_extraction(&extracted, logs);

    Ok(evaluate_sheet(extracted, ctx, logs))
}

/// Map and validate an already extracted sheet.
pub fn evaluate_sheet(extracted: ExtractedSheet, ctx: &ImportContext, logs: &LogBroadcaster) -> Evaluation {
    logs.info("📋 Mapping columns...");
    let headers = match map_headers(&extracted.headers, ctx.header_policy) {
        Ok(headers) => headers,
        Err(reason) => {
            log_rejection(&reason, logs);
            return Evaluation::Rejected(reason);
        }
    };
    for (field, column) in headers.iter() {
        logs.info_indent(format!("{} → column {}", field, column_letter(column)), 1);
    }

    logs.info(format!(
        "✔️  Validating {} rows (current month: {})...",
        extracted.rows.len(),
        ctx.reference_date.format("%Y-%m")
    ));
    let results = extracted
        .rows
        .iter()
        .map(|row| (row.number, validate_row(row, &headers, ctx.reference_date)));
    let partition = partition(&extracted.sheet, results);
    log_partition(&partition, logs);

    Evaluation::Partitioned {
        sheet: extracted.sheet,
        partition,
    }
}

/// Run a full import of an in-memory upload.
///
/// Parsing and validation run on the blocking thread pool; only the store
/// call runs on the async runtime.
pub async fn run_import(
    bytes: &[u8],
    ctx: &ImportContext,
    store: &dyn RecordStore,
    logs: &LogBroadcaster,
) -> ImportResult<ImportOutcome> {
    import_owned(bytes.to_vec(), ctx.clone(), store, logs).await
}

/// Run a full import of a file on disk.
pub async fn run_import_file(
    path: &Path,
    ctx: &ImportContext,
    store: &dyn RecordStore,
    logs: &LogBroadcaster,
) -> ImportResult<ImportOutcome> {
    let bytes = tokio::fs::read(path).await.map_err(ExtractError::from)?;

    let mut ctx = ctx.clone();
    if ctx.file_name.is_none() {
        ctx.file_name = path.file_name().and_then(|n| n.to_str()).map(String::from);
    }

    import_owned(bytes, ctx, store, logs).await
}

async fn import_owned(
    bytes: Vec<u8>,
    ctx: ImportContext,
    store: &dyn RecordStore,
    logs: &LogBroadcaster,
) -> ImportResult<ImportOutcome> {
    let task_logs = logs.clone();
    let evaluation = run_blocking(move || evaluate(&bytes, &ctx, &task_logs)).await?;
    persist(evaluation, store, logs).await
}

/// Run CPU-bound work on the blocking pool. Panics resume on the caller.
async fn run_blocking<T, F>(work: F) -> ImportResult<T>
where
    F: FnOnce() -> ImportResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(ImportError::Worker(e.to_string())),
    }
}

/// Turn an evaluation into an outcome, saving records when the sheet is clean.
async fn persist(
    evaluation: Evaluation,
    store: &dyn RecordStore,
    logs: &LogBroadcaster,
) -> ImportResult<ImportOutcome> {
    let partition = match evaluation {
        Evaluation::Rejected(reason) => return Ok(ImportOutcome::Rejected(reason)),
        Evaluation::Partitioned { partition, .. } => partition,
    };

    if !partition.is_clean() {
        logs.warning(format!(
            "Nothing saved: {} of {} rows failed validation",
            partition.error_rows.len(),
            partition.row_count()
        ));
        return Ok(ImportOutcome::ValidationFailed(partition.error_rows));
    }

    let records = partition.valid_records;
    if records.is_empty() {
        logs.success("No data rows, nothing to save");
        return Ok(ImportOutcome::Accepted { count: 0, records });
    }

    let import_id = Uuid::new_v4();
    logs.info(format!("💾 Saving {} records (import {})...", records.len(), import_id));
    let count = store.insert_many(import_id, &records).await.map_err(|e| {
        logs.error(format!("Database insertion failed: {}", e));
        e
    })?;
    logs.success(format!("Saved {} records", count));

    Ok(ImportOutcome::Accepted { count, records })
}

fn log_extraction(extracted: &ExtractedSheet, logs: &LogBroadcaster) {
    match extracted.format {
        SourceFormat::Workbook => logs.success(format!("Workbook sheet: {}", extracted.sheet)),
        SourceFormat::Delimited => {
            logs.success(format!(
                "Delimited text: encoding {}, separator '{}'",
                extracted.encoding.as_deref().unwrap_or("?"),
                format_delimiter(extracted.delimiter.unwrap_or(','))
            ));
        }
    }
    logs.success(format!("Read {} data rows", extracted.rows.len()));
}

fn log_rejection(reason: &RejectReason, logs: &LogBroadcaster) {
    logs.error(reason.to_string());
    let RejectReason::InvalidHeaders { missing, unexpected } = reason;
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.header()).collect();
        logs.error_indent(format!("Missing: {}", names.join(", ")), 1);
    }
    if !unexpected.is_empty() {
        logs.error_indent(format!("Unexpected: {}", unexpected.join(", ")), 1);
    }
}

fn log_partition(partition: &Partition, logs: &LogBroadcaster) {
    if partition.is_clean() {
        logs.success(format!("All {} rows valid!", partition.valid_records.len()));
        return;
    }

    logs.success(format!("Valid: {}", partition.valid_records.len()));
    logs.error(format!("Invalid: {}", partition.error_rows.len()));
    for row in partition.error_rows.iter().take(LOGGED_ERROR_ROWS) {
        logs.error_indent(format!("Row {}: {}", row.row, row.errors.join("; ")), 1);
    }
    if partition.error_rows.len() > LOGGED_ERROR_ROWS {
        logs.error_indent(
            format!("... +{} more rows", partition.error_rows.len() - LOGGED_ERROR_ROWS),
            1,
        );
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

/// Spreadsheet column letter for a 0-based index (0 → A, 26 → AA).
fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ImportError, StoreError, StoreResult};
    use crate::models::{Field, ValidatedRecord};
    use crate::store::MemoryStore;
    use crate::validation::{AMOUNT_INVALID, DATE_INVALID, NAME_REQUIRED, VERIFIED_INVALID};
    use async_trait::async_trait;

    const HEADER: &str = "Name,Amount,Date,Verified";

    fn ctx() -> ImportContext {
        ImportContext::new(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()).with_file_name("october.csv")
    }

    fn logs() -> LogBroadcaster {
        LogBroadcaster::quiet()
    }

    fn csv(header: &str, rows: &[&str]) -> Vec<u8> {
        let mut out = String::from(header);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out.into_bytes()
    }

    struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn insert_many(&self, _: Uuid, _: &[ValidatedRecord]) -> StoreResult<usize> {
            Err(StoreError::Insert("database is locked".into()))
        }

        async fn count(&self) -> StoreResult<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_clean_file_is_saved() {
        let store = MemoryStore::new();
        let bytes = csv(HEADER, &["Alice,123.45,2026-10-01,Yes", "Bob,7,2026-10-31,No"]);

        let outcome = run_import(&bytes, &ctx(), &store, &logs()).await.unwrap();

        match outcome {
            ImportOutcome::Accepted { count, records } => {
                assert_eq!(count, 2);
                assert_eq!(records[0].amount(), 123.45);
                assert!(records[0].verified());
                assert!(!records[1].verified());
            }
            other => panic!("expected Accepted, got {:?}", other),
        }
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_one_bad_row_blocks_whole_submission() {
        let store = MemoryStore::new();
        let mut rows: Vec<String> = (1..=9)
            .map(|i| format!("Person {},{}.50,2026-10-{:02},Yes", i, i, i))
            .collect();
        rows.insert(4, "Broken,-1,2026-10-05,No".to_string());
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

        let outcome = run_import(&csv(HEADER, &rows), &ctx(), &store, &logs()).await.unwrap();

        match outcome {
            ImportOutcome::ValidationFailed(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].sheet, "october");
                assert_eq!(errors[0].row, 6);
                assert_eq!(errors[0].errors, vec![AMOUNT_INVALID]);
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_every_reason_reported_in_order() {
        let store = MemoryStore::new();
        let bytes = csv(HEADER, &[",-5,yesterday,maybe"]);

        let outcome = run_import(&bytes, &ctx(), &store, &logs()).await.unwrap();

        let ImportOutcome::ValidationFailed(errors) = outcome else {
            panic!("expected ValidationFailed");
        };
        assert_eq!(errors[0].row, 2);
        assert_eq!(errors[0].errors, vec![NAME_REQUIRED, AMOUNT_INVALID, DATE_INVALID, VERIFIED_INVALID]);
    }

    #[tokio::test]
    async fn test_header_only_file_saves_nothing() {
        let store = MemoryStore::new();
        let outcome = run_import(&csv(HEADER, &[]), &ctx(), &store, &logs()).await.unwrap();

        assert_eq!(outcome, ImportOutcome::Accepted { count: 0, records: vec![] });
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bad_headers_reject_before_rows() {
        let store = MemoryStore::new();
        let bad_row = ",-1,never,maybe";

        for header in [
            "Name,Amount,Date",
            "Name,Amount,Date,Verified,Comment",
            "Name,Amount,When,Verified",
            "name,amount,date,verified",
        ] {
            let outcome = run_import(&csv(header, &[bad_row]), &ctx(), &store, &logs()).await.unwrap();
            assert!(
                matches!(outcome, ImportOutcome::Rejected(RejectReason::InvalidHeaders { .. })),
                "{header}: {outcome:?}"
            );
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejection_logs_no_row_validation() {
        let logs = logs();
        let mut rx = logs.subscribe();
        let store = MemoryStore::new();

        run_import(&csv("Name,Amount", &["a,1"]), &ctx(), &store, &logs).await.unwrap();

        let mut messages = Vec::new();
        while let Ok(entry) = rx.try_recv() {
            messages.push(entry.message);
        }
        assert!(messages.iter().any(|m| m == "Invalid column headers"));
        assert!(messages.iter().all(|m| !m.contains("Validating")));
    }

    #[tokio::test]
    async fn test_extra_columns_allowed_when_lenient() {
        let store = MemoryStore::new();
        let ctx = ctx().with_header_policy(HeaderPolicy::AllowExtra);
        let bytes = csv("Id,Verified,Date,Amount,Name", &["17,No,2026-10-02,3,Zoe"]);

        let outcome = run_import(&bytes, &ctx, &store, &logs()).await.unwrap();

        let ImportOutcome::Accepted { records, .. } = outcome else {
            panic!("expected Accepted");
        };
        assert_eq!(records[0].name(), "Zoe");
        assert_eq!(records[0].amount(), 3.0);
    }

    #[tokio::test]
    async fn test_date_rule_follows_reference_date() {
        let store = MemoryStore::new();
        let bytes = csv(HEADER, &["Alice,10,2026-11-02,Yes"]);

        let october = run_import(&bytes, &ctx(), &store, &logs()).await.unwrap();
        assert!(matches!(october, ImportOutcome::ValidationFailed(_)));

        let november = ImportContext {
            reference_date: NaiveDate::from_ymd_opt(2026, 11, 30).unwrap(),
            ..ctx()
        };
        let outcome = run_import(&bytes, &november, &store, &logs()).await.unwrap();
        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_an_error() {
        let bytes = csv(HEADER, &["Alice,10,2026-10-02,Yes"]);
        let result = run_import(&bytes, &ctx(), &FailingStore, &logs()).await;
        assert!(matches!(result, Err(ImportError::Persistence(StoreError::Insert(_)))));
    }

    #[tokio::test]
    async fn test_malformed_workbook_is_an_error() {
        let store = MemoryStore::new();
        let ctx = ctx().with_file_name("october.xlsx");
        let result = run_import(b"definitely not a workbook", &ctx, &store, &logs()).await;
        assert!(matches!(result, Err(ImportError::Extract(ExtractError::MalformedFile(_)))));
    }

    #[tokio::test]
    async fn test_binary_upload_is_malformed() {
        let png: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01";
        let store = MemoryStore::new();

        let result = run_import(png, &ctx().with_file_name("photo.png"), &store, &logs()).await;

        assert!(matches!(result, Err(ImportError::Extract(ExtractError::MalformedFile(_)))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_workbook_import_is_saved() {
        let store = MemoryStore::new();
        let bytes = crate::parser::fixtures::transactions_xlsx();
        let ctx = ctx().with_file_name("october.xlsx");

        let outcome = run_import(&bytes, &ctx, &store, &logs()).await.unwrap();

        let ImportOutcome::Accepted { count, records } = outcome else {
            panic!("expected Accepted, got {:?}", outcome);
        };
        assert_eq!(count, 2);
        assert_eq!(records[0].name(), "Alice");
        assert_eq!(records[0].amount(), 123.45);
        assert_eq!(records[0].date(), NaiveDate::from_ymd_opt(2026, 10, 3).unwrap());
        assert!(records[0].verified());
        assert_eq!(records[1].amount(), 7.0);
        assert!(!records[1].verified());
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_workbook_named_sheet_reports_its_rows() {
        let store = MemoryStore::new();
        let bytes = crate::parser::fixtures::transactions_xlsx();
        let ctx = ctx()
            .with_file_name("october.xlsx")
            .with_sheet(SheetSelector::Named("Audit".into()));

        let outcome = run_import(&bytes, &ctx, &store, &logs()).await.unwrap();

        let ImportOutcome::ValidationFailed(errors) = outcome else {
            panic!("expected ValidationFailed, got {:?}", outcome);
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].sheet, "Audit");
        assert_eq!(errors[0].row, 2);
        assert_eq!(errors[0].errors, vec![VERIFIED_INVALID.to_string()]);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_workbook_date_outside_month() {
        let bytes = crate::parser::fixtures::transactions_xlsx();
        let november = ImportContext::new(NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());

        let Evaluation::Partitioned { partition, .. } = evaluate(&bytes, &november, &logs()).unwrap() else {
            panic!("expected Partitioned");
        };
        let rows: Vec<u32> = partition.error_rows.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 3]);
        assert!(partition.error_rows.iter().all(|e| e.errors == vec![DATE_INVALID.to_string()]));
    }

    #[tokio::test]
    async fn test_parsing_runs_off_the_caller_thread() {
        let caller = std::thread::current().id();
        let worker = run_blocking(|| Ok(std::thread::current().id())).await.unwrap();
        assert_ne!(worker, caller);

        let result: ImportResult<()> =
            run_blocking(|| Err(ExtractError::MalformedFile("bad".into()).into())).await;
        assert!(matches!(result, Err(ImportError::Extract(_))));
    }

    #[tokio::test]
    #[should_panic(expected = "parser bug")]
    async fn test_parsing_panic_reaches_caller() {
        let _ = run_blocking(|| -> ImportResult<()> { panic!("parser bug") }).await;
    }

    #[tokio::test]
    async fn test_run_import_file_names_sheet_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payroll.csv");
        std::fs::write(&path, csv(HEADER, &["Alice,abc,2026-10-02,Yes"])).unwrap();

        let ctx = ImportContext::new(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        let outcome = run_import_file(&path, &ctx, &MemoryStore::new(), &logs()).await.unwrap();

        let ImportOutcome::ValidationFailed(errors) = outcome else {
            panic!("expected ValidationFailed");
        };
        assert_eq!(errors[0].sheet, "payroll");
    }

    #[test]
    fn test_evaluate_does_not_need_a_store() {
        let evaluation = evaluate(&csv(HEADER, &["Alice,1,2026-10-09,No"]), &ctx(), &logs()).unwrap();
        let Evaluation::Partitioned { sheet, partition } = evaluation else {
            panic!("expected Partitioned");
        };
        assert_eq!(sheet, "october");
        assert!(partition.is_clean());
        assert_eq!(partition.valid_records.len(), 1);
    }

    #[test]
    fn test_missing_fields_listed_in_rejection() {
        let evaluation = evaluate(&csv("Amount,Name", &[]), &ctx(), &logs()).unwrap();
        assert_eq!(
            evaluation,
            Evaluation::Rejected(RejectReason::InvalidHeaders {
                missing: vec![Field::Date, Field::Verified],
                unexpected: vec![],
            })
        );
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }
}
