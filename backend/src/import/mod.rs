//! Import pipeline: extract → map headers → validate rows → partition → persist.

pub mod partition;
pub mod pipeline;

pub use partition::{group_by_sheet, partition, Partition, RowResult, SheetErrors};
pub use pipeline::{evaluate, evaluate_sheet, run_import, run_import_file, Evaluation, ImportContext};
