//! Sheetload CLI - Import transaction spreadsheets
//!
//! # Commands
//!
//! ```bash
//! sheetload serve                      # Start HTTP server (port 3001)
//! sheetload check october.xlsx         # Validate only, print a report
//! sheetload import october.xlsx        # Validate and save to the database
//! sheetload sheets october.xlsx        # List sheet names
//! ```

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sheetload::{
    evaluate, group_by_sheet, run_import_file, sheet_names, AppConfig, Evaluation, HeaderPolicy,
    ImportContext, ImportOutcome, LogBroadcaster, RejectReason, RowError, SheetSelector, SqliteStore,
    ValidatedRecord,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetload")]
#[command(about = "Validate transaction spreadsheets and save clean submissions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: $PORT or 3001)
        #[arg(short, long)]
        port: Option<u16>,

        /// Database URL (default: $DATABASE_URL or sqlite://transactions.db)
        #[arg(long)]
        database_url: Option<String>,

        /// Accept header rows with columns beyond the required four
        #[arg(long)]
        allow_extra_columns: bool,
    },

    /// Validate a spreadsheet without saving anything
    Check {
        /// Input spreadsheet (xlsx, xls, ods, csv)
        input: PathBuf,

        /// Sheet to read (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Reference date for the current-month rule, YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Accept header rows with columns beyond the required four
        #[arg(long)]
        allow_extra_columns: bool,

        /// Write the validated records as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a spreadsheet and save it when every row is valid
    Import {
        /// Input spreadsheet (xlsx, xls, ods, csv)
        input: PathBuf,

        /// Sheet to read (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Reference date for the current-month rule, YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Database URL (default: $DATABASE_URL or sqlite://transactions.db)
        #[arg(long)]
        database_url: Option<String>,

        /// Accept header rows with columns beyond the required four
        #[arg(long)]
        allow_extra_columns: bool,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Input spreadsheet
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            port,
            database_url,
            allow_extra_columns,
        } => cmd_serve(port, database_url, allow_extra_columns).await,

        Commands::Check {
            input,
            sheet,
            date,
            allow_extra_columns,
            output,
        } => cmd_check(&input, sheet.as_deref(), date, allow_extra_columns, output.as_deref()),

        Commands::Import {
            input,
            sheet,
            date,
            database_url,
            allow_extra_columns,
        } => cmd_import(&input, sheet.as_deref(), date, database_url, allow_extra_columns).await,

        Commands::Sheets { input } => cmd_sheets(&input),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

/// Environment configuration with command-line overrides applied.
fn load_config(
    database_url: Option<String>,
    allow_extra_columns: bool,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(url) = database_url {
        config.database_url = url;
    }
    if allow_extra_columns {
        config.header_policy = HeaderPolicy::AllowExtra;
    }
    Ok(config)
}

fn build_context(
    input: &Path,
    sheet: Option<&str>,
    date: Option<NaiveDate>,
    policy: HeaderPolicy,
) -> ImportContext {
    let ctx = match date {
        Some(date) => ImportContext::new(date),
        None => ImportContext::today(),
    };
    let ctx = ctx
        .with_sheet(SheetSelector::from_name(sheet))
        .with_header_policy(policy);

    match input.file_name().and_then(|n| n.to_str()) {
        Some(name) => ctx.with_file_name(name),
        None => ctx,
    }
}

async fn cmd_serve(
    port: Option<u16>,
    database_url: Option<String>,
    allow_extra_columns: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(database_url, allow_extra_columns)?;
    if let Some(port) = port {
        config.port = port;
    }
    sheetload::server::start_server(config).await?;
    Ok(())
}

fn cmd_check(
    input: &Path,
    sheet: Option<&str>,
    date: Option<NaiveDate>,
    allow_extra_columns: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Checking: {}", input.display());

    let config = load_config(None, allow_extra_columns)?;
    let ctx = build_context(input, sheet, date, config.header_policy);
    let bytes = fs::read(input)?;

    match evaluate(&bytes, &ctx, &LogBroadcaster::new())? {
        Evaluation::Rejected(reason) => {
            print_rejection(&reason);
            std::process::exit(1);
        }
        Evaluation::Partitioned { partition, .. } if !partition.is_clean() => {
            print_row_errors(&partition.error_rows);
            std::process::exit(1);
        }
        Evaluation::Partitioned { partition, .. } => {
            eprintln!("\n✅ All {} rows valid", partition.valid_records.len());
            if let Some(path) = output {
                write_records(&partition.valid_records, path)?;
            }
        }
    }

    Ok(())
}

async fn cmd_import(
    input: &Path,
    sheet: Option<&str>,
    date: Option<NaiveDate>,
    database_url: Option<String>,
    allow_extra_columns: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Importing: {}", input.display());

    let config = load_config(database_url, allow_extra_columns)?;
    let ctx = build_context(input, sheet, date, config.header_policy);
    let store = SqliteStore::connect(&config.database_url).await?;

    match run_import_file(input, &ctx, &store, &LogBroadcaster::new()).await? {
        ImportOutcome::Accepted { count, .. } => {
            eprintln!("\n✨ Saved {} records to {}", count, config.database_url);
        }
        ImportOutcome::Rejected(reason) => {
            print_rejection(&reason);
            std::process::exit(1);
        }
        ImportOutcome::ValidationFailed(errors) => {
            print_row_errors(&errors);
            eprintln!("\nNothing was saved.");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn cmd_sheets(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let file_name = input.file_name().and_then(|n| n.to_str());

    for name in sheet_names(&bytes, file_name)? {
        println!("{}", name);
    }
    Ok(())
}

fn print_rejection(reason: &RejectReason) {
    eprintln!("\n❌ {}", reason);
    let RejectReason::InvalidHeaders { missing, unexpected } = reason;
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.header()).collect();
        eprintln!("   Missing: {}", names.join(", "));
    }
    if !unexpected.is_empty() {
        eprintln!("   Unexpected: {}", unexpected.join(", "));
    }
    eprintln!("   Expected exactly: Name, Amount, Date, Verified");
}

fn print_row_errors(errors: &[RowError]) {
    eprintln!("\n❌ {} invalid rows", errors.len());
    for group in group_by_sheet(errors) {
        eprintln!("\n   Sheet: {}", group.sheet);
        for row in &group.rows {
            eprintln!("   Row {}:", row.row);
            for err in &row.errors {
                eprintln!("     - {}", err);
            }
        }
    }
}

fn write_records(records: &[ValidatedRecord], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    eprintln!("💾 Output written to: {}", path.display());
    Ok(())
}
