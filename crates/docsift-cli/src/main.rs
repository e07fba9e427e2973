// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift — command-line front end.
//
// Entry point. Initialises logging, parses the command line, and reports
// failures as editor-facing messages.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use docsift_core::human_errors::humanize_error;

#[derive(Parser, Debug)]
#[command(name = "docsift")]
#[command(
    version,
    about = "Page region detection and editable table extraction for scanned documents"
)]
pub struct Cli {
    /// JSON pipeline configuration (defaults apply when omitted)
    #[arg(short, long, global = true, env = "DOCSIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory for generated artifacts (overrides the config file)
    #[arg(long, global = true)]
    artifact_root: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect regions in a PDF or image and write the page artifacts
    Process(ProcessArgs),

    /// Decode an aligned-text table file and print it as JSON
    Decode {
        /// File holding the aligned text
        input: PathBuf,
    },

    /// Turn a raw title into a storage identifier
    Sanitize {
        /// Raw title
        raw: String,
    },

    /// Clean up OCR text read from a file
    Normalize {
        /// Text file
        input: PathBuf,
    },

    /// Delete every generated artifact
    Clean,

    /// Load a CSV or XLSX file and print its name and aligned text
    ImportData {
        /// Data file
        input: PathBuf,
    },

    /// Decode an aligned-text table and write it as CSV to the data directory
    ExportCsv {
        /// File holding the aligned text
        input: PathBuf,

        /// Table name; sanitized before use
        #[arg(short, long)]
        name: String,
    },

    /// Decode an aligned-text table and append it to the database
    PersistTable {
        /// File holding the aligned text
        input: PathBuf,

        /// Table name; sanitized before use
        #[arg(short, long)]
        name: String,

        /// SQLite database file
        #[arg(long, env = "DOCSIFT_DB")]
        db: PathBuf,
    },

    /// Store a document's text as ordered chunks
    PersistText {
        /// Text file
        input: PathBuf,

        /// Name recorded with the text (default: the file name)
        #[arg(short, long)]
        name: Option<String>,

        /// SQLite database file
        #[arg(long, env = "DOCSIFT_DB")]
        db: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// PDF, PNG, or JPEG upload
    pub input: PathBuf,

    /// Layout detection command, called with --image/--conf/--iou per page
    #[arg(long, env = "DOCSIFT_MODEL_COMMAND")]
    pub model_command: PathBuf,

    /// Extra argument placed before the per-page flags (repeatable)
    #[arg(long = "model-arg", allow_hyphen_values = true)]
    pub model_args: Vec<String>,

    /// Table-structure extraction command; tables are left empty without it
    #[arg(long)]
    pub table_extractor: Option<PathBuf>,

    /// Recognize the text canvases with tesseract
    #[arg(long)]
    pub ocr: bool,

    /// Tesseract language
    #[arg(long, default_value = "eng")]
    pub lang: String,

    /// Recognize with the built-in ocrs engine, loading models from this directory
    #[cfg(feature = "ocr")]
    #[arg(long, conflicts_with = "ocr")]
    pub ocr_models: Option<PathBuf>,

    /// CSV or XLSX data for the detected figures, attached in order (repeatable)
    #[arg(long = "figure-data")]
    pub figure_data: Vec<PathBuf>,

    /// Write every named table and figure as CSV to the data directory
    #[arg(long)]
    pub export_csv: bool,

    /// Append named tables and the text to this SQLite database
    #[arg(long, env = "DOCSIFT_DB")]
    pub db: Option<PathBuf>,

    /// Minimum detection confidence
    #[arg(long)]
    pub conf: Option<f32>,

    /// IoU threshold for the detector's own suppression
    #[arg(long)]
    pub iou: Option<f32>,

    /// Rasterization resolution for PDFs
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Detection model instances
    #[arg(long)]
    pub workers: Option<usize>,

    /// Abandon a page whose detection takes longer than this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long)]
    pub implicit_rows: bool,

    #[arg(long)]
    pub implicit_columns: bool,

    #[arg(long)]
    pub borderless: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, class = ?err.class(), "command failed");
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}
