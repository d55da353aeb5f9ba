//! Boleto tools CLI
//!
//! Drives the import/process/report pipelines against an embedded SQLite
//! database and a local archival directory.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use glob::glob;
use tracing_subscriber::EnvFilter;

use boleto_tools::domain::{BoletoFilter, Lote};
use boleto_tools::files::{load_file, FileStore};
use boleto_tools::ops;
use boleto_tools::pdf::{self, default_columns, ReportLayout};
use boleto_tools::pdf::sample::{demo_pages, sample_csv, sample_pdf};
use boleto_tools::store::{BoletoStore, SqliteStore};

/// Boleto batch processing: CSV import, PDF reconciliation, reports
#[derive(Parser)]
#[command(name = "boleto-tools")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Register the demo lotes and generate the demo files
    boleto-tools seed
    boleto-tools sample --pdf boletos.pdf --csv boletos.csv

    # Import boletos, then split an upload into per-boleto files
    boleto-tools import-csv boletos.csv
    boleto-tools process-pdf boletos.pdf

    # Tabular report for boletos over R$ 100
    boleto-tools report --min-amount 100 -o relatorio.pdf")]
struct Cli {
    /// SQLite database path
    #[arg(long, env = "BOLETO_DB", default_value = "storage/boletos.db", global = true)]
    db: PathBuf,

    /// Archival storage root (CSV and PDF archives live under it)
    #[arg(long, env = "BOLETO_STORAGE_DIR", default_value = "storage", global = true)]
    storage_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import boletos from semicolon CSV files
    ImportCsv {
        /// CSV files to import. Supports glob patterns like "*.csv"
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Split an uploaded PDF and write one file per stored boleto
    ProcessPdf {
        /// Multi-page PDF to process
        file: PathBuf,

        /// Directory for the per-boleto output files
        #[arg(long, env = "BOLETO_OUTPUT_DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Generate the tabular PDF report for active boletos
    Report {
        /// Write the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report as base64 on stdout instead of writing a file
        #[arg(long, conflicts_with = "output")]
        base64: bool,

        /// Payer name substring filter (case-insensitive)
        #[arg(long)]
        name: Option<String>,

        /// Exact lote id filter
        #[arg(long)]
        lote: Option<i64>,

        /// Inclusive minimum amount
        #[arg(long)]
        min_amount: Option<f64>,

        /// Inclusive maximum amount
        #[arg(long)]
        max_amount: Option<f64>,
    },

    /// List active boletos
    List {
        /// Payer name substring filter (case-insensitive)
        #[arg(long)]
        name: Option<String>,

        /// Exact lote id filter
        #[arg(long)]
        lote: Option<i64>,

        /// Inclusive minimum amount
        #[arg(long)]
        min_amount: Option<f64>,

        /// Inclusive maximum amount
        #[arg(long)]
        max_amount: Option<f64>,

        /// Emit JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Register lotes (names stored zero-padded to 4 characters)
    AddLote {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Register the demo lotes 0017, 0018 and 0019
    Seed,

    /// Write the demo 3-page PDF and its matching CSV
    Sample {
        /// Where to write the demo PDF
        #[arg(long, default_value = "boletos-exemplo.pdf")]
        pdf: PathBuf,

        /// Where to write the matching CSV
        #[arg(long, default_value = "boletos-exemplo.csv")]
        csv: PathBuf,
    },

    /// Print the page count of a PDF
    Inspect {
        /// PDF file to inspect
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store = SqliteStore::open(&cli.db)
        .with_context(|| format!("failed to open database {}", cli.db.display()))?;
    let files = FileStore::new(&cli.storage_dir);

    match cli.command {
        Commands::ImportCsv { files: patterns } => cmd_import_csv(&store, &files, patterns),
        Commands::ProcessPdf { file, out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| cli.storage_dir.join("boletos"));
            cmd_process_pdf(&store, &files, file, out_dir)
        }
        Commands::Report {
            output,
            base64,
            name,
            lote,
            min_amount,
            max_amount,
        } => cmd_report(
            &store,
            output,
            base64,
            filter(name, lote, min_amount, max_amount),
        ),
        Commands::List {
            name,
            lote,
            min_amount,
            max_amount,
            json,
        } => cmd_list(&store, filter(name, lote, min_amount, max_amount), json),
        Commands::AddLote { names } => cmd_add_lote(&store, names),
        Commands::Seed => cmd_add_lote(
            &store,
            vec!["0017".to_string(), "0018".to_string(), "0019".to_string()],
        ),
        Commands::Sample { pdf, csv } => cmd_sample(pdf, csv),
        Commands::Inspect { file } => cmd_inspect(file),
    }
}

fn filter(
    name: Option<String>,
    lote: Option<i64>,
    min_amount: Option<f64>,
    max_amount: Option<f64>,
) -> BoletoFilter {
    BoletoFilter {
        payer_name: name,
        lote_id: lote,
        min_amount,
        max_amount,
    }
}

/// Expand glob patterns in input paths; literal paths pass through
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("no files matched pattern: {}", pattern);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    paths.sort();
    Ok(paths)
}

fn cmd_import_csv(store: &SqliteStore, files: &FileStore, patterns: Vec<String>) -> Result<()> {
    let paths = expand_globs(patterns)?;

    for path in paths {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());

        let outcome = ops::import_csv(store, files, &content, &name)
            .with_context(|| format!("failed to import {}", path.display()))?;

        println!(
            "{}: saved {} boletos ({} rows skipped), archived to {}",
            path.display(),
            outcome.saved.len(),
            outcome.skipped.total(),
            outcome.archive.path.display()
        );
    }

    Ok(())
}

fn cmd_process_pdf(
    store: &SqliteStore,
    files: &FileStore,
    file: PathBuf,
    out_dir: PathBuf,
) -> Result<()> {
    let bytes = load_file(&file)?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.pdf".to_string());

    let outcome = ops::process_pdf(store, files, &bytes, &name, &out_dir)
        .with_context(|| format!("failed to process {}", file.display()))?;

    for written in &outcome.written {
        println!("{}", written.path.display());
    }
    println!("archived combined PDF to {}", outcome.archive.path.display());

    let summary = outcome.summary;
    if !summary.is_exact() {
        println!(
            "reconciliation: {} paired, {} boletos without id, {} boletos unpaired, {} pages unpaired",
            summary.paired, summary.missing_id, summary.unpaired_boletos, summary.unpaired_pages
        );
    }

    Ok(())
}

fn cmd_report(
    store: &SqliteStore,
    output: Option<PathBuf>,
    as_base64: bool,
    filter: BoletoFilter,
) -> Result<()> {
    let outcome = ops::generate_report(
        store,
        &filter,
        &default_columns(),
        &ReportLayout::default(),
    )?;

    if as_base64 {
        println!("{}", BASE64.encode(&outcome.bytes));
        return Ok(());
    }

    let path = output.unwrap_or_else(|| PathBuf::from("relatorio-boletos.pdf"));
    fs::write(&path, &outcome.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "report over {} boletos written to {}",
        outcome.boletos.len(),
        path.display()
    );

    Ok(())
}

fn cmd_list(store: &SqliteStore, filter: BoletoFilter, json: bool) -> Result<()> {
    let boletos = store.list_active(&filter)?;

    if json {
        let stdout = io::stdout();
        serde_json::to_writer_pretty(stdout.lock(), &boletos)?;
        writeln!(io::stdout())?;
        return Ok(());
    }

    println!(
        "{:>6}  {:<30}  {:>8}  {:>12}  {}",
        "ID", "Nome do Sacado", "Lote", "Valor (R$)", "Linha Digitável"
    );
    for boleto in &boletos {
        println!(
            "{:>6}  {:<30}  {:>8}  {:>12}  {}",
            boleto.id().map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
            boleto.payer_name(),
            boleto.lote_id(),
            pdf::report::format_amount(boleto.amount()),
            boleto.digit_line()
        );
    }
    println!("{} boletos", boletos.len());

    Ok(())
}

fn cmd_add_lote(store: &SqliteStore, names: Vec<String>) -> Result<()> {
    for name in names {
        let lote = store.insert_lote(&Lote::new(&name)?)?;
        println!(
            "registered lote {} (id {})",
            lote.name(),
            lote.id().unwrap_or_default()
        );
    }
    Ok(())
}

fn cmd_sample(pdf_path: PathBuf, csv_path: PathBuf) -> Result<()> {
    let pages = demo_pages();

    fs::write(&pdf_path, sample_pdf(&pages)?)
        .with_context(|| format!("failed to write {}", pdf_path.display()))?;
    fs::write(&csv_path, sample_csv(&pages))
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    println!("demo PDF written to {}", pdf_path.display());
    println!("demo CSV written to {}", csv_path.display());

    Ok(())
}

fn cmd_inspect(file: PathBuf) -> Result<()> {
    let bytes = load_file(&file)?;
    let pages = pdf::page_count(&bytes)?;

    println!("File: {}", file.display());
    println!("Pages: {}", pages);

    Ok(())
}
