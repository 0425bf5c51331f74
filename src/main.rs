use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pdf_pipeline::{
    config, logging,
    metrics::PipelineMetrics,
    processing::{DocumentPipeline, ExtractionStatus, PipelineOutcome},
};
use serde::Serialize;
use tokio::sync::Semaphore;
use walkdir::WalkDir;

#[derive(Debug, Parser)]
#[command(
    name = "pdf-pipeline",
    version,
    about = "Extract, clean, and segment PDF text into JSON"
)]
struct Cli {
    /// PDF files or directories to scan for `*.pdf`.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Skip header, footer, page-number, and artifact removal.
    #[arg(long)]
    no_clean: bool,
    /// Target chunk size in estimated tokens.
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Fraction of each chunk repeated at the start of the next.
    #[arg(long)]
    overlap: Option<f64>,
    /// Documents processed concurrently.
    #[arg(long)]
    jobs: Option<usize>,
    /// Pretty-print each JSON object.
    #[arg(long)]
    pretty: bool,
}

/// Outcome of one document, or why it produced none.
type DocumentResult = std::result::Result<PipelineOutcome, String>;

#[derive(Serialize)]
struct DocumentReport<'a> {
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a PipelineOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> DocumentReport<'a> {
    fn new(path: &'a Path, result: &'a DocumentResult) -> Self {
        match result {
            Ok(outcome) => Self {
                path,
                outcome: Some(outcome),
                error: None,
            },
            Err(error) => Self {
                path,
                outcome: None,
                error: Some(error),
            },
        }
    }

    /// Rejected documents and documents whose extraction yielded nothing both count as failed.
    fn failed(&self) -> bool {
        self.error.is_some()
            || self
                .outcome
                .is_some_and(|outcome| outcome.extraction.status == ExtractionStatus::Failed)
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let mut config = config::init_config()
        .context("failed to load configuration")?
        .clone();
    if cli.no_clean {
        config.apply_cleaning = false;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.segmentation.chunk_size_tokens = chunk_size;
    }
    if let Some(overlap) = cli.overlap {
        config.segmentation.overlap_percentage = overlap;
    }
    if let Some(jobs) = cli.jobs {
        if jobs == 0 {
            bail!("--jobs must be at least 1");
        }
        config.jobs = jobs;
    }

    let metrics = Arc::new(PipelineMetrics::new());
    let pipeline = Arc::new(
        DocumentPipeline::from_config(&config)
            .context("invalid pipeline options")?
            .with_metrics(Arc::clone(&metrics)),
    );

    let documents = collect_pdfs(&cli.paths)?;
    if documents.is_empty() {
        bail!("no PDF files found");
    }
    tracing::info!(
        documents = documents.len(),
        jobs = config.jobs,
        apply_cleaning = config.apply_cleaning,
        "Processing PDFs"
    );

    let total = documents.len();
    let semaphore = Arc::new(Semaphore::new(config.jobs));
    let mut handles = Vec::with_capacity(total);
    for path in documents {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        let task_path = path.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|err| format!("worker pool closed: {err}"))?;
            tokio::task::spawn_blocking(move || pipeline.process(&task_path))
                .await
                .map_err(|err| format!("extraction worker failed: {err}"))?
                .map_err(|err| err.to_string())
        });
        handles.push((path, handle));
    }

    let stdout = std::io::stdout();
    let mut failures = 0usize;
    for (path, handle) in handles {
        let result: DocumentResult = handle
            .await
            .unwrap_or_else(|err| Err(format!("document task failed: {err}")));
        let report = DocumentReport::new(&path, &result);
        if report.failed() {
            tracing::warn!(path = %path.display(), "Document failed");
            failures += 1;
        }
        let line = if cli.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        writeln!(stdout.lock(), "{line}")?;
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        processed = snapshot.documents_processed,
        failed = snapshot.documents_failed,
        pages = snapshot.pages_extracted,
        segments = snapshot.segments_produced,
        rejected = failures,
        "Batch complete"
    );
    batch_status(failures, total)
}

fn batch_status(failures: usize, total: usize) -> Result<()> {
    if failures > 0 {
        bail!("{failures} of {total} documents failed");
    }
    Ok(())
}

/// Expand directories into the `*.pdf` files beneath them, keeping explicit file arguments.
fn collect_pdfs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file() && is_pdf(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            documents.extend(found);
        } else if input.exists() {
            documents.push(input.clone());
        } else {
            bail!("path does not exist: {}", input.display());
        }
    }
    Ok(documents)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
