//! Run entry points: harvest → download → classify → extract → clean → write.
//!
//! Reports are processed one at a time. A report that fails at any stage is
//! logged, recorded in the manifest and skipped; only run-level problems
//! (listing page, pdfium, output directories, VLM provider) abort.

use crate::clean::{sheet, CleanError};
use crate::config::RunConfig;
use crate::error::{AqError, ReportError};
use crate::output::{ReportOutcome, RunOutput, RunSummary};
use crate::pipeline::classify::{classify, save_page_image};
use crate::pipeline::dates::normalize_date;
use crate::pipeline::fetch::{download_report, pdf_file_name};
use crate::pipeline::harvest::harvest_links;
use crate::pipeline::ocr::{write_sheet, OcrEngine};
use crate::pipeline::pdf::{bind_pdfium, scan_first_page, PageScan};
use crate::pipeline::text_table::{extract_table, extract_year, text_lines, Bucket};
use crate::pipeline::write::{ensure_dir, write_final_csv, write_report_csv};
use crate::report::{LayoutKind, Manifest, Report, ReportEntry};
use crate::table::{CleanedTable, FinalDataset, Variant};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Harvest the listing page, download every kept report and process them.
///
/// # Errors
/// Fatal only: listing page unreachable, pdfium missing, VLM provider not
/// configured, output directory or final CSV unwritable, or no report cleaned.
pub async fn run(config: &RunConfig) -> Result<RunOutput, AqError> {
    let start = Instant::now();
    info!("Starting run: {}", config.listing_url);

    // ── Step 1: Engines and directories ──────────────────────────────────
    prepare_dirs(config)?;
    bind_pdfium(config.pdfium_lib_path.as_deref())?;
    let ocr = OcrEngine::from_config(config)?;

    // ── Step 2: Harvest links ────────────────────────────────────────────
    let client = Client::builder()
        .timeout(Duration::from_secs(config.download_timeout_secs))
        .build()
        .map_err(|e| AqError::Internal(format!("HTTP client: {}", e)))?;
    let harvest = harvest_links(&client, &config.listing_url, &config.block_list).await?;

    // ── Step 3: Download ─────────────────────────────────────────────────
    let mut manifest = Manifest::new();
    for link in &harvest.kept {
        match download_report(&client, &config.site_origin, link, &config.work_dir).await {
            Ok(report) => {
                manifest.push(report);
            }
            Err(e) => {
                warn!("{}", e);
                let file_name = pdf_file_name(link).unwrap_or_else(|_| link.clone());
                let report = Report {
                    path: config.work_dir.join(&file_name),
                    file_name,
                    url: None,
                };
                manifest.push_failed(report, e);
            }
        }
    }

    let mut summary = RunSummary {
        links_found: harvest.pdf_links.len(),
        links_blocked: harvest.blocked(),
        links_duplicate: harvest.duplicates.len(),
        reports: manifest.len() - manifest.failures().count(),
        ..Default::default()
    };

    // ── Step 4: Process ──────────────────────────────────────────────────
    let mut output = process_reports(manifest, config, ocr.as_ref(), &mut summary).await?;
    output.summary.total_duration_ms = start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Process the PDFs already in `work_dir`, without harvesting or downloading.
pub async fn run_local(config: &RunConfig) -> Result<RunOutput, AqError> {
    let start = Instant::now();
    info!("Starting local run in {}", config.work_dir.display());

    prepare_dirs(config)?;
    bind_pdfium(config.pdfium_lib_path.as_deref())?;
    let ocr = OcrEngine::from_config(config)?;

    let mut manifest = Manifest::new();
    for path in list_pdfs(&config.work_dir)? {
        manifest.push(Report::local(path));
    }
    info!("Found {} local PDFs", manifest.len());

    let mut summary = RunSummary {
        reports: manifest.len(),
        ..Default::default()
    };
    let mut output = process_reports(manifest, config, ocr.as_ref(), &mut summary).await?;
    output.summary.total_duration_ms = start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &RunConfig) -> Result<RunOutput, AqError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AqError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}

/// Classify, extract, clean and write every report in `manifest`.
///
/// Entries that already carry an error (failed downloads) are reported and
/// skipped, and entries that already have a layout are not rescanned. Text
/// tables are cleaned as they are read; OCR sheets are cleaned afterwards,
/// from the sheets recorded in the manifest.
pub async fn process_reports(
    mut manifest: Manifest,
    config: &RunConfig,
    ocr: Option<&OcrEngine>,
    summary: &mut RunSummary,
) -> Result<RunOutput, AqError> {
    let total = manifest.len();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_run_start(total);
    }

    let mut cleaned: Vec<(usize, CleanedTable)> = Vec::new();

    // ── Text tables and OCR sheets ───────────────────────────────────────
    for idx in 0..total {
        let Some(entry) = manifest.get_mut(idx) else {
            continue;
        };
        let name = entry.report.file_name.clone();
        if let Some(cb) = cb {
            cb.on_report_start(&name, idx + 1, total);
        }
        if let Some(ref e) = entry.error {
            if let Some(cb) = cb {
                cb.on_report_error(&name, &e.to_string());
            }
            continue;
        }
        if entry.layout.is_some() {
            debug!("{}: already classified, not rescanned", name);
            continue;
        }

        info!("Processing {} ({}/{})", name, idx + 1, total);
        match prepare_report(entry, config, ocr).await {
            Ok(Some(table)) => cleaned.push((idx, table)),
            Ok(None) => {}
            Err(e) => {
                warn!("{}", e);
                if let Some(cb) = cb {
                    cb.on_report_error(&name, &e.to_string());
                }
                entry.error = Some(e);
            }
        }
    }

    // ── OCR sheets ───────────────────────────────────────────────────────
    let sheets: Vec<(usize, PathBuf)> = manifest
        .sheets()
        .map(|(idx, path)| (idx, path.to_path_buf()))
        .collect();
    for (idx, path) in sheets {
        let Some(entry) = manifest.get_mut(idx) else {
            continue;
        };
        match sheet::load(&path) {
            Ok(table) => cleaned.push((idx, table)),
            Err(e) => {
                let e = cleaning_error(&entry.report.file_name, Variant::OcrSpreadsheet, e);
                warn!("{}", e);
                if let Some(cb) = cb {
                    cb.on_report_error(&entry.report.file_name, &e.to_string());
                }
                entry.error = Some(e);
            }
        }
    }

    // ── Per-report CSVs ──────────────────────────────────────────────────
    let data_dir = config.data_path();
    let mut rows = vec![0usize; total];
    let mut written: Vec<(usize, CleanedTable)> = Vec::with_capacity(cleaned.len());
    for (idx, table) in cleaned {
        let Some(entry) = manifest.get_mut(idx) else {
            continue;
        };
        match write_report_csv(&data_dir, &table) {
            Ok(path) => {
                debug!("{}: {} rows → {}", entry.report.file_name, table.len(), path.display());
                entry.artifacts.csv = Some(path);
                rows[idx] = table.len();
                if let Some(cb) = cb {
                    cb.on_report_complete(&entry.report.file_name, table.len());
                }
                written.push((idx, table));
            }
            Err(e) => {
                warn!("{}", e);
                if let Some(cb) = cb {
                    cb.on_report_error(&entry.report.file_name, &e.to_string());
                }
                entry.error = Some(e);
            }
        }
    }

    // ── Final dataset ────────────────────────────────────────────────────
    summary.text_tables = manifest.count_layout(LayoutKind::TextTable);
    summary.image_tables = manifest.count_layout(LayoutKind::ImageTable);
    summary.readable = manifest.count_variant(Variant::ReadableText);
    summary.over_wide = manifest.count_variant(Variant::OverWideText);
    summary.under_wide = manifest.count_variant(Variant::UnderWideText);
    summary.ocr_sheets = manifest.count_variant(Variant::OcrSpreadsheet);
    summary.cleaned = written.len();
    summary.failed = manifest.failures().count();

    if let Some(cb) = cb {
        cb.on_run_complete(total, written.len());
    }

    if written.is_empty() {
        let first_error = manifest
            .failures()
            .next()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no reports to process".to_string());
        return Err(AqError::AllReportsFailed { total, first_error });
    }

    written.sort_by_key(|(idx, table)| (table.variant, *idx));
    let mut dataset = FinalDataset::concat(written.iter().map(|(_, t)| t));
    dataset.map_dates(normalize_date);

    let final_csv = config.final_csv_path();
    write_final_csv(&final_csv, &dataset)?;
    summary.rows_written = dataset.len();

    info!(
        "Run complete: {}/{} reports cleaned, {} rows",
        summary.cleaned,
        total,
        dataset.len()
    );

    let reports = manifest
        .entries()
        .iter()
        .zip(&rows)
        .map(|(entry, &n)| ReportOutcome::from_entry(entry, n))
        .collect();

    Ok(RunOutput {
        dataset,
        reports,
        summary: summary.clone(),
        final_csv,
    })
}

/// Scan one report and either clean its text table or write its OCR sheet.
///
/// Returns the cleaned table for text reports and `None` for image reports,
/// whose sheet is recorded on the entry.
async fn prepare_report(
    entry: &mut ReportEntry,
    config: &RunConfig,
    ocr: Option<&OcrEngine>,
) -> Result<Option<CleanedTable>, ReportError> {
    let file = entry.report.file_name.clone();
    let scan = scan_first_page(&entry.report.path, config.pdfium_lib_path.as_deref()).await?;
    let layout = classify(&scan);
    entry.layout = Some(layout);
    debug!("{}: {:?} ({} images)", file, layout, scan.image_count);

    match layout {
        LayoutKind::TextTable => {
            let (variant, cleaned) = text_report_table(&file, &scan);
            entry.variant = Some(variant);
            cleaned.map(Some)
        }
        LayoutKind::ImageTable => {
            let image = scan.first_image.ok_or_else(|| ReportError::Image {
                file: file.clone(),
                detail: "first page image could not be decoded".to_string(),
            })?;
            let png = save_page_image(&entry.report, image.clone(), &config.images_path()).await?;
            entry.artifacts.image = Some(png);

            let ocr = ocr.ok_or_else(|| ReportError::OcrUnavailable { file: file.clone() })?;
            let grid = ocr.read_table(&file, &image).await?;

            let sheet = config.work_dir.join(format!("{}.csv", entry.report.stem()));
            write_sheet(&file, &sheet, grid)?;
            entry.artifacts.sheet = Some(sheet);
            entry.variant = Some(Variant::OcrSpreadsheet);
            Ok(None)
        }
    }
}

/// Route a text-table page to its cleaner and clean it.
///
/// The page is laid out as a grid; its width picks the variant. A six-column
/// grid is cleaned as-is, any other width falls back to the page text. The
/// variant is returned even when cleaning (or the year lookup) fails.
pub fn text_report_table(
    file: &str,
    scan: &PageScan,
) -> (Variant, Result<CleanedTable, ReportError>) {
    let grid = extract_table(file, &scan.glyphs);
    let bucket = Bucket::from_width(grid.width());
    let variant = bucket.variant();
    debug!("{}: {} columns → {}", file, grid.width(), variant);

    let input = match bucket {
        Bucket::Readable => grid,
        Bucket::OverWide | Bucket::UnderWide => text_lines(file, &scan.text),
    };
    let cleaned = extract_year(file)
        .ok_or_else(|| ReportError::MissingYear {
            file: file.to_string(),
        })
        .and_then(|year| {
            variant
                .clean(input, year)
                .map_err(|e| cleaning_error(file, variant, e))
        });
    (variant, cleaned)
}

fn cleaning_error(file: &str, variant: Variant, e: CleanError) -> ReportError {
    ReportError::Cleaning {
        file: file.to_string(),
        variant: variant.to_string(),
        detail: e.to_string(),
    }
}

fn prepare_dirs(config: &RunConfig) -> Result<(), AqError> {
    ensure_dir(&config.work_dir)?;
    ensure_dir(&config.images_path())?;
    ensure_dir(&config.data_path())
}

/// `*.pdf` files directly under `dir`, sorted by name.
fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, AqError> {
    let entries = std::fs::read_dir(dir).map_err(|source| AqError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}
