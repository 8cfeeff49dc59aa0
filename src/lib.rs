//! # aqreports
//!
//! Harvest monthly air-quality reports published as PDFs and normalise their
//! readings tables into one CSV dataset.
//!
//! ## Why this crate?
//!
//! The reports share a subject but not a layout. Some carry a real text
//! table, some a table the layout reader splits into too many or too few
//! columns, and some are a scanned image of the table. Each shape gets its
//! own extraction path and cleaner; all of them end in the same seven
//! columns (`Date, Temperature, Humidity, NO2, SO2, PM2.5, Year`).
//!
//! ## Pipeline Overview
//!
//! ```text
//! listing page
//!  │
//!  ├─ 1. Harvest   .pdf anchors minus the block list
//!  ├─ 2. Fetch     download into the work directory
//!  ├─ 3. Classify  page 1 has no image → text table, else image table
//!  ├─ 4. Extract   layout grid / page text, or OCR into a sheet
//!  ├─ 5. Clean     readable, over-wide, under-wide or OCR-sheet cleaner
//!  ├─ 6. Write     extracted_data/<report>.csv
//!  └─ 7. Combine   dates normalised, final_data.csv
//! ```
//!
//! A report that fails at any stage is recorded and skipped; the run fails
//! only if the listing page is unreachable or nothing could be cleaned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aqreports::{run, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Image-table reports need GOOGLE_VISION_API_KEY (or the VLM backend).
//!     let config = RunConfig::builder().work_dir("reports").build()?;
//!     let output = run(&config).await?;
//!     println!("{} rows → {}", output.dataset.len(), output.final_csv.display());
//!     for outcome in output.reports.iter().filter(|r| !r.succeeded()) {
//!         eprintln!("skipped {}", outcome.file_name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `aqreports` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! aqreports = { version = "0.1", default-features = false }
//! ```
//!
//! ## OCR Backends
//!
//! | Backend | Needs | Notes |
//! |---------|-------|-------|
//! | [`OcrBackend::Vision`] | `GOOGLE_VISION_API_KEY` | Word boxes laid out into a grid locally (default) |
//! | [`OcrBackend::Vlm`] | any edgequake-llm provider key | Model transcribes the table as CSV |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod clean;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod run;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use clean::CleanError;
pub use config::{OcrBackend, RunConfig, RunConfigBuilder};
pub use error::{AqError, ReportError};
pub use output::{ReportOutcome, RunOutput, RunSummary};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use report::{LayoutKind, Manifest, Report, ReportEntry};
pub use run::{process_reports, run, run_local, run_sync, text_report_table};
pub use table::{CleanedTable, FinalDataset, RawTable, Variant, CANONICAL_COLUMNS};
