//! Results of a run: the final dataset, per-report outcomes and summary stats.

use crate::error::ReportError;
use crate::report::{LayoutKind, ReportEntry};
use crate::table::{FinalDataset, Variant};
use serde::Serialize;
use std::path::PathBuf;

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Concatenated, date-normalised dataset as written to `final_csv`.
    pub dataset: FinalDataset,
    /// One outcome per report, in discovery order.
    pub reports: Vec<ReportOutcome>,
    pub summary: RunSummary,
    /// Path of `final_data.csv`.
    pub final_csv: PathBuf,
}

/// What happened to one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub file_name: String,
    pub url: Option<String>,
    pub layout: Option<LayoutKind>,
    pub variant: Option<Variant>,
    /// Rows of the cleaned table; 0 when the report failed.
    pub rows: usize,
    /// Per-report CSV, when written.
    pub csv: Option<PathBuf>,
    pub error: Option<ReportError>,
}

impl ReportOutcome {
    pub fn from_entry(entry: &ReportEntry, rows: usize) -> Self {
        Self {
            file_name: entry.report.file_name.clone(),
            url: entry.report.url.clone(),
            layout: entry.layout,
            variant: entry.variant,
            rows,
            csv: entry.artifacts.csv.clone(),
            error: entry.error.clone(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Distinct PDF links on the listing page (0 for local runs).
    pub links_found: usize,
    /// Links removed by the block list.
    pub links_blocked: usize,
    /// Links skipped because an earlier link had the same file name.
    pub links_duplicate: usize,
    /// Reports downloaded (or found locally).
    pub reports: usize,
    pub text_tables: usize,
    pub image_tables: usize,
    pub readable: usize,
    pub over_wide: usize,
    pub under_wide: usize,
    pub ocr_sheets: usize,
    /// Reports that produced a cleaned table and CSV.
    pub cleaned: usize,
    pub failed: usize,
    /// Rows in `final_data.csv`.
    pub rows_written: usize,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Report;

    #[test]
    fn outcome_copies_entry() {
        let mut entry = ReportEntry::new(Report::local("/w/Jan2020.pdf"));
        entry.layout = Some(LayoutKind::TextTable);
        entry.variant = Some(Variant::ReadableText);
        entry.artifacts.csv = Some(PathBuf::from("/w/extracted_data/Jan2020.csv"));

        let o = ReportOutcome::from_entry(&entry, 31);
        assert!(o.succeeded());
        assert_eq!(o.rows, 31);
        assert_eq!(o.file_name, "Jan2020.pdf");
    }

    #[test]
    fn summary_serialises() {
        let s = RunSummary {
            cleaned: 3,
            failed: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["cleaned"], 3);
        assert_eq!(json["failed"], 1);
    }
}
