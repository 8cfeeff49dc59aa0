//! Reports and the per-run manifest.
//!
//! The manifest is built once per run and records, for every report, the
//! artifacts derived from it. Later stages read artifacts from the manifest
//! rather than re-listing directories, so files left over from an earlier run
//! are never swept into the current one.

use crate::error::ReportError;
use crate::table::Variant;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One downloaded PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// File name derived from the link, e.g. `AQ_Jan2020.pdf`.
    pub file_name: String,
    /// Local path of the PDF.
    pub path: PathBuf,
    /// Absolute URL it was downloaded from; `None` for local runs.
    pub url: Option<String>,
}

impl Report {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_name,
            path,
            url: None,
        }
    }

    /// File name with its `.pdf` extension removed.
    pub fn stem(&self) -> &str {
        strip_extension(&self.file_name)
    }
}

/// Strip the last `.ext` from a file name.
pub fn strip_extension(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// How page 1 stores its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutKind {
    /// No embedded raster on page 1: the table is native PDF text.
    TextTable,
    /// At least one embedded raster on page 1: the table is a scan.
    ImageTable,
}

impl LayoutKind {
    pub fn from_image_count(images: usize) -> Self {
        if images == 0 {
            LayoutKind::TextTable
        } else {
            LayoutKind::ImageTable
        }
    }
}

/// Files derived from one report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    /// PNG extracted from an image report.
    pub image: Option<PathBuf>,
    /// OCR sheet written for an image report.
    pub sheet: Option<PathBuf>,
    /// Per-report cleaned CSV.
    pub csv: Option<PathBuf>,
}

/// Manifest entry for one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub report: Report,
    pub layout: Option<LayoutKind>,
    pub variant: Option<Variant>,
    pub artifacts: Artifacts,
    pub error: Option<ReportError>,
}

impl ReportEntry {
    pub fn new(report: Report) -> Self {
        Self {
            report,
            layout: None,
            variant: None,
            artifacts: Artifacts::default(),
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// All reports of the current run, in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Manifest {
    entries: Vec<ReportEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a report and return its index.
    pub fn push(&mut self, report: Report) -> usize {
        self.entries.push(ReportEntry::new(report));
        self.entries.len() - 1
    }

    /// Record a report that failed before it could be added (e.g. bad link).
    pub fn push_failed(&mut self, report: Report, error: ReportError) -> usize {
        let idx = self.push(report);
        self.entries[idx].error = Some(error);
        idx
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn get(&self, idx: usize) -> Option<&ReportEntry> {
        self.entries.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut ReportEntry> {
        self.entries.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// OCR sheets produced in this run, with their entry index.
    pub fn sheets(&self) -> impl Iterator<Item = (usize, &Path)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.artifacts.sheet.as_deref().map(|p| (i, p)))
    }

    pub fn count_layout(&self, kind: LayoutKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.layout == Some(kind))
            .count()
    }

    pub fn count_variant(&self, variant: Variant) -> usize {
        self.entries
            .iter()
            .filter(|e| e.variant == Some(variant))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportError> {
        self.entries.iter().filter_map(|e| e.error.as_ref())
    }
}
