//! Error types for the aqreports library.
//!
//! Two error types for two failure scopes:
//!
//! * [`AqError`] is **fatal**: the run cannot proceed at all (listing page
//!   unreachable, pdfium missing, bad configuration). Returned as
//!   `Err(AqError)` from the top-level `run*` functions.
//!
//! * [`ReportError`] is **non-fatal**: one report failed somewhere between
//!   download and cleaning. Stored inside [`crate::output::ReportOutcome`]
//!   and the batch carries on with the next report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the aqreports library.
#[derive(Debug, Error)]
pub enum AqError {
    // ── Harvest errors ────────────────────────────────────────────────────
    /// The listing page could not be fetched.
    #[error("Failed to fetch listing page '{url}': {reason}")]
    ListingFetchFailed { url: String, reason: String },

    /// A configured URL does not parse.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or pass --pdfium-lib."
    )]
    PdfiumBindingFailed(String),

    /// The VLM OCR backend was selected but no provider could be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create a directory or write the final dataset.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No report produced a cleaned table.
    #[error("All {total} reports failed.\nFirst error: {first_error}")]
    AllReportsFailed { total: usize, first_error: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single report.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ReportError {
    /// The link's trailing segment is not a `<name>.pdf` file name.
    #[error("Link '{link}' does not end in a PDF file name")]
    BadLink { link: String },

    /// HTTP download of the report failed.
    #[error("{file}: download from '{url}' failed: {detail}")]
    Download {
        file: String,
        url: String,
        detail: String,
    },

    /// pdfium could not open the PDF or read page 1.
    #[error("{file}: PDF could not be read: {detail}")]
    Pdf { file: String, detail: String },

    /// The embedded page image could not be decoded or saved.
    #[error("{file}: image extraction failed: {detail}")]
    Image { file: String, detail: String },

    /// The OCR service call failed or returned an unusable reply.
    #[error("{file}: OCR failed: {detail}")]
    Ocr { file: String, detail: String },

    /// An image report was found but no OCR backend is usable.
    #[error("{file}: no OCR backend configured for a table-as-image report")]
    OcrUnavailable { file: String },

    /// The file name carries no digits to derive a year from.
    #[error("{file}: no year found in file name")]
    MissingYear { file: String },

    /// A cleaner rejected the extracted table.
    #[error("{file}: {variant} cleaning failed: {detail}")]
    Cleaning {
        file: String,
        variant: String,
        detail: String,
    },

    /// Writing the per-report CSV failed.
    #[error("{file}: writing '{path}' failed: {detail}")]
    Write {
        file: String,
        path: String,
        detail: String,
    },
}

impl ReportError {
    /// Name of the report this error belongs to.
    pub fn file(&self) -> &str {
        match self {
            ReportError::BadLink { link } => link,
            ReportError::Download { file, .. }
            | ReportError::Pdf { file, .. }
            | ReportError::Image { file, .. }
            | ReportError::Ocr { file, .. }
            | ReportError::OcrUnavailable { file }
            | ReportError::MissingYear { file }
            | ReportError::Cleaning { file, .. }
            | ReportError::Write { file, .. } => file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_reports_failed_display() {
        let e = AqError::AllReportsFailed {
            total: 12,
            first_error: "Jan2020.pdf: PDF could not be read".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("12"), "got: {msg}");
        assert!(msg.contains("Jan2020.pdf"));
    }

    #[test]
    fn cleaning_error_names_variant() {
        let e = ReportError::Cleaning {
            file: "March2021.pdf".into(),
            variant: "readable".into(),
            detail: "no row contains month 'Mar'".into(),
        };
        assert!(e.to_string().contains("readable cleaning failed"));
        assert_eq!(e.file(), "March2021.pdf");
    }

    #[test]
    fn bad_link_reports_link_as_file() {
        let e = ReportError::BadLink {
            link: "/Detail/abc".into(),
        };
        assert_eq!(e.file(), "/Detail/abc");
    }

    #[test]
    fn report_error_serialises() {
        let e = ReportError::MissingYear {
            file: "report.pdf".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("MissingYear"));
    }
}
