//! Configuration types for a report-harvesting run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. The defaults reproduce the EPA air-quality portal
//! run: listing page, block list, directory names and OCR settings.

use crate::error::AqError;
use crate::progress::ProgressCallback;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Listing page of the monthly air-quality reports.
pub const DEFAULT_LISTING_URL: &str =
    "https://environment.gov.pk/Detail/ZjU5NDM3YjItNTdiOS00NTk5LWExYzUtMjI2NzE5YjdlOGM5";

/// Origin prefixed to the site-relative PDF links.
pub const DEFAULT_SITE_ORIGIN: &str = "https://environment.gov.pk";

/// Link substrings of reports whose year or layout is known to be malformed.
pub const DEFAULT_BLOCK_LIST: &[&str] = &["2018", "May2019", "May23"];

/// Configuration for one run.
///
/// # Example
/// ```rust
/// use aqreports::{OcrBackend, RunConfig};
///
/// let config = RunConfig::builder()
///     .work_dir("/tmp/aq")
///     .block("June2020")
///     .ocr_backend(OcrBackend::Vision)
///     .vision_api_key("AIza...")
///     .build()
///     .unwrap();
/// assert!(config.block_list.iter().any(|b| b == "June2020"));
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Page whose anchors are harvested for report links.
    pub listing_url: String,

    /// Origin used to resolve relative PDF links.
    pub site_origin: String,

    /// A link containing any of these substrings is skipped.
    pub block_list: Vec<String>,

    /// Downloaded PDFs, OCR sheets and the final CSV live here.
    pub work_dir: PathBuf,

    /// Directory (relative to `work_dir` unless absolute) for extracted PNGs.
    pub images_dir: PathBuf,

    /// Directory (relative to `work_dir` unless absolute) for per-report CSVs.
    pub data_dir: PathBuf,

    /// File name of the concatenated dataset inside `work_dir`.
    pub final_csv: String,

    /// HTTP timeout for the listing page and each report download. Default: 120.
    pub download_timeout_secs: u64,

    /// Which OCR service reads table-as-image reports.
    pub ocr_backend: OcrBackend,

    /// Cloud Vision API key. Without it the Vision backend is unavailable and
    /// image reports are recorded as failed.
    pub vision_api_key: Option<String>,

    /// Cloud Vision request timeout in seconds. Default: 15.
    pub ocr_timeout_secs: u64,

    /// VLM chat request timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Minimum OCR word confidence, 0–100. Default: 50.
    pub ocr_min_confidence: u8,

    /// LLM provider name for the VLM backend (e.g. "openai", "mistral").
    pub provider_name: Option<String>,

    /// LLM model identifier for the VLM backend.
    pub model: Option<String>,

    /// Explicit path to libpdfium (file or directory).
    pub pdfium_lib_path: Option<PathBuf>,

    /// Optional per-report progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            block_list: DEFAULT_BLOCK_LIST.iter().map(|s| s.to_string()).collect(),
            work_dir: PathBuf::from("."),
            images_dir: PathBuf::from("extracted_images"),
            data_dir: PathBuf::from("extracted_data"),
            final_csv: "final_data.csv".to_string(),
            download_timeout_secs: 120,
            ocr_backend: OcrBackend::default(),
            vision_api_key: None,
            ocr_timeout_secs: 15,
            api_timeout_secs: 60,
            ocr_min_confidence: 50,
            provider_name: None,
            model: None,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("listing_url", &self.listing_url)
            .field("site_origin", &self.site_origin)
            .field("block_list", &self.block_list)
            .field("work_dir", &self.work_dir)
            .field("images_dir", &self.images_dir)
            .field("data_dir", &self.data_dir)
            .field("final_csv", &self.final_csv)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("ocr_backend", &self.ocr_backend)
            .field(
                "vision_api_key",
                &self.vision_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("ocr_min_confidence", &self.ocr_min_confidence)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RunProgressCallback>"),
            )
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }

    /// Absolute-or-work-dir-relative image directory.
    pub fn images_path(&self) -> PathBuf {
        self.work_dir.join(&self.images_dir)
    }

    /// Absolute-or-work-dir-relative per-report CSV directory.
    pub fn data_path(&self) -> PathBuf {
        self.work_dir.join(&self.data_dir)
    }

    /// Path of `final_data.csv`.
    pub fn final_csv_path(&self) -> PathBuf {
        self.work_dir.join(&self.final_csv)
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn listing_url(mut self, url: impl Into<String>) -> Self {
        self.config.listing_url = url.into();
        self
    }

    pub fn site_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.site_origin = origin.into();
        self
    }

    /// Replace the whole block list.
    pub fn block_list<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.block_list = items.into_iter().map(Into::into).collect();
        self
    }

    /// Add one substring to the block list.
    pub fn block(mut self, item: impl Into<String>) -> Self {
        self.config.block_list.push(item.into());
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn final_csv(mut self, name: impl Into<String>) -> Self {
        self.config.final_csv = name.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.config.ocr_backend = backend;
        self
    }

    pub fn vision_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.vision_api_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn ocr_min_confidence(mut self, pct: u8) -> Self {
        self.config.ocr_min_confidence = pct;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, AqError> {
        let c = &self.config;
        if c.listing_url.trim().is_empty() {
            return Err(AqError::InvalidConfig("listing URL is empty".into()));
        }
        Url::parse(&c.site_origin).map_err(|e| AqError::InvalidUrl {
            url: c.site_origin.clone(),
            reason: e.to_string(),
        })?;
        if c.ocr_min_confidence > 100 {
            return Err(AqError::InvalidConfig(format!(
                "OCR confidence must be 0–100, got {}",
                c.ocr_min_confidence
            )));
        }
        if c.ocr_timeout_secs == 0 {
            return Err(AqError::InvalidConfig("OCR timeout must be ≥ 1s".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(AqError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        if c.final_csv.trim().is_empty() {
            return Err(AqError::InvalidConfig("final CSV name is empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// OCR service used for table-as-image reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrBackend {
    /// Google Cloud Vision text detection, laid out locally into a grid. (default)
    #[default]
    Vision,
    /// A vision-capable LLM asked to transcribe the table as CSV.
    Vlm,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_portal_run() {
        let c = RunConfig::default();
        assert_eq!(c.block_list, vec!["2018", "May2019", "May23"]);
        assert_eq!(c.ocr_timeout_secs, 15);
        assert_eq!(c.api_timeout_secs, 60);
        assert_eq!(c.ocr_min_confidence, 50);
        assert_eq!(c.final_csv_path(), PathBuf::from("./final_data.csv"));
        assert_eq!(c.images_path(), PathBuf::from("./extracted_images"));
    }

    #[test]
    fn builder_rejects_bad_origin() {
        let err = RunConfig::builder().site_origin("not a url").build();
        assert!(matches!(err, Err(AqError::InvalidUrl { .. })));
    }

    #[test]
    fn builder_rejects_confidence_above_100() {
        let err = RunConfig::builder().ocr_min_confidence(101).build();
        assert!(matches!(err, Err(AqError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_zero_api_timeout() {
        let err = RunConfig::builder().api_timeout_secs(0).build();
        assert!(matches!(err, Err(AqError::InvalidConfig(_))));
        let c = RunConfig::builder().api_timeout_secs(90).build().unwrap();
        assert_eq!(c.api_timeout_secs, 90);
    }

    #[test]
    fn empty_api_key_means_none() {
        let c = RunConfig::builder().vision_api_key("").build().unwrap();
        assert!(c.vision_api_key.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = RunConfig::builder()
            .vision_api_key("secret-key")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn absolute_dirs_override_work_dir() {
        let c = RunConfig::builder()
            .work_dir("/data/run")
            .data_dir("/srv/csv")
            .build()
            .unwrap();
        assert_eq!(c.data_path(), PathBuf::from("/srv/csv"));
    }
}
