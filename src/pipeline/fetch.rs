//! Report download: link → file name → absolute URL → local PDF.

use crate::error::ReportError;
use crate::report::Report;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use std::path::Path;
use tracing::{debug, info};

static RE_PDF_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^/]+)\.pdf$").unwrap());

/// The trailing `<name>.pdf` segment of a link.
pub fn pdf_file_name(link: &str) -> Result<String, ReportError> {
    RE_PDF_NAME
        .find(link)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ReportError::BadLink {
            link: link.to_string(),
        })
}

/// Resolve a site-relative link against the origin.
///
/// Absolute links are returned unchanged.
pub fn resolve_url(origin: &str, link: &str) -> Result<Url, ReportError> {
    let bad = || ReportError::BadLink {
        link: link.to_string(),
    };
    let base = Url::parse(origin).map_err(|_| bad())?;
    base.join(link).map_err(|_| bad())
}

/// Download one report into `dest_dir`, named after the link.
pub async fn download_report(
    client: &Client,
    origin: &str,
    link: &str,
    dest_dir: &Path,
) -> Result<Report, ReportError> {
    let file_name = pdf_file_name(link)?;
    let url = resolve_url(origin, link)?;

    let fail = |detail: String| ReportError::Download {
        file: file_name.clone(),
        url: url.to_string(),
        detail,
    };

    info!("Downloading {}", url);
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;

    let path = dest_dir.join(&file_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| fail(format!("writing {}: {}", path.display(), e)))?;
    debug!("Saved {} bytes to {}", bytes.len(), path.display());

    Ok(Report {
        file_name,
        path,
        url: Some(url.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_trailing_segment() {
        assert_eq!(
            pdf_file_name("/SiteImage/Misc/files/AQ/Jan2020.pdf").unwrap(),
            "Jan2020.pdf"
        );
        assert_eq!(pdf_file_name("Feb 2021.pdf").unwrap(), "Feb 2021.pdf");
    }

    #[test]
    fn link_without_pdf_tail_is_bad() {
        let err = pdf_file_name("/files/Jan2020.pdf?download=1").unwrap_err();
        assert!(matches!(err, ReportError::BadLink { .. }));
        assert!(pdf_file_name("/files/").is_err());
    }

    #[test]
    fn relative_link_is_prefixed_with_origin() {
        let url = resolve_url("https://environment.gov.pk", "/files/AQ/Jan2020.pdf").unwrap();
        assert_eq!(url.as_str(), "https://environment.gov.pk/files/AQ/Jan2020.pdf");
    }

    #[test]
    fn absolute_link_is_kept() {
        let url = resolve_url("https://environment.gov.pk", "https://cdn.example.org/a.pdf").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/a.pdf");
    }
}
