//! Layout classification and page-image extraction.

use crate::error::ReportError;
use crate::pipeline::pdf::PageScan;
use crate::report::{LayoutKind, Report};
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Classify a scanned page by its embedded images.
pub fn classify(scan: &PageScan) -> LayoutKind {
    LayoutKind::from_image_count(scan.image_count)
}

/// Save the first page image as `<images_dir>/<stem>.png`.
pub async fn save_page_image(
    report: &Report,
    image: DynamicImage,
    images_dir: &Path,
) -> Result<PathBuf, ReportError> {
    let path = images_dir.join(format!("{}.png", report.stem()));
    let file = report.file_name.clone();
    let target = path.clone();

    tokio::task::spawn_blocking(move || image.save_with_format(&target, ImageFormat::Png))
        .await
        .map_err(|e| ReportError::Image {
            file: file.clone(),
            detail: format!("save task panicked: {}", e),
        })?
        .map_err(|e| ReportError::Image {
            file,
            detail: format!("{}: {}", path.display(), e),
        })?;

    debug!("Saved page image {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn image_count_decides_layout() {
        let mut scan = PageScan::default();
        assert_eq!(classify(&scan), LayoutKind::TextTable);
        scan.image_count = 2;
        assert_eq!(classify(&scan), LayoutKind::ImageTable);
    }

    #[tokio::test]
    async fn page_image_is_named_after_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::local(dir.path().join("AQ_Feb2021.pdf"));
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 3));

        let path = save_page_image(&report, image, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("AQ_Feb2021.png"));
        let reread = image::open(&path).unwrap();
        assert_eq!((reread.width(), reread.height()), (4, 3));
    }

    #[tokio::test]
    async fn unwritable_dir_is_image_error() {
        let report = Report::local("x2020.pdf");
        let image = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        let err = save_page_image(&report, image, Path::new("/nonexistent/dir"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Image { .. }));
    }
}
