//! Page-1 scan via pdfium: embedded images, positioned glyphs and raw text.
//!
//! Every later PDF stage (layout classification, image extraction, table
//! reconstruction, raw-text cleaners) works off one [`PageScan`], so each
//! report is opened exactly once.
//!
//! pdfium is not async-safe; the scan runs inside `spawn_blocking`.

use crate::error::{AqError, ReportError};
use crate::pipeline::layout::Glyph;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Everything the pipeline needs from page 1 of a report.
#[derive(Debug, Default)]
pub struct PageScan {
    /// Number of image objects on the page, including those inside form objects.
    pub image_count: usize,
    /// Decoded raster of the first image object, if any.
    pub first_image: Option<DynamicImage>,
    /// Characters with their bounds, in content order.
    pub glyphs: Vec<Glyph>,
    /// pdfium's full text of the page.
    pub text: String,
}

/// Bind to libpdfium: explicit path, then `PDFIUM_LIB_PATH`, then the
/// working directory, then the system library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, AqError> {
    let explicit = lib_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    if let Some(path) = explicit {
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        return Pdfium::bind_to_library(&lib)
            .map(Pdfium::new)
            .map_err(|e| AqError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e)));
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| AqError::PdfiumBindingFailed(format!("{:?}", e)))
}

/// Scan page 1 of `pdf_path`.
pub async fn scan_first_page(
    pdf_path: &Path,
    lib_path: Option<&Path>,
) -> Result<PageScan, ReportError> {
    let path = pdf_path.to_path_buf();
    let lib = lib_path.map(Path::to_path_buf);
    let file = file_label(pdf_path);

    tokio::task::spawn_blocking(move || scan_first_page_blocking(&path, lib.as_deref()))
        .await
        .map_err(|e| ReportError::Pdf {
            file,
            detail: format!("scan task panicked: {}", e),
        })?
}

fn scan_first_page_blocking(
    pdf_path: &Path,
    lib_path: Option<&Path>,
) -> Result<PageScan, ReportError> {
    let file = file_label(pdf_path);
    let fail = |detail: String| ReportError::Pdf {
        file: file.clone(),
        detail,
    };

    let pdfium = bind_pdfium(lib_path).map_err(|e| fail(e.to_string()))?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| fail(format!("{:?}", e)))?;
    let page = document
        .pages()
        .get(0)
        .map_err(|e| fail(format!("page 1: {:?}", e)))?;

    let mut scan = PageScan::default();

    let mut images = Vec::new();
    collect_images(page.objects().iter().collect(), &mut images);
    scan.image_count = images.len();
    if let Some(image) = images.first().and_then(|o| o.as_image_object()) {
        match image.get_raw_image() {
            Ok(raster) => scan.first_image = Some(raster),
            Err(e) => warn!("{}: first image could not be decoded: {:?}", file, e),
        }
    }

    let text = page.text().map_err(|e| fail(format!("text: {:?}", e)))?;
    scan.text = text.all();

    let chars = text.chars();
    scan.glyphs.reserve(chars.len());
    for ch in chars.iter() {
        let Some(value) = ch.unicode_char() else {
            continue;
        };
        if value == '\u{0}' {
            continue;
        }
        let Ok(rect) = ch.tight_bounds().or_else(|_| ch.loose_bounds()) else {
            continue;
        };
        // pdfium's y axis points up; glyphs use a downward axis like images.
        scan.glyphs.push(Glyph {
            ch: value,
            left: rect.left().value,
            right: rect.right().value,
            top: -rect.top().value,
            bottom: -rect.bottom().value,
        });
    }

    debug!(
        "{}: {} images, {} glyphs, {} text bytes",
        file,
        scan.image_count,
        scan.glyphs.len(),
        scan.text.len()
    );
    Ok(scan)
}

// ── Object tree ──────────────────────────────────────────────────────────

/// A page object as seen by the image walk.
trait ObjectNode: Sized {
    fn is_image(&self) -> bool;
    /// Objects nested in a form XObject; empty for anything else.
    fn children(&self) -> Vec<Self>;
}

impl<'a> ObjectNode for PdfPageObject<'a> {
    fn is_image(&self) -> bool {
        self.as_image_object().is_some()
    }

    fn children(&self) -> Vec<Self> {
        match self {
            PdfPageObject::XObjectForm(form) => {
                (0..form.len()).filter_map(|i| form.get(i).ok()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Image objects in content order, descending into form objects.
fn collect_images<N: ObjectNode>(nodes: Vec<N>, images: &mut Vec<N>) {
    for node in nodes {
        if node.is_image() {
            images.push(node);
        } else {
            collect_images(node.children(), images);
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
