//! Image encoding for the OCR backends.
//!
//! Both backends take the page image as a base64 PNG: Cloud Vision as the
//! `image.content` field of its JSON request, the VLM backend as an
//! `ImageData` attachment. PNG keeps scanned digits crisp.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as base64 PNG.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(b64)
}

/// Encode an image as a high-detail VLM attachment.
///
/// `detail: "high"` keeps small table digits legible to tiling models.
pub fn encode_for_vlm(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    Ok(ImageData::new(encode_png_base64(img)?, "image/png").with_detail("high"))
}
