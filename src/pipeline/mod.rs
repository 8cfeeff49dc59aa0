//! Pipeline stages for turning report PDFs into readings tables.
//!
//! Each submodule implements one step. The orchestration (ordering, fault
//! isolation, manifest bookkeeping) lives in [`crate::run`].
//!
//! ## Data Flow
//!
//! ```text
//! harvest ──▶ fetch ──▶ pdf ──▶ classify ─┬─▶ layout / text_table ──▶ clean A/B/C ─┐
//! (listing)   (HTTP)   (pdfium)  (images)  └─▶ encode ──▶ ocr ──▶ sheet ──▶ clean D ─┴─▶ dates ──▶ write
//! ```
//!
//! 1. [`harvest`]: collect `.pdf` anchors from the listing page, apply the block list
//! 2. [`fetch`]: download each kept report into the work directory
//! 3. [`pdf`]: open page 1 with pdfium in `spawn_blocking`: images, glyphs, text
//! 4. [`classify`]: text-table vs. image-table; saves the page image as PNG
//! 5. [`layout`]: group glyphs into words, lines and a column grid
//! 6. [`text_table`]: bucket the grid width, pick grid or page-text rows
//! 7. [`encode`]: PNG/base64 for the OCR request bodies
//! 8. [`ocr`]: Cloud Vision or VLM transcription, written as a sheet
//! 9. [`dates`]: the Date column normaliser
//! 10. [`write`]: per-report CSVs and `final_data.csv`

pub mod classify;
pub mod dates;
pub mod encode;
pub mod fetch;
pub mod harvest;
pub mod layout;
pub mod ocr;
pub mod pdf;
pub mod text_table;
pub mod write;
