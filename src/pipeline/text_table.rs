//! Text-table extraction and column-count bucketing.
//!
//! A table-as-text report is first laid out as a grid. Exactly six columns
//! means the grid is usable as-is; anything else sends the report to a
//! raw-text cleaner instead, which starts again from the page text.

use crate::pipeline::layout::{grid_from_glyphs, Glyph};
use crate::table::{RawTable, Variant};
use once_cell::sync::Lazy;
use regex::Regex;

/// Data columns a well-read report table has.
pub const EXPECTED_COLUMNS: usize = 6;

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Year of a report: the first run of digits in its file name.
pub fn extract_year(file_name: &str) -> Option<&str> {
    RE_DIGITS.find(file_name).map(|m| m.as_str())
}

/// Text-table bucket by observed column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Fewer than six columns.
    UnderWide,
    /// Exactly six columns.
    Readable,
    /// More than six columns.
    OverWide,
}

impl Bucket {
    pub fn from_width(width: usize) -> Self {
        match width.cmp(&EXPECTED_COLUMNS) {
            std::cmp::Ordering::Less => Bucket::UnderWide,
            std::cmp::Ordering::Equal => Bucket::Readable,
            std::cmp::Ordering::Greater => Bucket::OverWide,
        }
    }

    /// The cleaner that handles this bucket.
    pub fn variant(self) -> Variant {
        match self {
            Bucket::Readable => Variant::ReadableText,
            Bucket::OverWide => Variant::OverWideText,
            Bucket::UnderWide => Variant::UnderWideText,
        }
    }
}

/// Lay out page glyphs as a table, no header row assumed.
pub fn extract_table(source: &str, glyphs: &[Glyph]) -> RawTable {
    RawTable::new(source, grid_from_glyphs(glyphs))
}

/// Page text as a one-column table, one line per row.
///
/// Blank lines are skipped and the first remaining line is consumed as the
/// column caption.
pub fn text_lines(source: &str, text: &str) -> RawTable {
    let rows = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .skip(1)
        .map(|l| vec![Some(l.to_string())])
        .collect();
    RawTable::new(source, rows)
}
