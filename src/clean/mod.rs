//! Variant cleaners: raw tables → canonical seven-column tables.
//!
//! Every report layout has its own header depth, footer and column quirks.
//! [`Variant`] selects the cleaner:
//!
//! | variant | input | module |
//! |---|---|---|
//! | `ReadableText`   | six-column layout grid        | [`readable`]   |
//! | `OverWideText`   | page text, one line per row   | [`over_wide`]  |
//! | `UnderWideText`  | page text, one line per row   | [`under_wide`] |
//! | `OcrSpreadsheet` | OCR sheet read back from disk | [`sheet`]      |
//!
//! Each cleaner appends the Year column; [`Variant::clean`] then relabels the
//! result, which fails unless exactly seven columns are left.

pub mod over_wide;
pub mod readable;
pub mod sheet;
pub mod under_wide;

use crate::report::strip_extension;
use crate::table::{CleanedTable, RawTable, Variant, DATE_COLUMN};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Why a cleaner rejected a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanError {
    /// The row the month is read from is missing or has no letters.
    #[error("row {row} is missing or has no month letters")]
    MonthProbe { row: usize },

    /// Trimming removed every row without finding the month.
    #[error("no row left whose date contains '{month}'")]
    MonthExhausted { month: String },

    /// The cleaned table does not have the canonical width.
    #[error("expected 7 columns after cleaning, found {found}")]
    ColumnCount { found: usize },

    /// The OCR sheet could not be read.
    #[error("sheet '{path}' unreadable: {detail}")]
    Sheet { path: String, detail: String },

    /// The OCR sheet's name has no `YYYY.<ext>` part.
    #[error("no year in sheet name '{name}'")]
    SheetYear { name: String },
}

impl Variant {
    /// Clean `table` and tag every row with `year`.
    pub fn clean(self, table: RawTable, year: &str) -> Result<CleanedTable, CleanError> {
        let name = strip_extension(table.source()).to_string();
        debug!(
            "Cleaning {} as {} ({}x{})",
            table.source(),
            self,
            table.len(),
            table.width()
        );

        let cleaned = match self {
            Variant::ReadableText => readable::clean(table, year)?,
            Variant::OverWideText => over_wide::clean(table, year)?,
            Variant::UnderWideText => under_wide::clean(table, year)?,
            Variant::OcrSpreadsheet => sheet::clean(table, year)?,
        };

        CleanedTable::relabel(name, self, cleaned).map_err(|found| CleanError::ColumnCount { found })
    }
}

// ── Month probes ─────────────────────────────────────────────────────────

static RE_MONTH_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").unwrap());
static RE_MONTH_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").unwrap());

/// How much of the probed Date cell identifies the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthProbe {
    /// The first run of letters, e.g. `Jan` from `01-Jan-20`.
    Word,
    /// The first letter only.
    Letter,
}

impl MonthProbe {
    fn regex(self) -> &'static Regex {
        match self {
            MonthProbe::Word => &*RE_MONTH_WORD,
            MonthProbe::Letter => &*RE_MONTH_LETTER,
        }
    }
}

/// Read the month marker from the Date cell of `row`.
pub fn probe_month(table: &RawTable, row: usize, probe: MonthProbe) -> Result<String, CleanError> {
    table
        .cell(row, DATE_COLUMN)
        .and_then(|cell| probe.regex().find(cell))
        .map(|m| m.as_str().to_string())
        .ok_or(CleanError::MonthProbe { row })
}

// ── Row trimming ─────────────────────────────────────────────────────────

/// Drop trailing rows until the last Date cell contains `month`.
///
/// A no-op once the last row matches, so it can be re-applied safely.
pub fn trim_trailing_until(table: &mut RawTable, month: &str) -> Result<(), CleanError> {
    loop {
        if table.is_empty() {
            return Err(CleanError::MonthExhausted {
                month: month.to_string(),
            });
        }
        let last = table.len() - 1;
        if table.cell_contains(last, DATE_COLUMN, month) {
            return Ok(());
        }
        table.pop_row();
    }
}

/// Drop leading rows until the first Date cell contains `month`.
pub fn trim_leading_until(table: &mut RawTable, month: &str) -> Result<(), CleanError> {
    loop {
        if table.is_empty() {
            return Err(CleanError::MonthExhausted {
                month: month.to_string(),
            });
        }
        if table.cell_contains(0, DATE_COLUMN, month) {
            return Ok(());
        }
        table.remove_row(0);
    }
}

// ── Line splitting ───────────────────────────────────────────────────────

/// Split each row's first cell on single spaces into fields.
///
/// Consecutive spaces give empty fields; rows are padded to the widest split
/// and a missing first cell gives an all-missing row.
pub fn split_on_spaces(table: &RawTable) -> RawTable {
    let rows = table
        .rows()
        .iter()
        .map(|row| match row.first().and_then(|c| c.as_deref()) {
            Some(line) => line.split(' ').map(|f| Some(f.to_string())).collect(),
            None => vec![None],
        })
        .collect();
    RawTable::new(table.source(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reads_word_or_letter() {
        let t = RawTable::from_strs("t", &[&["01-Jan-20"], &["Total"]]);
        assert_eq!(probe_month(&t, 0, MonthProbe::Word).unwrap(), "Jan");
        assert_eq!(probe_month(&t, 0, MonthProbe::Letter).unwrap(), "J");
        assert_eq!(
            probe_month(&t, 5, MonthProbe::Word),
            Err(CleanError::MonthProbe { row: 5 })
        );
    }

    #[test]
    fn probe_on_digits_only_fails() {
        let t = RawTable::from_strs("t", &[&["2020"]]);
        assert!(probe_month(&t, 0, MonthProbe::Letter).is_err());
    }

    #[test]
    fn trailing_trim_is_idempotent() {
        let mut t = RawTable::from_strs("t", &[&["1-Jan"], &["2-Jan"], &["Average"], &["Max"]]);
        trim_trailing_until(&mut t, "Jan").unwrap();
        assert_eq!(t.len(), 2);
        let before = t.clone();
        trim_trailing_until(&mut t, "Jan").unwrap();
        assert_eq!(t, before);
    }

    #[test]
    fn trailing_trim_skips_missing_cells() {
        let mut t = RawTable::new(
            "t",
            vec![vec![Some("1-Jan".into())], vec![None], vec![Some("".into())]],
        );
        trim_trailing_until(&mut t, "Jan").unwrap();
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn trim_without_match_is_an_error() {
        let mut t = RawTable::from_strs("t", &[&["1-Feb"]]);
        assert_eq!(
            trim_trailing_until(&mut t, "Jan"),
            Err(CleanError::MonthExhausted { month: "Jan".into() })
        );
        let mut t = RawTable::from_strs("t", &[&["1-Feb"]]);
        assert!(trim_leading_until(&mut t, "J").is_err());
    }

    #[test]
    fn leading_trim_stops_at_month() {
        let mut t = RawTable::from_strs("t", &[&["Date Temp"], &["mg/m3"], &["1-Jan 20"]]);
        trim_leading_until(&mut t, "J").unwrap();
        assert_eq!(t.cell(0, 0), Some("1-Jan 20"));
    }

    #[test]
    fn split_keeps_empty_fields() {
        let t = RawTable::new(
            "t",
            vec![
                vec![Some("1-Jan  20 40".into())],
                vec![Some("2-Jan 21".into())],
                vec![None],
            ],
        );
        let s = split_on_spaces(&t);
        assert_eq!(s.width(), 4);
        assert_eq!(s.cell(0, 1), Some(""));
        assert_eq!(s.cell(0, 3), Some("40"));
        assert_eq!(s.cell(1, 2), None);
        assert!(s.rows()[2].iter().all(Option::is_none));
    }

    #[test]
    fn clean_rejects_wrong_width() {
        let t = RawTable::from_strs(
            "Jan2020.pdf",
            &[&["Date Temp"], &["1-Jan 20"], &["2-Jan 21"]],
        );
        let err = Variant::OverWideText.clean(t, "2020").unwrap_err();
        assert_eq!(err, CleanError::ColumnCount { found: 3 });
    }
}
