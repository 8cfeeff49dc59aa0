//! Cleaner D: OCR sheets written for table-as-image reports.
//!
//! Sheets are read back from disk with the second row as header. OCR header
//! noise has no fixed depth, so `NEQS`/`Value` rows are dropped until a data
//! row comes up.

use super::CleanError;
use crate::table::{Cell, CleanedTable, RawTable, Variant, DATE_COLUMN};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static RE_SHEET_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})\.\w+").unwrap());

/// Header-noise markers in the first cell.
const NOISE_MARKERS: [&str; 2] = ["NEQS", "Value"];

/// Year from the `YYYY.<ext>` tail of a sheet name, e.g. `2020` from `Jan2020.csv`.
pub fn year_from_sheet_name(name: &str) -> Option<&str> {
    RE_SHEET_YEAR
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Read a sheet, skipping its first row and its header row.
///
/// Empty fields are missing and fully blank rows are skipped.
pub fn read_sheet(path: &Path) -> Result<RawTable, CleanError> {
    let fail = |detail: String| CleanError::Sheet {
        path: path.display().to_string(),
        detail,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| fail(e.to_string()))?;

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| fail(e.to_string()))?;
        let row: Vec<Cell> = record
            .iter()
            .map(|f| {
                let f = f.trim();
                (!f.is_empty()).then(|| f.to_string())
            })
            .collect();
        if row.iter().any(Option::is_some) {
            rows.push(row);
        }
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(RawTable::new(name, rows.into_iter().skip(2).collect()))
}

/// Clean sheet rows (already past the header) and append the Year column.
pub fn clean(mut table: RawTable, year: &str) -> Result<RawTable, CleanError> {
    table.remove_row(0);
    while NOISE_MARKERS
        .iter()
        .any(|m| table.cell_contains(0, DATE_COLUMN, m))
    {
        table.remove_row(0);
    }
    table.pop_row();
    table.drop_empty_columns();
    table.push_constant_column(year);
    Ok(table)
}

/// Read, date and clean one OCR sheet.
pub fn load(path: &Path) -> Result<CleanedTable, CleanError> {
    let table = read_sheet(path)?;
    let year = year_from_sheet_name(table.source())
        .ok_or_else(|| CleanError::SheetYear {
            name: table.source().to_string(),
        })?
        .to_string();
    Variant::OcrSpreadsheet.clean(table, &year)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
Air Quality Data Jan 2020,,,,,,
Date,Temp,Humidity,NO2,SO2,PM2.5,
(units),C,%,ug/m3,ug/m3,ug/m3,
NEQS,,,80,120,35,
Value,,,,,,
,,,,,,
01-Jan-20,12,70,40,10,80,
02-Jan-20,13,71,41,11,81,
03-Jan-20,14,72,,12,82,
Average,13,71,40,11,81,
";

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn year_needs_four_digits_before_extension() {
        assert_eq!(year_from_sheet_name("AQ_Jan2020.csv"), Some("2020"));
        assert_eq!(year_from_sheet_name("Jan 2020 v2.csv"), None);
        assert_eq!(year_from_sheet_name("Jan20.csv"), None);
    }

    #[test]
    fn read_skips_title_header_and_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let t = read_sheet(&write(dir.path(), "Jan2020.csv", SHEET)).unwrap();
        assert_eq!(t.source(), "Jan2020.csv");
        assert_eq!(t.cell(0, 0), Some("(units)"));
        assert_eq!(t.len(), 7);
        assert_eq!(t.cell(5, 3), None);
    }

    #[test]
    fn load_cleans_to_seven_columns() {
        let dir = tempfile::tempdir().unwrap();
        let cleaned = load(&write(dir.path(), "Jan2020.csv", SHEET)).unwrap();
        assert_eq!(cleaned.name, "Jan2020");
        assert_eq!(cleaned.variant, Variant::OcrSpreadsheet);
        assert_eq!(cleaned.len(), 3);
        let dates: Vec<_> = cleaned.dates().collect();
        assert_eq!(dates, vec![Some("01-Jan-20"), Some("02-Jan-20"), Some("03-Jan-20")]);
        assert_eq!(cleaned.rows()[2][3], None);
        assert_eq!(cleaned.rows()[2][6].as_deref(), Some("2020"));
    }

    #[test]
    fn missing_year_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&write(dir.path(), "January.csv", SHEET)).unwrap_err();
        assert!(matches!(err, CleanError::SheetYear { .. }));
    }

    #[test]
    fn missing_file_is_sheet_error() {
        let err = read_sheet(Path::new("/nonexistent/Jan2020.csv")).unwrap_err();
        assert!(matches!(err, CleanError::Sheet { .. }));
    }
}
