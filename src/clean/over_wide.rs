//! Cleaner B: reports the layout builder read as more than six columns.
//!
//! The page text is used instead. Each line splits into fields of which the
//! first six are kept; the month is the first letter of the first Date cell.

use super::{probe_month, split_on_spaces, trim_trailing_until, CleanError, MonthProbe};
use crate::table::RawTable;

const KEPT_FIELDS: usize = 6;

/// Clean page-text lines and append the Year column.
pub fn clean(lines: RawTable, year: &str) -> Result<RawTable, CleanError> {
    let mut table = split_on_spaces(&lines);
    table.truncate_columns(KEPT_FIELDS);
    table.push_constant_column(year);

    let month = probe_month(&table, 0, MonthProbe::Letter)?;
    trim_trailing_until(&mut table, &month)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> RawTable {
        RawTable::new(
            "Apr2021.pdf",
            text.iter().map(|l| vec![Some(l.to_string())]).collect(),
        )
    }

    #[test]
    fn keeps_six_fields_and_trims_footer() {
        let t = lines(&[
            "01-Apr-21 31 40 12 3 55 (µg/m3) extra",
            "02-Apr-21 32 41 13 4 56 x",
            "03-Apr-21 33 42 14 5 57",
            "Mean 32 41 13 4 56",
            "NEQS - - 80 120 35",
        ]);
        let out = clean(t, "2021").unwrap();
        assert_eq!(out.width(), 7);
        assert_eq!(out.len(), 3);
        assert_eq!(out.cell(0, 5), Some("55"));
        assert_eq!(out.cell(2, 6), Some("2021"));
    }

    #[test]
    fn month_is_first_letter_only() {
        // 'A' also matches "Average", which is therefore kept.
        let t = lines(&["01-Apr-21 1 2 3 4 5", "Average 1 2 3 4 5", "Max 1 2 3 4 5"]);
        let out = clean(t, "2021").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.cell(1, 0), Some("Average"));
    }

    #[test]
    fn numeric_first_cell_fails() {
        let t = lines(&["2021 1 2 3 4 5"]);
        assert_eq!(clean(t, "2021").unwrap_err(), CleanError::MonthProbe { row: 0 });
    }
}
