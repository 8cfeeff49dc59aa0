//! Cleaner C: reports the layout builder read as fewer than six columns.
//!
//! Works on page-text lines. Rows are trimmed while each row is still one
//! line of text, from the front this time, and only then split into fields.
//! Split rows come in three widths:
//!
//! * up to six fields: kept as they are
//! * seven fields: the seventh is a stray token and is dropped
//! * more: the value columns were split in two and are merged pairwise,
//!   (2,3) → Humidity, (4,5) → NO2, (6,7) → SO2, (8,9) → PM2.5

use super::{probe_month, split_on_spaces, trim_leading_until, CleanError, MonthProbe};
use crate::table::{Cell, RawTable};
use tracing::debug;

/// Row the month letter is read from after the caption and footer are gone.
const MONTH_PROBE_ROW: usize = 7;

/// Field pairs merged into Humidity, NO2, SO2 and PM2.5.
const MERGED_PAIRS: [(usize, usize); 4] = [(2, 3), (4, 5), (6, 7), (8, 9)];

/// Clean page-text lines and append the Year column.
pub fn clean(mut lines: RawTable, year: &str) -> Result<RawTable, CleanError> {
    lines.remove_row(0);
    lines.pop_row();

    let month = probe_month(&lines, MONTH_PROBE_ROW, MonthProbe::Letter)?;
    trim_leading_until(&mut lines, &month)?;

    let mut table = split_on_spaces(&lines);
    debug!("{}: {} fields after split", table.source(), table.width());
    match table.width() {
        7 => table.remove_column(6),
        w if w > 7 => table = merge_split_columns(table),
        _ => {}
    }

    table.push_constant_column(year);
    Ok(table)
}

/// Concatenate two fields; missing if either side is missing.
fn concat(a: &Cell, b: &Cell) -> Cell {
    match (a, b) {
        (Some(a), Some(b)) => Some(format!("{a}{b}")),
        _ => None,
    }
}

/// Apply the pairwise merge to rows wider than seven fields.
///
/// Unmerged fields keep their order ahead of the merged ones; empty fields
/// become missing and columns left entirely missing are dropped.
pub fn merge_split_columns(table: RawTable) -> RawTable {
    let source = table.source().to_string();
    let merged_away: Vec<usize> = MERGED_PAIRS.iter().flat_map(|&(a, b)| [a, b]).collect();

    let rows = table
        .into_rows()
        .into_iter()
        .map(|row| {
            let field = |i: usize| row.get(i).cloned().flatten();
            let mut out: Vec<Cell> = row
                .iter()
                .enumerate()
                .filter(|(i, _)| !merged_away.contains(i))
                .map(|(_, c)| c.clone())
                .collect();
            out.extend(
                MERGED_PAIRS
                    .iter()
                    .map(|&(a, b)| concat(&field(a), &field(b))),
            );
            out
        })
        .collect();

    let mut table = RawTable::new(source, rows);
    table.blank_to_missing();
    table.drop_empty_columns();
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> RawTable {
        RawTable::new(
            "Jun2020.pdf",
            text.iter().map(|l| vec![Some(l.to_string())]).collect(),
        )
    }

    fn report(data: &[&str]) -> RawTable {
        let mut text = vec!["Ambient Air Quality Lahore", "Date Temp Hum NO2 SO2 PM2.5", "units"];
        text.extend_from_slice(data);
        text.push("Source: EPA");
        lines(&text)
    }

    #[test]
    fn six_fields_pass_through() {
        let data: Vec<String> = (1..=9).map(|d| format!("{d:02}-Jun 30 40 12 3 55")).collect();
        let data: Vec<&str> = data.iter().map(String::as_str).collect();
        let out = clean(report(&data), "2020").unwrap();
        // Header rows without 'J' are trimmed from the front; the footer is gone.
        assert_eq!(out.len(), 9);
        assert_eq!(out.width(), 7);
        assert_eq!(out.cell(0, 0), Some("01-Jun"));
        assert_eq!(out.cell(8, 6), Some("2020"));
    }

    #[test]
    fn seventh_field_is_dropped() {
        let data: Vec<String> = (1..=9).map(|d| format!("{d:02}-Jun 30 40 12 3 55 *")).collect();
        let data: Vec<&str> = data.iter().map(String::as_str).collect();
        let out = clean(report(&data), "2020").unwrap();
        assert_eq!(out.width(), 7);
        assert_eq!(out.cell(0, 5), Some("55"));
        assert_eq!(out.cell(0, 6), Some("2020"));
    }

    #[test]
    fn ten_fields_merge_pairwise() {
        let t = RawTable::from_strs(
            "x",
            &[&["01-Jun", "30", "4", "0", "1", "2", "", "3", "5", "5"]],
        );
        let out = merge_split_columns(t);
        assert_eq!(out.width(), 6);
        assert_eq!(
            out.rows()[0],
            vec![
                Some("01-Jun".to_string()),
                Some("30".to_string()),
                Some("40".to_string()),
                Some("12".to_string()),
                Some("3".to_string()),
                Some("55".to_string()),
            ]
        );
    }

    #[test]
    fn ten_field_rows_clean_to_seven_columns() {
        let data: Vec<String> = (1..=9).map(|d| format!("{d:02}-Jun 30 4 0 1 2 0 3 5 5")).collect();
        let data: Vec<&str> = data.iter().map(String::as_str).collect();
        let out = clean(report(&data), "2020").unwrap();
        assert_eq!(out.width(), 7);
        assert_eq!(out.cell(3, 4), Some("03"));
        assert_eq!(out.cell(3, 6), Some("2020"));
    }

    #[test]
    fn eight_fields_leave_missing_merges() {
        let t = RawTable::from_strs("x", &[&["01-Jun", "30", "4", "0", "1", "2", "0", "3"]]);
        let out = merge_split_columns(t);
        // PM2.5 has no sources and its column is dropped entirely.
        assert_eq!(out.width(), 5);
        assert_eq!(out.cell(0, 4), Some("03"));
    }

    #[test]
    fn no_month_row_fails() {
        let err = clean(report(&["01-Jun 1 2 3 4 5"]), "2020").unwrap_err();
        assert_eq!(err, CleanError::MonthProbe { row: MONTH_PROBE_ROW });
    }
}
