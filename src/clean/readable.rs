//! Cleaner A: tables the layout builder read as exactly six columns.
//!
//! Three header layouts occur in these reports. The layout is detected first
//! and carries its header rows, month-probe row and footer rule as data.

use super::{probe_month, trim_trailing_until, CleanError, MonthProbe};
use crate::table::{RawTable, DATE_COLUMN};
use tracing::debug;

/// Which header the table starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPattern {
    /// Blank first cell; optional `Date` and `NEQS` rows below it.
    BlankTitle,
    /// `Date` caption in the first cell; optional `NEQS` and `Value` rows.
    DateCaption,
    /// Anything else: two header rows.
    TwoRowHeader,
}

/// Where the header ends and how the footer is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    pub pattern: HeaderPattern,
    /// Row (after header removal) whose Date cell names the month.
    pub month_probe: usize,
    /// Drop one trailing row before trimming to the month.
    pub drops_footer: bool,
}

impl HeaderLayout {
    pub fn detect(table: &RawTable) -> Self {
        if table.is_blank(0, DATE_COLUMN) {
            HeaderLayout {
                pattern: HeaderPattern::BlankTitle,
                month_probe: 7,
                drops_footer: false,
            }
        } else if table.cell(0, DATE_COLUMN) == Some("Date") {
            HeaderLayout {
                pattern: HeaderPattern::DateCaption,
                month_probe: 5,
                drops_footer: true,
            }
        } else {
            HeaderLayout {
                pattern: HeaderPattern::TwoRowHeader,
                month_probe: 5,
                drops_footer: true,
            }
        }
    }

    /// Header rows to remove, as positions in the uncleaned table.
    pub fn header_rows(&self, table: &RawTable) -> Vec<usize> {
        let mut rows = vec![0];
        match self.pattern {
            HeaderPattern::BlankTitle => {
                if table.cell(1, DATE_COLUMN) == Some("Date") {
                    rows.push(1);
                }
                if table.cell_contains(2, DATE_COLUMN, "NEQS") {
                    rows.push(2);
                }
            }
            HeaderPattern::DateCaption => {
                if table.cell_contains(1, DATE_COLUMN, "NEQS") {
                    rows.push(1);
                }
                if table.cell_contains(2, DATE_COLUMN, "Value") {
                    rows.push(2);
                }
            }
            HeaderPattern::TwoRowHeader => rows.push(1),
        }
        rows
    }
}

/// Clean a six-column grid and append the Year column.
pub fn clean(mut table: RawTable, year: &str) -> Result<RawTable, CleanError> {
    let layout = HeaderLayout::detect(&table);
    let header = layout.header_rows(&table);
    debug!(
        "{}: {:?} header, removing rows {:?}",
        table.source(),
        layout.pattern,
        header
    );

    table.push_constant_column(year);
    table.remove_rows(&header);

    let month = probe_month(&table, layout.month_probe, MonthProbe::Word)?;
    if layout.drops_footer {
        table.pop_row();
    }
    trim_trailing_until(&mut table, &month)?;
    Ok(table)
}
