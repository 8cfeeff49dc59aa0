//! Tabular data model shared by every stage.
//!
//! * [`RawTable`]: an irregular grid of optional string cells, as it comes
//!   out of the layout builder, the raw page text or an OCR sheet.
//! * [`CleanedTable`]: a table relabelled to [`CANONICAL_COLUMNS`]; it can
//!   only be constructed with exactly seven columns.
//! * [`FinalDataset`]: the row-wise union of all cleaned tables.

use serde::Serialize;

/// One table cell. `None` is a missing value (an empty PDF cell, an empty
/// sheet field, or padding for a short row).
pub type Cell = Option<String>;

/// The output schema every cleaner converges to.
pub const CANONICAL_COLUMNS: [&str; 7] = [
    "Date",
    "Temperature",
    "Humidity",
    "NO2",
    "SO2",
    "PM2.5",
    "Year",
];

/// Index of the `Date` column.
pub const DATE_COLUMN: usize = 0;

/// Index of the `Year` column.
pub const YEAR_COLUMN: usize = 6;

/// A rectangular grid of cells with the name of the report it came from.
///
/// Rows shorter than the widest row are padded with `None` on construction,
/// so `width()` is the same for every row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    source: String,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Build a table from possibly ragged rows.
    pub fn new(source: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self {
            source: source.into(),
            rows,
        }
    }

    /// Convenience constructor from string literals; empty strings stay empty
    /// strings (use [`RawTable::new`] for explicit `None`s).
    pub fn from_strs(source: impl Into<String>, rows: &[&[&str]]) -> Self {
        Self::new(
            source,
            rows.iter()
                .map(|r| r.iter().map(|s| Some((*s).to_string())).collect())
                .collect(),
        )
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Text of a cell; `None` when missing or out of range.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// `true` when the cell is missing or blank.
    pub fn is_blank(&self, row: usize, col: usize) -> bool {
        self.cell(row, col).map_or(true, |s| s.trim().is_empty())
    }

    /// `true` when the cell exists and contains `needle`.
    pub fn cell_contains(&self, row: usize, col: usize, needle: &str) -> bool {
        self.cell(row, col).is_some_and(|s| s.contains(needle))
    }

    /// Text of the first cell of the last row.
    pub fn last_first_cell(&self) -> Option<&str> {
        self.rows.last()?.first()?.as_deref()
    }

    pub fn remove_row(&mut self, idx: usize) {
        if idx < self.rows.len() {
            self.rows.remove(idx);
        }
    }

    /// Remove several rows given by their current indices.
    pub fn remove_rows(&mut self, indices: &[usize]) {
        let mut idx = 0;
        self.rows.retain(|_| {
            let keep = !indices.contains(&idx);
            idx += 1;
            keep
        });
    }

    pub fn pop_row(&mut self) -> Option<Vec<Cell>> {
        self.rows.pop()
    }

    pub fn truncate_columns(&mut self, width: usize) {
        for row in &mut self.rows {
            row.truncate(width);
        }
    }

    pub fn remove_column(&mut self, col: usize) {
        for row in &mut self.rows {
            if col < row.len() {
                row.remove(col);
            }
        }
    }

    /// Append a column holding `value` in every row.
    pub fn push_constant_column(&mut self, value: &str) {
        for row in &mut self.rows {
            row.push(Some(value.to_string()));
        }
    }

    /// Drop every column whose cells are all missing.
    pub fn drop_empty_columns(&mut self) {
        let width = self.width();
        let keep: Vec<bool> = (0..width)
            .map(|c| self.rows.iter().any(|row| row[c].is_some()))
            .collect();
        for row in &mut self.rows {
            let mut c = 0;
            row.retain(|_| {
                let k = keep[c];
                c += 1;
                k
            });
        }
    }

    /// Turn empty-string cells into missing cells.
    pub fn blank_to_missing(&mut self) {
        for cell in self.rows.iter_mut().flatten() {
            if cell.as_deref() == Some("") {
                *cell = None;
            }
        }
    }
}

/// The layout variant that produced a cleaned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Variant {
    /// Cleaner A: table extraction yielded exactly six columns.
    ReadableText,
    /// Cleaner B: table extraction yielded more than six columns.
    OverWideText,
    /// Cleaner C: table extraction yielded fewer than six columns.
    UnderWideText,
    /// Cleaner D: table recovered from a scanned image by OCR.
    OcrSpreadsheet,
}

impl Variant {
    pub fn label(self) -> &'static str {
        match self {
            Variant::ReadableText => "readable",
            Variant::OverWideText => "over-wide",
            Variant::UnderWideText => "under-wide",
            Variant::OcrSpreadsheet => "ocr-sheet",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A table relabelled to the canonical seven columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    /// Report stem (file name without extension), used for the per-report CSV.
    pub name: String,
    pub variant: Variant,
    rows: Vec<[Cell; 7]>,
}

impl CleanedTable {
    /// Relabel `table` to the canonical columns. Fails with the observed
    /// width when it is not exactly seven.
    pub fn relabel(
        name: impl Into<String>,
        variant: Variant,
        table: RawTable,
    ) -> Result<Self, usize> {
        if table.width() != CANONICAL_COLUMNS.len() {
            return Err(table.width());
        }
        let rows = table
            .into_rows()
            .into_iter()
            .map(|row| {
                let mut it = row.into_iter();
                std::array::from_fn(|_| it.next().flatten())
            })
            .collect();
        Ok(Self {
            name: name.into(),
            variant,
            rows,
        })
    }

    pub fn columns(&self) -> [&'static str; 7] {
        CANONICAL_COLUMNS
    }

    pub fn rows(&self) -> &[[Cell; 7]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Date column values in row order.
    pub fn dates(&self) -> impl Iterator<Item = Option<&str>> {
        self.rows.iter().map(|r| r[DATE_COLUMN].as_deref())
    }
}

/// Row-wise union of every cleaned table, Year column included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalDataset {
    rows: Vec<[Cell; 7]>,
}

impl FinalDataset {
    /// Concatenate tables in the order given.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a CleanedTable>) -> Self {
        Self {
            rows: tables
                .into_iter()
                .flat_map(|t| t.rows.iter().cloned())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[[Cell; 7]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewrite every present Date cell with `f`.
    pub fn map_dates(&mut self, f: impl Fn(&str) -> String) {
        for row in &mut self.rows {
            if let Some(date) = row[DATE_COLUMN].as_mut() {
                *date = f(date);
            }
        }
    }
}
