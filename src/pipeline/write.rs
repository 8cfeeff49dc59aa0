//! CSV output: one file per report and the concatenated dataset.
//!
//! Per-report CSVs carry the six data columns; `final_data.csv` adds Year.
//! Missing cells are written as empty fields.

use crate::error::{AqError, ReportError};
use crate::table::{Cell, CleanedTable, FinalDataset, CANONICAL_COLUMNS, YEAR_COLUMN};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

fn write_rows<'a>(
    path: &Path,
    width: usize,
    rows: impl Iterator<Item = &'a [Cell; 7]>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&CANONICAL_COLUMNS[..width])?;
    for row in rows {
        writer.write_record(row[..width].iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `<dir>/<name>.csv` without the Year column.
pub fn write_report_csv(dir: &Path, table: &CleanedTable) -> Result<PathBuf, ReportError> {
    let path = dir.join(format!("{}.csv", table.name));
    write_rows(&path, YEAR_COLUMN, table.rows().iter()).map_err(|e| ReportError::Write {
        file: table.name.clone(),
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    Ok(path)
}

/// Write the concatenated dataset with the Year column.
pub fn write_final_csv(path: &Path, dataset: &FinalDataset) -> Result<(), AqError> {
    write_rows(path, CANONICAL_COLUMNS.len(), dataset.rows().iter()).map_err(|e| {
        AqError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: io::Error::from(e),
        }
    })?;
    info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

/// Create an output directory (and parents) if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), AqError> {
    std::fs::create_dir_all(dir).map_err(|source| AqError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source,
    })
}
