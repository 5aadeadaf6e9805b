//! Persistent result table: one header row, one row per sweep point.
//!
//! The table is comma-delimited text with a fixed header. Creation is
//! idempotent; appending is a full read-modify-write, matching the
//! spreadsheet lifecycle it replaces: open the existing table, read it all,
//! add one row, rewrite the whole file.
//!
//! # Hazard
//!
//! Because the append rewrites the file in place, an interruption mid-write
//! can truncate or corrupt the table. The sweep is an offline batch process
//! and the table has a single writer, so this is documented rather than
//! fixed; rerunning the interrupted sweep regenerates the table.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for result table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// File I/O error
    #[error("result table I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Existing file has no header row
    #[error("result table {path:?} has no header row")]
    MissingHeader {
        /// Offending table path
        path: PathBuf,
    },

    /// Row width does not match the table header
    #[error("row has {found} cells but the table header has {expected} columns")]
    ColumnMismatch {
        /// Columns in the header
        expected: usize,
        /// Cells in the appended row
        found: usize,
    },
}

/// One cell of a result row.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// Label cell (configuration revision, etc.).
    Text(String),
    /// Numeric cell.
    Number(f64),
}

impl Cell {
    /// Text cell from anything stringy.
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(v) => write!(f, "{}", v),
        }
    }
}

/// Create the table with a single header row if it does not exist.
///
/// Idempotent: repeated calls on an existing table are no-ops, never a
/// second header.
pub fn ensure_table(path: &Path, header: &[&str]) -> Result<(), TableError> {
    if path.exists() {
        return Ok(());
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", header.join(","))?;
    writer.flush()?;
    Ok(())
}

/// Append one row to an existing table.
///
/// Reads the whole table, appends the row, and rewrites the file. Cells
/// land in the order given; the caller is responsible for matching the
/// header's column order.
///
/// # Errors
/// - [`TableError::MissingHeader`] if the file is empty
/// - [`TableError::ColumnMismatch`] if the row width differs from the header
pub fn append_row(path: &Path, cells: &[Cell]) -> Result<(), TableError> {
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;

    let lines: Vec<&str> = contents.lines().collect();
    let header = match lines.first() {
        Some(h) if !h.trim().is_empty() => *h,
        _ => {
            return Err(TableError::MissingHeader {
                path: path.to_path_buf(),
            })
        }
    };

    let expected = header.split(',').count();
    if cells.len() != expected {
        return Err(TableError::ColumnMismatch {
            expected,
            found: cells.len(),
        });
    }

    let row = cells
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for line in &lines {
        writeln!(writer, "{}", line)?;
    }
    writeln!(writer, "{}", row)?;
    writer.flush()?;
    Ok(())
}

/// Read the table back as raw rows (header first). Test and inspection
/// helper; the sweep itself only ever appends.
pub fn read_table(path: &Path) -> Result<Vec<Vec<String>>, TableError> {
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    Ok(contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.split(',').map(|f| f.to_string()).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &[&str] = &["Sink", "Pitch", "Fx"];

    #[test]
    fn ensure_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");

        ensure_table(&path, HEADER).unwrap();
        ensure_table(&path, HEADER).unwrap();

        let rows = read_table(&path).unwrap();
        assert_eq!(rows.len(), 1, "exactly one header row");
        assert_eq!(rows[0], vec!["Sink", "Pitch", "Fx"]);
    }

    #[test]
    fn appends_accumulate_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        ensure_table(&path, HEADER).unwrap();

        append_row(&path, &[24.5.into(), (-0.2).into(), 1.25.into()]).unwrap();
        ensure_table(&path, HEADER).unwrap(); // still a no-op between appends
        append_row(&path, &[24.5.into(), 0.8.into(), 1.5.into()]).unwrap();

        let rows = read_table(&path).unwrap();
        assert_eq!(rows.len(), 3, "one header plus two data rows");
        assert_eq!(rows[1], vec!["24.5", "-0.2", "1.25"]);
        assert_eq!(rows[2], vec!["24.5", "0.8", "1.5"]);
    }

    #[test]
    fn text_cells_carry_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        ensure_table(&path, &["Revision", "RPM"]).unwrap();

        append_row(&path, &[Cell::text("hub_v1"), 3135.0.into()]).unwrap();

        let rows = read_table(&path).unwrap();
        assert_eq!(rows[1], vec!["hub_v1", "3135"]);
    }

    #[test]
    fn row_width_must_match_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        ensure_table(&path, HEADER).unwrap();

        let err = append_row(&path, &[1.0.into()]).unwrap_err();
        assert!(matches!(
            err,
            TableError::ColumnMismatch {
                expected: 3,
                found: 1
            }
        ));
    }

    #[test]
    fn appending_to_an_empty_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        std::fs::write(&path, "").unwrap();

        assert!(matches!(
            append_row(&path, &[1.0.into(), 2.0.into(), 3.0.into()]),
            Err(TableError::MissingHeader { .. })
        ));
    }
}
