//! Reader for exported monitor series files.
//!
//! Parses the delimited time series the engine writes when a monitor plot
//! is exported: one file per channel group per sweep point.
//!
//! # File Format
//!
//! ```text
//! Iteration,Lift,Sideforce,Thrust Net
//! 1,102.5,3.1,880.2
//! 2,101.9,3.0,881.0
//! 3,102.2,3.2,880.7
//! ```
//!
//! Row 0 is the header; column 0 is the iteration index and the remaining
//! columns are channel values in a fixed, known order. The series is
//! produced incrementally during a run and consumed once, in full, after
//! the run ends.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

/// Error type for monitor series file parsing.
#[derive(Debug, Error)]
pub enum SeriesFileError {
    /// File I/O error
    #[error("series I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error with line number
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What failed to parse
        message: String,
    },

    /// Header only, or nothing at all
    #[error("series file contains no data rows")]
    Empty,

    /// A data row with the wrong number of columns
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnMismatch {
        /// 1-based line number
        line: usize,
        /// Columns in the header
        expected: usize,
        /// Columns on this row
        found: usize,
    },
}

/// Per-iteration samples for a group of named channels.
#[derive(Clone, Debug)]
pub struct MonitorSeries {
    channels: Vec<String>,
    iterations: Vec<f64>,
    columns: Vec<Vec<f64>>,
}

impl MonitorSeries {
    /// Assemble a series from parallel columns.
    ///
    /// # Panics
    ///
    /// Panics if the column count does not match the channel count, or any
    /// column length differs from the iteration count.
    pub fn new(channels: Vec<String>, iterations: Vec<f64>, columns: Vec<Vec<f64>>) -> Self {
        assert_eq!(
            channels.len(),
            columns.len(),
            "one column per channel required"
        );
        for column in &columns {
            assert_eq!(
                column.len(),
                iterations.len(),
                "all columns must span the same iterations"
            );
        }
        Self {
            channels,
            iterations,
            columns,
        }
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    /// Whether the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    /// Channel names, in file column order.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Iteration indices.
    pub fn iterations(&self) -> &[f64] {
        &self.iterations
    }

    /// Samples for a named channel, or `None` if absent.
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        let i = self.channels.iter().position(|c| c == name)?;
        Some(&self.columns[i])
    }
}

/// Read a comma-delimited monitor series export.
///
/// # Errors
/// - [`SeriesFileError::Empty`] if the file has no data rows
/// - [`SeriesFileError::ColumnMismatch`] on ragged rows
/// - [`SeriesFileError::Parse`] on non-numeric fields, with the line number
pub fn read_series_file(path: &Path) -> Result<MonitorSeries, SeriesFileError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut channels: Vec<String> = Vec::new();
    let mut iterations: Vec<f64> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if channels.is_empty() {
            // Header row: iteration label, then channel names.
            let mut fields = line.split(',').map(|f| f.trim().to_string());
            let _iteration_label = fields.next();
            channels = fields.collect();
            if channels.is_empty() {
                return Err(SeriesFileError::Parse {
                    line: line_num + 1,
                    message: "header has no channel columns".into(),
                });
            }
            columns = vec![Vec::new(); channels.len()];
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        if fields.len() != channels.len() + 1 {
            return Err(SeriesFileError::ColumnMismatch {
                line: line_num + 1,
                expected: channels.len() + 1,
                found: fields.len(),
            });
        }

        let mut values = Vec::with_capacity(fields.len());
        for f in &fields {
            values.push(f.parse::<f64>().map_err(|_| SeriesFileError::Parse {
                line: line_num + 1,
                message: format!("invalid number '{}'", f),
            })?);
        }

        iterations.push(values[0]);
        for (column, &value) in columns.iter_mut().zip(&values[1..]) {
            column.push(value);
        }
    }

    if iterations.is_empty() {
        return Err(SeriesFileError::Empty);
    }

    Ok(MonitorSeries::new(channels, iterations, columns))
}
