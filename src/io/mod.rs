//! I/O for the files a sweep produces and consumes.
//!
//! This module provides:
//! - **Monitor series**: parsing the delimited time series the engine
//!   exports per channel group per sweep point
//! - **Result table**: the persistent tabular summary, one row per point
//!
//! # File Formats
//!
//! ## Monitor Series Exports
//!
//! ```text
//! Iteration,Lift,Sideforce,Thrust Net
//! 1,102.5,3.1,880.2
//! 2,101.9,3.0,881.0
//! ```
//!
//! ## Result Table
//!
//! ```text
//! Sink,Pitch,Yaw,Speed,Fx,Fy
//! 24.5,-0.2,0,0.25,1.25,0.03
//! 24.5,-0.2,0,0.5,1.31,0.04
//! ```

mod result_table;
mod series_reader;

pub use result_table::{append_row, ensure_table, read_table, Cell, TableError};
pub use series_reader::{read_series_file, MonitorSeries, SeriesFileError};
