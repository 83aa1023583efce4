//! Record sinks for harvested stories
//!
//! This module defines the sink trait that harvest workers append records
//! through, and the CSV implementation used for real runs. One sink instance
//! is shared by every worker in a run, so implementations must keep each
//! append atomic with respect to concurrent appenders.

mod csv_sink;

use crate::harvest::Story;
use chrono::{DateTime, Local};
use std::path::Path;
use thiserror::Error;

pub use csv_sink::CsvSink;

/// File extension for harvest output
pub const OUTPUT_EXTENSION: &str = "csv";

/// Errors that can occur while persisting records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to open output file {}: {source}", path.display())]
    Open {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to append record: {0}")]
    Append(#[from] csv::Error),

    #[error("Failed to flush output: {0}")]
    Flush(std::io::Error),

    #[error("Failed to lock output writer: {0}")]
    Lock(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Trait for record sinks
///
/// Sinks receive batches of extracted stories from concurrently running
/// workers. Implementations must be thread-safe: appends from different
/// workers may interleave between batches but never within a record.
pub trait RecordSink: Send + Sync {
    /// Appends a batch of records to the output
    ///
    /// # Arguments
    ///
    /// * `stories` - The records to append, written in slice order
    ///
    /// # Returns
    ///
    /// The number of records written
    fn append(&self, stories: &[Story]) -> SinkResult<usize>;

    /// The path records are being written to
    fn destination(&self) -> &Path;
}

/// Builds the output filename for a run starting at the given time
///
/// The run timestamp is baked into the name, so every run gets a fresh
/// file and two runs started in different seconds never collide.
///
/// # Example
///
/// ```
/// use chrono::{Local, TimeZone};
/// use newsrake::sink::timestamped_filename;
///
/// let at = Local.with_ymd_and_hms(2018, 2, 5, 14, 30, 9).unwrap();
/// assert_eq!(timestamped_filename("output", at), "output_20180205143009.csv");
/// ```
pub fn timestamped_filename(prefix: &str, at: DateTime<Local>) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        at.format("%Y%m%d%H%M%S"),
        OUTPUT_EXTENSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamped_filename_format() {
        let at = Local.with_ymd_and_hms(2024, 12, 31, 23, 59, 58).unwrap();
        assert_eq!(
            timestamped_filename("output", at),
            "output_20241231235958.csv"
        );
    }

    #[test]
    fn test_timestamped_filename_pads_components() {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(timestamped_filename("run", at), "run_20240102030405.csv");
    }
}
