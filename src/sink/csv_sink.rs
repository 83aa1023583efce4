//! CSV file sink
//!
//! This module writes story records to a single shared CSV file. The file is
//! opened in append mode and never gets a header row, so output from separate
//! runs pointed at the same file concatenates cleanly.

use crate::harvest::Story;
use crate::sink::{RecordSink, SinkError, SinkResult};
use csv::WriterBuilder;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// CSV-backed record sink
///
/// One writer is shared by all workers in a run, guarded by a mutex. Each
/// batch is written and flushed while the lock is held, so records from
/// different workers never interleave mid-row.
pub struct CsvSink {
    writer: Mutex<csv::Writer<File>>,
    path: PathBuf,
}

impl CsvSink {
    /// Opens (or creates) the output file in append mode
    ///
    /// # Arguments
    ///
    /// * `path` - The output file path
    ///
    /// # Returns
    ///
    /// * `Ok(CsvSink)` - Sink ready to receive records
    /// * `Err(SinkError::Open)` - The file could not be opened
    pub fn create(path: &Path) -> SinkResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let writer = WriterBuilder::new().has_headers(false).from_writer(file);

        Ok(Self {
            writer: Mutex::new(writer),
            path: path.to_path_buf(),
        })
    }
}

impl RecordSink for CsvSink {
    fn append(&self, stories: &[Story]) -> SinkResult<usize> {
        if stories.is_empty() {
            return Ok(0);
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SinkError::Lock(e.to_string()))?;

        for story in stories {
            writer.write_record([
                story.id.as_str(),
                story.rank.as_str(),
                story.score.as_str(),
                story.title.as_str(),
            ])?;
        }

        // Flush while still holding the lock so the batch lands on disk whole
        writer.flush().map_err(SinkError::Flush)?;

        Ok(stories.len())
    }

    fn destination(&self) -> &Path {
        &self.path
    }
}
