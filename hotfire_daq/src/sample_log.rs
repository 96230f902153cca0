//! Append-only sample log.
//!
//! One row per sample: the time column followed by one column per channel.
//! Each run writes a fresh file named `test_data_NNN.csv`, where `NNN` is one
//! past the highest number already present in the data directory.

use crate::error::LogError;
use hotfire_common::types::Sample;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

const LOG_PREFIX: &str = "test_data_";
const LOG_EXTENSION: &str = "csv";

/// Persistent destination for converted samples.
pub trait SampleSink: Send {
    /// Append one row per sample.
    fn append(&mut self, samples: &[Sample]) -> Result<(), LogError>;

    /// Push buffered rows to durable storage.
    fn flush(&mut self) -> Result<(), LogError>;
}

/// CSV implementation of [`SampleSink`].
pub struct CsvSampleLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    channels: usize,
    rows: u64,
}

impl CsvSampleLog {
    /// Create the next numbered log in `dir` and write the header row.
    ///
    /// `columns` is the full header including the time column.
    pub fn create(dir: &Path, columns: &[String]) -> Result<Self, LogError> {
        fs::create_dir_all(dir)?;
        let path = next_log_path(dir)?;
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(columns)?;
        info!("Created new sample log: {}", path.display());

        Ok(Self {
            path,
            writer,
            channels: columns.len().saturating_sub(1),
            rows: 0,
        })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far, excluding the header.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl SampleSink for CsvSampleLog {
    fn append(&mut self, samples: &[Sample]) -> Result<(), LogError> {
        let mut record = Vec::with_capacity(self.channels + 1);
        for sample in samples {
            if sample.values.len() != self.channels {
                return Err(LogError::ColumnMismatch {
                    expected: self.channels,
                    got: sample.values.len(),
                });
            }
            record.clear();
            record.push(sample.time_s.to_string());
            record.extend(sample.values.iter().map(f64::to_string));
            self.writer.write_record(&record)?;
            self.rows += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

/// Next unused `test_data_NNN.csv` path in `dir`.
pub fn next_log_path(dir: &Path) -> Result<PathBuf, LogError> {
    let mut highest = 0u32;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        if let Some(n) = name.to_str().and_then(parse_log_number) {
            highest = highest.max(n);
        }
    }
    Ok(dir.join(format!("{LOG_PREFIX}{:03}.{LOG_EXTENSION}", highest + 1)))
}

fn parse_log_number(name: &str) -> Option<u32> {
    let rest = name.strip_prefix(LOG_PREFIX)?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}
