// src/sink.rs
//! Persisted conditioning artifact
//!
//! One `timestamp,filtered,envelope` row per processed sample, appended for
//! the whole session.

use crate::error::{PureItError, PureItResult};
use crate::processing::conditioning::ConditionedBatch;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const ARTIFACT_HEADER: [&str; 3] = ["timestamp", "filtered", "envelope"];

#[derive(Debug, Serialize)]
struct ArtifactRow {
    timestamp: f64,
    filtered: f64,
    envelope: f64,
}

/// Append-only CSV writer, flushed on finish and on drop
pub struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows_written: u64,
}

impl CsvSink {
    /// Create (truncating) the artifact and write its header
    pub fn create<P: AsRef<Path>>(path: P) -> PureItResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| sink_error(&path, "create", e))?;
        writer
            .write_record(ARTIFACT_HEADER)
            .map_err(|e| sink_error(&path, "write header", e))?;

        info!("Writing conditioning artifact to {}", path.display());
        Ok(Self {
            writer,
            path,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append one row per sample of `batch`
    pub fn append_batch(&mut self, timestamps: &[f64], batch: &ConditionedBatch) -> PureItResult<()> {
        if timestamps.len() != batch.len() {
            return Err(PureItError::InvalidData {
                data_type: "artifact rows".to_string(),
                reason: format!("{} timestamps for {} samples", timestamps.len(), batch.len()),
                context: crate::error_context!("sink", "append_batch"),
            });
        }

        for ((&timestamp, &filtered), &envelope) in timestamps
            .iter()
            .zip(batch.filtered.iter())
            .zip(batch.envelope.iter())
        {
            self.writer
                .serialize(ArtifactRow {
                    timestamp,
                    filtered,
                    envelope,
                })
                .map_err(|e| sink_error(&self.path, "append", e))?;
        }
        self.rows_written += timestamps.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> PureItResult<()> {
        self.writer.flush().map_err(|e| PureItError::Io {
            operation: format!("flush {}", self.path.display()),
            source: Arc::new(e),
        })
    }

    /// Flush and report how many rows the artifact holds
    pub fn finish(mut self) -> PureItResult<u64> {
        self.flush()?;
        info!("Closed {} after {} rows", self.path.display(), self.rows_written);
        Ok(self.rows_written)
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}

fn sink_error(path: &Path, operation: &str, err: csv::Error) -> PureItError {
    PureItError::Io {
        operation: format!("{} {}", operation, path.display()),
        source: Arc::new(std::io::Error::from(err)),
    }
}
