//! JSON output for scripts and GUI wrappers
//!
//! When --json-progress is enabled, progress and results are emitted as JSON
//! lines to stdout, suppressing all other output.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::conversion::{BatchState, BatchSummary, ConversionResult, Outcome};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Discovery finished, conversion about to start
    Started { total: usize, format: String },
    /// Input skipped during discovery
    Skipped { path: String, reason: String },
    /// Conversion that `--dry-run` would perform
    Planned {
        input_path: String,
        output_path: String,
    },
    /// File converted
    FileCompleted {
        current: usize,
        total: usize,
        input_path: String,
        output_path: String,
        processing_time_ms: u128,
    },
    /// File conversion failed
    FileFailed {
        current: usize,
        total: usize,
        input_path: String,
        error: String,
    },
    /// Batch summary
    Summary {
        total_files: usize,
        converted: usize,
        failed: usize,
        skipped: usize,
        cancelled: bool,
        duration_secs: f64,
    },
    /// Fatal error, nothing (more) will be converted
    Error { message: String },
}

impl JsonMessage {
    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Message for one finished file; `current` counts finished files
    pub fn from_result(current: usize, total: usize, result: &ConversionResult) -> Self {
        let input_path = result.source_path.display().to_string();
        match &result.outcome {
            Outcome::Success(output) => Self::FileCompleted {
                current,
                total,
                input_path,
                output_path: output.display().to_string(),
                processing_time_ms: result.duration.as_millis(),
            },
            Outcome::Failure(err) => Self::FileFailed {
                current,
                total,
                input_path,
                error: err.to_string(),
            },
        }
    }

    pub fn skipped(path: &Path, reason: &str) -> Self {
        Self::Skipped {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn summary(summary: &BatchSummary) -> Self {
        Self::Summary {
            total_files: summary.total_count,
            converted: summary.succeeded.len(),
            failed: summary.failed.len(),
            skipped: summary.skipped(),
            cancelled: summary.state == BatchState::Cancelled,
            duration_secs: summary.elapsed.as_secs_f64(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
