pub mod batch;
pub mod discover;
pub mod job;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{OutputFormat, DEFAULT_JPG_QUALITY};

pub use batch::{BatchError, BatchRunner, BatchState, BatchSummary, CancelToken};
pub use discover::{discover_files, is_heif_file, plan_requests, HEIF_EXTENSIONS};
pub use job::convert;

/// Settings shared by every request of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    pub output_format: OutputFormat,
    pub jpg_quality: u8,
    /// Write into `converted_<format>` beside each source
    pub create_subfolder: bool,
    /// Explicit output directory; wins over `create_subfolder`
    pub output_directory: Option<PathBuf>,
    /// Descend into sub-directories of directory inputs
    pub recursive: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Jpg,
            jpg_quality: DEFAULT_JPG_QUALITY,
            create_subfolder: false,
            output_directory: None,
            recursive: true,
        }
    }
}

impl ConversionConfig {
    /// Directory the converted copy of `source` is written to
    pub fn output_directory_for(&self, source: &Path) -> PathBuf {
        if let Some(dir) = &self.output_directory {
            return dir.clone();
        }

        let parent = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if self.create_subfolder {
            parent.join(subfolder_name(self.output_format))
        } else {
            parent
        }
    }
}

/// Name of the per-source subfolder used when `create_subfolder` is set
pub fn subfolder_name(format: OutputFormat) -> String {
    format!("converted_{}", format.extension())
}

/// One file to convert; immutable once the batch starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source_path: PathBuf,
    pub output_directory: PathBuf,
    pub output_format: OutputFormat,
    pub create_subfolder: bool,
    pub jpg_quality: u8,
}

impl ConversionRequest {
    pub fn new(source_path: impl Into<PathBuf>, config: &ConversionConfig) -> Self {
        let source_path = source_path.into();
        Self {
            output_directory: config.output_directory_for(&source_path),
            output_format: config.output_format,
            create_subfolder: config.create_subfolder,
            jpg_quality: config.jpg_quality,
            source_path,
        }
    }

    /// `<output_directory>/<source stem>.<jpg|png>`
    pub fn output_path(&self) -> Option<PathBuf> {
        let stem = self.source_path.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(self.output_format.extension());
        Some(self.output_directory.join(name))
    }
}

/// Why a single file could not be converted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("unsupported or missing file")]
    UnsupportedInput,
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(PathBuf),
    Failure(ConversionError),
}

/// Result of one conversion job; exactly one per processed request
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub source_path: PathBuf,
    pub outcome: Outcome,
    pub duration: Duration,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Success(path) => Some(path),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ConversionError> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    /// Source file name for display, falling back to the full path
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}
