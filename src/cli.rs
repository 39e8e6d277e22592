use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::conversion::{BatchState, BatchSummary, ConversionConfig};

/// Default JPEG quality, matching what photo apps export
pub const DEFAULT_JPG_QUALITY: u8 = 95;

/// Every file converted
pub const EXIT_SUCCESS: u8 = 0;
/// Some files converted, some failed
pub const EXIT_PARTIAL_FAILURE: u8 = 1;
/// Nothing converted: all failed, no inputs, or a fatal error
pub const EXIT_TOTAL_FAILURE: u8 = 2;
/// Interrupted with Ctrl-C
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG output (lossy, alpha is flattened)
    #[value(name = "jpg", alias = "jpeg")]
    #[serde(alias = "jpeg")]
    Jpg,
    /// PNG output (lossless, alpha is kept)
    #[value(name = "png")]
    Png,
}

impl OutputFormat {
    /// File extension written for this format, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Jpg => "JPG",
            OutputFormat::Png => "PNG",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Jpg
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "heic-converter",
    version,
    about = "Convert HEIC/HEIF images to JPG or PNG format",
    long_about = "
HEIC Converter

Converts HEIC/HEIF photos (the default format of recent iPhones) to JPG or PNG.
Inputs can be single files or directories; directories are searched recursively
for .heic/.heif files. Source files are never modified.

Exit codes:
  0    every file was converted
  1    some files were converted, some failed
  2    nothing was converted (all failed, no inputs found, or a fatal error)
  130  interrupted with Ctrl-C

Example Usage:
  # Convert a single file next to the original
  heic-converter IMG_0001.HEIC

  # Convert multiple files
  heic-converter IMG_0001.HEIC IMG_0002.HEIC

  # Convert every HEIC file in a directory to PNG
  heic-converter --format png ~/Pictures/iphone

  # Write everything into one output directory
  heic-converter --output ~/Pictures/converted ~/Pictures/iphone

  # Put results into a converted_jpg folder beside each source
  heic-converter --subfolder ~/Pictures/iphone

  # Use four worker threads and lower JPEG quality
  heic-converter -j 4 -q 85 ~/Pictures/iphone

  # Show what would be written without converting anything
  heic-converter --dry-run ~/Pictures/iphone"
)]
pub struct Args {
    /// Input HEIC/HEIF file(s) or directories containing them
    #[arg(required = true, value_name = "FILE|DIR")]
    pub inputs: Vec<PathBuf>,

    /// Output format [default: jpg]
    #[arg(short = 'f', long = "format", value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output directory (default: same directory as each input file)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write results into a converted_<format> folder next to each source
    #[arg(long = "subfolder", conflicts_with = "output_dir")]
    pub subfolder: bool,

    /// JPEG quality from 1 to 100 [default: 95]
    #[arg(short = 'q', long = "quality", value_name = "QUALITY")]
    pub quality: Option<u8>,

    /// Number of files converted concurrently (0 = all CPU cores) [default: 1]
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Only look at the top level of input directories
    #[arg(long = "no-recursive")]
    pub no_recursive: bool,

    /// List the planned conversions without writing any file
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Emit progress and results as JSON lines on stdout
    #[arg(long = "json-progress")]
    pub json_progress: bool,

    /// JSON settings file; command-line flags take precedence
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Enable verbose output with per-file details
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Args {
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    pub fn jpg_quality(&self) -> u8 {
        self.quality.unwrap_or(DEFAULT_JPG_QUALITY)
    }

    /// Worker count with `0` resolved to the number of CPU cores
    pub fn parallel_jobs(&self) -> usize {
        match self.jobs.unwrap_or(1) {
            0 => num_cpus::get(),
            n => n,
        }
    }

    pub fn recursive(&self) -> bool {
        !self.no_recursive
    }

    /// Batch-wide settings as resolved from flags and the config file
    pub fn conversion_config(&self) -> ConversionConfig {
        ConversionConfig {
            output_format: self.output_format(),
            jpg_quality: self.jpg_quality(),
            create_subfolder: self.subfolder,
            output_directory: self.output_dir.clone(),
            recursive: self.recursive(),
        }
    }
}

/// Process exit code for a finished batch
pub fn exit_code_for(summary: &BatchSummary) -> u8 {
    if summary.state == BatchState::Cancelled {
        EXIT_CANCELLED
    } else if summary.all_succeeded() && !summary.succeeded.is_empty() {
        EXIT_SUCCESS
    } else if summary.succeeded.is_empty() {
        EXIT_TOTAL_FAILURE
    } else {
        EXIT_PARTIAL_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{ConversionError, ConversionResult, Outcome};
    use std::time::Duration;

    fn result(ok: bool) -> ConversionResult {
        ConversionResult {
            source_path: PathBuf::from("x.heic"),
            outcome: if ok {
                Outcome::Success(PathBuf::from("x.jpg"))
            } else {
                Outcome::Failure(ConversionError::UnsupportedInput)
            },
            duration: Duration::ZERO,
        }
    }

    fn summary_of(outcomes: &[bool], state: BatchState) -> BatchSummary {
        let mut summary = BatchSummary::new(outcomes.len());
        for ok in outcomes {
            summary.record(result(*ok));
        }
        summary.state = state;
        summary
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&summary_of(&[true, true], BatchState::Completed)), EXIT_SUCCESS);
        assert_eq!(
            exit_code_for(&summary_of(&[true, false], BatchState::Completed)),
            EXIT_PARTIAL_FAILURE
        );
        assert_eq!(
            exit_code_for(&summary_of(&[false, false], BatchState::Completed)),
            EXIT_TOTAL_FAILURE
        );
        assert_eq!(exit_code_for(&summary_of(&[true], BatchState::Cancelled)), EXIT_CANCELLED);
    }

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["heic-converter", "photos"]).unwrap();
        assert_eq!(args.inputs, vec![PathBuf::from("photos")]);
        assert_eq!(args.output_format(), OutputFormat::Jpg);
        assert_eq!(args.jpg_quality(), 95);
        assert_eq!(args.parallel_jobs(), 1);
        assert!(args.recursive());
        assert!(args.output_dir.is_none());
        assert_eq!(args.conversion_config(), ConversionConfig::default());
    }

    #[test]
    fn test_parse_format_and_output() {
        let args = Args::try_parse_from([
            "heic-converter",
            "--format",
            "png",
            "--output",
            "out",
            "a.heic",
            "b.heic",
        ])
        .unwrap();
        assert_eq!(args.output_format(), OutputFormat::Png);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.inputs.len(), 2);
    }

    #[test]
    fn test_jpeg_alias() {
        let args = Args::try_parse_from(["heic-converter", "-f", "jpeg", "x"]).unwrap();
        assert_eq!(args.output_format(), OutputFormat::Jpg);
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Args::try_parse_from(["heic-converter", "-f", "webp", "x"]).is_err());
    }

    #[test]
    fn test_requires_input() {
        assert!(Args::try_parse_from(["heic-converter"]).is_err());
    }

    #[test]
    fn test_subfolder_conflicts_with_output() {
        let parsed =
            Args::try_parse_from(["heic-converter", "--subfolder", "-o", "out", "photos"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_zero_jobs_means_all_cores() {
        let args = Args::try_parse_from(["heic-converter", "-j", "0", "x"]).unwrap();
        assert_eq!(args.parallel_jobs(), num_cpus::get());
    }

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::Jpg.extension(), "jpg");
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Png.to_string(), "png");
        assert_eq!(OutputFormat::Jpg.label(), "JPG");
    }
}
