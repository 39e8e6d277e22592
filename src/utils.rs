use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;

/// Create a styled progress bar
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the level
///
/// Human mode stays at `warn` unless `--verbose`, so logs do not fight the
/// progress bar.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose {
        "heic_converter=debug"
    } else {
        "heic_converter=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))
}

/// `1 file`, `3 files`
pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Validate command line arguments
pub fn validate_inputs(args: &Args) -> Result<()> {
    if let Some(quality) = args.quality {
        if !(1..=100).contains(&quality) {
            return Err(anyhow::anyhow!(
                "JPEG quality must be between 1 and 100, got: {}",
                quality
            ));
        }
    }

    // Validate job count
    if let Some(jobs) = args.jobs {
        if jobs > 64 {
            return Err(anyhow::anyhow!("Job count too high (max 64), got: {}", jobs));
        }
    }

    if let Some(output) = &args.output_dir {
        if output.exists() && !output.is_dir() {
            return Err(anyhow::anyhow!(
                "Output path exists and is not a directory: {}",
                output.display()
            ));
        }
    }

    Ok(())
}

/// Get file extension in lowercase
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file has one of the specified (lowercase) extensions
pub fn has_valid_extension(path: &Path, extensions: &[&str]) -> bool {
    if let Some(ext) = get_file_extension(path) {
        extensions.contains(&ext.as_str())
    } else {
        false
    }
}
