use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use heic_converter::cli::{self, Args, EXIT_SUCCESS, EXIT_TOTAL_FAILURE};
use heic_converter::conversion::discover::Discovery;
use heic_converter::conversion::{
    discover_files, plan_requests, BatchRunner, BatchState, BatchSummary, CancelToken,
    ConversionConfig, ConversionRequest, ConversionResult,
};
use heic_converter::utils::{
    create_progress_bar, format_duration, init_logging, pluralize, validate_inputs,
};
use heic_converter::{HeifCodec, JsonMessage};

fn main() -> ExitCode {
    let args = Args::parse();
    let json = args.json_progress;

    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            if json {
                JsonMessage::error(format!("{:#}", e)).emit();
            } else {
                eprintln!("{} {:#}", style("Error:").bold().red(), e);
            }
            ExitCode::from(EXIT_TOTAL_FAILURE)
        }
    }
}

fn run(mut args: Args) -> Result<u8> {
    let start_time = Instant::now();
    init_logging(args.verbose)?;
    args.load_and_merge_config()?;
    validate_inputs(&args)?;

    let json = args.json_progress;
    let config = args.conversion_config();
    let runner = BatchRunner::new(HeifCodec::new()).with_jobs(args.parallel_jobs());

    if !json {
        println!("{}", style("HEIC Converter").bold().blue());
        println!("{}", style("HEIC/HEIF to JPG/PNG batch conversion").dim());
        println!();
        if args.verbose {
            print_configuration(&config, runner.jobs());
        }
        if !HeifCodec::is_available() {
            println!(
                "{} built without HEIF support, every file will fail to decode",
                style("Warning:").yellow().bold()
            );
            println!();
        }
    }

    // Discover all HEIC/HEIF files
    let discovery = discover_files(&args.inputs, config.recursive);
    report_skipped(&discovery, json);

    if discovery.files.is_empty() {
        if json {
            JsonMessage::error("No HEIC/HEIF files found to convert").emit();
        } else {
            println!("{}", style("No HEIC/HEIF files found to convert").red());
        }
        return Ok(EXIT_TOTAL_FAILURE);
    }

    let requests = plan_requests(&discovery.files, &config);

    if args.dry_run {
        print_dry_run(&requests, json);
        return Ok(EXIT_SUCCESS);
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel()).context("Failed to install Ctrl-C handler")?;
    }

    let total = requests.len();

    if json {
        JsonMessage::Started {
            total,
            format: config.output_format.to_string(),
        }
        .emit();
    } else {
        println!(
            "Converting {} to {}...",
            style(pluralize(total, "file")).bold(),
            style(config.output_format.label()).bold()
        );
    }

    let progress = if json {
        indicatif::ProgressBar::hidden()
    } else {
        create_progress_bar(total as u64)
    };
    progress.set_message(format!("Converting to {}", config.output_format.label()));

    let completed = AtomicUsize::new(0);
    let verbose = args.verbose;
    let on_progress = |_index: usize, total: usize, result: &ConversionResult| {
        let current = completed.fetch_add(1, Ordering::Relaxed) + 1;
        if json {
            JsonMessage::from_result(current, total, result).emit();
            return;
        }
        match (result.output_path(), result.error()) {
            (Some(output), _) if verbose => progress.println(format!(
                "{} {} → {}",
                style("✓").green(),
                result.file_name(),
                style(output.display()).dim()
            )),
            (_, Some(err)) => progress.println(format!(
                "{} {} - {}",
                style("✗").red(),
                style(result.file_name()).bold(),
                err
            )),
            _ => {}
        }
        progress.inc(1);
    };

    let summary = match runner.run(&requests, &cancel, on_progress) {
        Ok(summary) => summary,
        Err(e) => {
            progress.abandon();
            return Err(e).context("Conversion aborted before any file was processed");
        }
    };

    if summary.state == BatchState::Cancelled {
        progress.abandon_with_message("Cancelled");
    } else {
        progress.finish_with_message("✓ Conversion complete");
    }

    if json {
        JsonMessage::summary(&summary).emit();
    } else {
        print_summary(&summary, start_time);
    }

    Ok(cli::exit_code_for(&summary))
}

fn print_configuration(config: &ConversionConfig, jobs: usize) {
    println!("{}", style("Configuration:").bold());
    println!("  Output format: {}", config.output_format.label());
    if config.output_format == heic_converter::OutputFormat::Jpg {
        println!("  JPEG quality: {}", config.jpg_quality);
    }
    match (&config.output_directory, config.create_subfolder) {
        (Some(dir), _) => println!("  Output directory: {}", dir.display()),
        (None, true) => println!(
            "  Output directory: {} next to each source",
            heic_converter::conversion::subfolder_name(config.output_format)
        ),
        (None, false) => println!("  Output directory: same as each source"),
    }
    println!("  Recursive: {}", config.recursive);
    println!("  Parallel jobs: {}", jobs);
    println!();
}

fn report_skipped(discovery: &Discovery, json: bool) {
    for skipped in &discovery.skipped {
        if json {
            JsonMessage::skipped(&skipped.path, skipped.reason.describe()).emit();
        } else {
            println!(
                "{} skipping {}: {}",
                style("Warning:").yellow().bold(),
                skipped.path.display(),
                skipped.reason.describe()
            );
        }
    }
    if !json && !discovery.skipped.is_empty() {
        println!();
    }
}

fn print_dry_run(requests: &[ConversionRequest], json: bool) {
    if !json {
        println!("{}", style("Dry Run (no files will be written):").bold().cyan());
    }
    for request in requests {
        let output = request
            .output_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<invalid file name>".to_string());
        if json {
            JsonMessage::Planned {
                input_path: request.source_path.display().to_string(),
                output_path: output,
            }
            .emit();
        } else {
            println!(
                "  {} → {}",
                request.source_path.display(),
                style(output).cyan()
            );
        }
    }
    if !json {
        println!();
        println!(
            "  {} would be converted",
            style(pluralize(requests.len(), "file")).bold()
        );
    }
}

fn print_summary(summary: &BatchSummary, start_time: Instant) {
    println!();
    let header = if summary.state == BatchState::Cancelled {
        style("Conversion cancelled!").bold().yellow()
    } else {
        style("Conversion complete!").bold().green()
    };
    println!("{}", header);
    println!(
        "  Successfully converted: {}",
        style(summary.succeeded.len()).bold().green()
    );
    if !summary.failed.is_empty() {
        println!("  Failed to convert: {}", style(summary.failed.len()).bold().red());
    }
    if summary.skipped() > 0 {
        println!(
            "  Not started (cancelled): {}",
            style(summary.skipped()).bold().yellow()
        );
    }
    if summary.processed() > 0 {
        println!("  Success rate: {:.1}%", summary.success_rate());
    }

    println!();
    println!("{}", style("Performance:").bold().blue());
    println!(
        "  Total time: {}",
        style(format_duration(start_time.elapsed())).bold()
    );
    if summary.processed() > 0 {
        println!(
            "  Average time per file: {}",
            style(format_duration(summary.average_duration())).dim()
        );
    }

    let output_dirs = summary.output_directories();
    if !output_dirs.is_empty() {
        println!();
        println!("{}", style("Output files:").bold().green());
        for dir in output_dirs {
            println!("  {}", dir.display());
        }
    }

    if !summary.failed.is_empty() {
        println!();
        println!("{}", style("Errors encountered:").bold().red());
        for (i, failed) in summary.failed.iter().enumerate() {
            let reason = failed
                .error()
                .map(|e| e.to_string())
                .unwrap_or_default();
            println!(
                "  {}: {} - {}",
                style(format!("#{}", i + 1)).dim(),
                style(failed.source_path.display()).bold().red(),
                reason
            );
        }
    }
}
