//! dbf-parquet - DATASUS DBC/DBF to Parquet Converter
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use dbf_parquet::config::{CliArgs, Command, ConvertConfig};
use dbf_parquet::convert::{Converter, ProgressCallback, TaskMode};
use dbf_parquet::progress::{print_header, print_summary, ProgressReporter};
use humansize::{format_size, BINARY};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Subcommands bypass the conversion pipeline
    if let Some(command) = args.command.clone() {
        return run_command(command);
    }

    // Validate and create config
    let config = ConvertConfig::from_args(args).context("Invalid configuration")?;

    let mode = config.task.mode().context("Invalid task input")?;
    if config.show_progress {
        let output = config
            .task
            .output()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "alongside input".to_string());
        print_header(
            &config.task.input().display().to_string(),
            mode_name(mode),
            &output,
        );
    }

    // Create progress reporter
    let progress = config.show_progress.then(ProgressReporter::new);
    let callback: Option<ProgressCallback> = progress.clone().map(|reporter| {
        Box::new(move |source: &Path, rows: u64| reporter.update(source, rows))
            as ProgressCallback
    });

    // Run the conversion
    let mut converter = Converter::new(config.writer.clone());
    converter.add_task(config.task.clone());

    let started = Instant::now();
    let result = converter.convert_with_progress(callback);

    if let Some(ref reporter) = progress {
        match &result {
            Ok(_) => reporter.finish("Conversion completed"),
            Err(_) => reporter.finish_and_clear(),
        }
    }

    let stats = result.context("Conversion failed")?;

    if config.show_progress {
        print_summary(&stats, started.elapsed());
    }

    info!(
        artifacts = stats.files_converted,
        rows = stats.rows_converted,
        "conversion finished"
    );

    Ok(())
}

fn run_command(command: Command) -> Result<()> {
    match command {
        Command::Decompress { input, output } => {
            let all = if input.is_dir() {
                dbf_parquet::dbc::decompress_directory(&input)
                    .with_context(|| format!("Failed to decompress '{}'", input.display()))?
            } else {
                let stats = dbf_parquet::dbc::decompress_to_file(&input, output.as_deref())
                    .with_context(|| format!("Failed to decompress '{}'", input.display()))?;
                vec![stats]
            };

            for stats in &all {
                let output = stats
                    .output
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!(
                    "Decompressed {} ({}) to {} ({}) in {:.2?}",
                    stats.input.display(),
                    format_size(stats.input_size, BINARY),
                    output,
                    format_size(stats.output_size, BINARY),
                    stats.elapsed
                );
            }
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("dbf_parquet=debug,warn")
    } else {
        EnvFilter::new("dbf_parquet=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

fn mode_name(mode: TaskMode) -> &'static str {
    match mode {
        TaskMode::SingleFile => "single file",
        TaskMode::FanOut => "one artifact per file",
        TaskMode::Combine => "combine",
    }
}
