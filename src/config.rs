//! Configuration types for dbf-parquet
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::convert::ConvertTask;
use crate::error::{ConfigError, Result};
use crate::parquet::WriterConfig;
use clap::Parser;
use std::path::PathBuf;

/// Minimum and maximum ZSTD compression levels accepted by the writer
const MIN_COMPRESSION_LEVEL: i32 = 1;
const MAX_COMPRESSION_LEVEL: i32 = 22;

/// DATASUS DBC/DBF to Parquet converter
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dbf-parquet",
    version,
    about = "Convert DATASUS DBC/DBF files to Parquet",
    long_about = "Converts legacy DBC/DBF tables to Parquet artifacts.\n\n\
                  A single file converts to <file>.parquet next to it. A directory\n\
                  converts every .dbc/.dbf file inside it, one artifact per file, or\n\
                  into one combined artifact with --combine.",
    after_help = "EXAMPLES:\n    \
        dbf-parquet PNA1212.dbc\n    \
        dbf-parquet PNA1212.dbc -o /data/parquet/\n    \
        dbf-parquet /data/dbc/ -o /data/parquet/\n    \
        dbf-parquet /data/dbc/ --combine -o combined.parquet --schema-name PainelOncologia\n    \
        dbf-parquet decompress PNA1212.dbc",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct CliArgs {
    /// DBC/DBF file or directory to convert
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Subcommand (decompress, etc.)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output file or directory (defaults to the input location)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Combine every eligible file in the input directory into one artifact
    #[arg(long)]
    pub combine: bool,

    /// Root schema name for the Parquet metadata (defaults to "DBFFile")
    #[arg(long, value_name = "NAME")]
    pub schema_name: Option<String>,

    /// Records buffered per Parquet row group
    #[arg(long, default_value = "100000", value_name = "NUM")]
    pub row_group_size: usize,

    /// ZSTD compression level (1-22)
    #[arg(long, default_value = "3", value_name = "LEVEL")]
    pub compression_level: i32,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show per-file details)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Subcommands
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Decompress DBC containers to raw DBF files
    Decompress {
        /// DBC file, or a directory of DBC files, to decompress
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output DBF path (defaults to INPUT.dbf; ignored for directories)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Validated conversion configuration
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// The single task described by the CLI
    pub task: ConvertTask,
    /// Parquet writer knobs
    pub writer: WriterConfig,
    /// Show progress spinner and summary
    pub show_progress: bool,
}

impl ConvertConfig {
    /// Validate CLI arguments into a runnable configuration.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        if args.row_group_size < 1 {
            return Err(ConfigError::InvalidRowGroupSize {
                size: args.row_group_size,
            }
            .into());
        }
        if !(MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&args.compression_level) {
            return Err(ConfigError::InvalidCompressionLevel {
                level: args.compression_level,
            }
            .into());
        }

        let input = args.input.ok_or(ConfigError::MissingInput)?;
        let task = ConvertTask::new(input, args.output, args.schema_name, args.combine)?;

        Ok(Self {
            task,
            writer: WriterConfig {
                row_group_size: args.row_group_size,
                compression_level: args.compression_level,
            },
            show_progress: !args.quiet,
        })
    }
}
