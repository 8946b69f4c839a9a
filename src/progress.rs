//! Progress reporting for the converter
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::convert::ConvertStats;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter that displays conversion status
#[derive(Clone)]
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display with the current source and row count
    pub fn update(&self, source: &Path, rows: u64) {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());
        self.bar
            .set_message(format!("Converting {} | Rows: {}", name, format_number(rows)));
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of a conversion
pub fn print_header(input: &str, mode: &str, output: &str) {
    println!();
    println!(
        "{} {}",
        style("dbf-parquet").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Input:").bold(), input);
    println!("  {} {}", style("Mode:").bold(), mode);
    println!("  {} {}", style("Output:").bold(), output);
    println!();
}

/// Print a summary of the conversion results
pub fn print_summary(stats: &ConvertStats, duration: Duration) {
    let bytes_str = format_size(stats.bytes_written, BINARY);
    let duration_secs = duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        stats.rows_converted as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    println!("{}", style("Conversion Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Artifacts:").bold(),
        format_number(stats.files_converted as u64)
    );
    println!(
        "  {} {}",
        style("Rows:").bold(),
        format_number(stats.rows_converted)
    );
    println!("  {} {}", style("Output Size:").bold(), bytes_str);
    println!(
        "  {} {:.1}s ({:.0} rows/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    for artifact in &stats.artifacts {
        println!("  {} {}", style("Wrote:").bold(), artifact.display());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }
}
