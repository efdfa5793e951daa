//! Console output.
//!
//! The move report goes to stdout exactly as `Moved <file> to <dir>`, without
//! styling, so it can be piped. Status and error lines go to stderr in color.

use colored::*;
use std::path::Path;

/// Formats the one-line report for a completed move.
///
/// # Example
///
/// ```
/// use autosort::output::moved_line;
/// use std::path::Path;
///
/// assert_eq!(
///     moved_line("report.txt", Path::new("/watch/Documents")),
///     "Moved report.txt to /watch/Documents"
/// );
/// ```
pub fn moved_line(file_name: &str, destination: &Path) -> String {
    format!("Moved {} to {}", file_name, destination.display())
}

pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints the report line for a completed move.
    pub fn moved(file_name: &str, destination: &Path) {
        println!("{}", moved_line(file_name, destination));
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        eprintln!("{}", message.cyan());
    }
}
