//! Pretty-printing of line-anchored TPL/INS diagnostics to the console.
//!
//! This is deliberately separate from the `log` facade used elsewhere in
//! the crate: these messages carry source-line context a driver's logger
//! would have to reconstruct, and are meant to be readable even when no
//! logger has been configured by the host application.

use colored::Colorize;

/// Pretty-print a fatal error message to the console
pub fn error(error_message: String) {
    let error_title = "error:".red().bold();
    eprintln!("{} {}", error_title, error_message);
}

/// Pretty-print a non-fatal warning anchored at a source line
pub fn warning(message: String, line_number: usize) {
    let warning = "warning:".yellow().bold();
    eprintln!("{} line {}: {}", warning, line_number, message);
}

/// Pretty-print a non-fatal warning with no specific source line
pub fn warning_untagged(message: String) {
    let warning = "warning:".yellow().bold();
    eprintln!("{} {}", warning, message);
}
