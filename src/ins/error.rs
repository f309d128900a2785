//! Errors raised while parsing an instruction file or reading a model
//! output file through one.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum InsError {
    /// The first line was not a well-formed `PIF <marker>` header.
    Header { path: PathBuf, message: String },
    /// A marker- or tag-delimited token had no matching closer.
    UnbalancedTag {
        path: PathBuf,
        token: String,
        line: usize,
    },
    /// A token did not match any recognized instruction form.
    BadInstruction {
        path: PathBuf,
        token: String,
        line: usize,
    },
    /// The output stream ran out of lines before the instructions did.
    UnexpectedEof { path: PathBuf, line: usize },
    /// A field that should hold a double could not be parsed as one.
    ParseNumber {
        path: PathBuf,
        name: String,
        line: usize,
        col: usize,
    },
    /// A name declared by `parse_and_check` received no binding.
    MissingObs { path: PathBuf, name: String },
    /// The same observation name was bound twice; non-fatal, the later
    /// binding wins. Carried as a value so callers can inspect it, but
    /// never returned as an `Err` — see [`crate::logging::warning_untagged`].
    DuplicateObs { name: String },
}

impl std::error::Error for InsError {}

impl fmt::Display for InsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsError::Header { path, message } => {
                write!(f, "InstructionFile error in {}: {message}", path.display())
            }
            InsError::UnbalancedTag { path, token, line } => write!(
                f,
                "InstructionFile error in {} on line {line}: unbalanced tag in '{token}'",
                path.display()
            ),
            InsError::BadInstruction { path, token, line } => write!(
                f,
                "InstructionFile error in {} on line {line}: unrecognized instruction '{token}'",
                path.display()
            ),
            InsError::UnexpectedEof { path, line } => write!(
                f,
                "InstructionFile error in {}: unexpected end of output file while executing instruction on line {line}",
                path.display()
            ),
            InsError::ParseNumber { path, name, line, col } => write!(
                f,
                "InstructionFile error in {} on line {line}: could not parse a number for '{name}' at output column {col}",
                path.display()
            ),
            InsError::MissingObs { path, name } => write!(
                f,
                "InstructionFile error in {}: observation '{name}' was declared but never bound",
                path.display()
            ),
            InsError::DuplicateObs { name } => {
                write!(f, "observation '{name}' bound more than once; the later value was kept")
            }
        }
    }
}
