//! Errors raised while parsing a template file or writing an input file
//! from one.

use std::fmt;
use std::path::PathBuf;

use crate::format::FormatError;

#[derive(Debug, Clone, PartialEq)]
pub enum TplError {
    /// The first line was not a well-formed `PTF <marker>` header.
    Header { path: PathBuf, message: String },
    /// A non-header line had an odd number of marker occurrences.
    UnbalancedMarker { path: PathBuf, line: usize },
    /// A field named a parameter absent from the mapping passed to
    /// `write_input_file`.
    UnknownParameter {
        path: PathBuf,
        name: String,
        line: usize,
    },
    /// A value could not be rendered into its declared field width.
    Format(FormatError),
    /// The underlying file could not be read or written.
    Io { path: PathBuf, message: String },
}

impl std::error::Error for TplError {}

impl From<FormatError> for TplError {
    fn from(err: FormatError) -> Self {
        TplError::Format(err)
    }
}

impl fmt::Display for TplError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TplError::Header { path, message } => {
                write!(f, "TemplateFile error in {}: {message}", path.display())
            }
            TplError::UnbalancedMarker { path, line } => {
                write!(
                    f,
                    "TemplateFile error in {} on line {line}: unbalanced marker",
                    path.display()
                )
            }
            TplError::UnknownParameter { path, name, line } => {
                write!(
                    f,
                    "TemplateFile error in {} on line {line}: unknown parameter '{name}'",
                    path.display()
                )
            }
            TplError::Format(err) => write!(f, "TemplateFile formatting error: {err}"),
            TplError::Io { path, message } => {
                write!(f, "TemplateFile error in {}: {message}", path.display())
            }
        }
    }
}
