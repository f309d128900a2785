//! Top-level error type uniting every failure mode a [`crate::ModelInterface`]
//! evaluation can hit.

use std::fmt;
use std::path::PathBuf;

use crate::ins::InsError;
use crate::runner::RunnerError;
use crate::tpl::TplError;

/// Raised by `initialize` for malformed configuration — empty file lists,
/// mismatched counts, or names the TPL/INS files don't actually reference.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    EmptyCommandList,
    EmptyFileList { which: &'static str },
    CountMismatch {
        tpl_count: usize,
        inp_count: usize,
    },
    InsCountMismatch {
        ins_count: usize,
        out_count: usize,
    },
    UnknownParameterName(String),
    UnknownObservationName(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyCommandList => write!(f, "at least one command is required"),
            ConfigError::EmptyFileList { which } => write!(f, "{which} file list must not be empty"),
            ConfigError::CountMismatch { tpl_count, inp_count } => write!(
                f,
                "template/input file count mismatch: {tpl_count} templates, {inp_count} input paths"
            ),
            ConfigError::InsCountMismatch { ins_count, out_count } => write!(
                f,
                "instruction/output file count mismatch: {ins_count} instruction files, {out_count} output paths"
            ),
            ConfigError::UnknownParameterName(name) => write!(
                f,
                "template file references parameter '{name}', which is not in the declared parameter names"
            ),
            ConfigError::UnknownObservationName(name) => write!(
                f,
                "instruction file declares observation '{name}', which is not in the declared observation names"
            ),
        }
    }
}

/// Raised when stale input/output files from a previous evaluation could
/// not be removed before a fresh one starts.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHygieneError {
    pub paths: Vec<PathBuf>,
    pub attempts: usize,
}

impl fmt::Display for FileHygieneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        write!(
            f,
            "could not delete stale file(s) after {} attempt(s): {}",
            self.attempts,
            names.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    Config(ConfigError),
    Tpl(TplError),
    Ins(InsError),
    FileHygiene(FileHygieneError),
    Runner(RunnerError),
    /// Defensive; should never fire.
    InternalInvariant(String),
}

impl std::error::Error for ModelError {}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Config(e) => write!(f, "{e}"),
            ModelError::Tpl(e) => write!(f, "{e}"),
            ModelError::Ins(e) => write!(f, "{e}"),
            ModelError::FileHygiene(e) => write!(f, "{e}"),
            ModelError::Runner(e) => write!(f, "{e}"),
            ModelError::InternalInvariant(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl From<ConfigError> for ModelError {
    fn from(e: ConfigError) -> Self {
        ModelError::Config(e)
    }
}

impl From<TplError> for ModelError {
    fn from(e: TplError) -> Self {
        ModelError::Tpl(e)
    }
}

impl From<InsError> for ModelError {
    fn from(e: InsError) -> Self {
        ModelError::Ins(e)
    }
}

impl From<RunnerError> for ModelError {
    fn from(e: RunnerError) -> Self {
        ModelError::Runner(e)
    }
}

impl From<FileHygieneError> for ModelError {
    fn from(e: FileHygieneError) -> Self {
        ModelError::FileHygiene(e)
    }
}
