//! INS: the instruction-file mini-language used to pull named scalar
//! observations out of a model output file.
//!
//! ```text
//! PIF ~
//! ~Head at node~ !obs1!
//! l1 [obs2]10:20
//! ```
//! The first line names a single marker character used to delimit search
//! text. Every later line is a sequence of whitespace-delimited
//! instructions executed left to right against a forward-only cursor over
//! the output file; a line beginning with `&` continues the previous line's
//! instruction sequence instead of starting a new one.

pub mod error;
mod cursor;
mod instruction;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging;
use crate::names::ObservationSink;
use crate::tpl::parse_header;

pub use error::InsError;
use cursor::{parse_double, OutputCursor};
use instruction::{parse_line, Instruction};

/// A parsed instruction file, analogous to [`crate::tpl::TemplateFile`].
#[derive(Debug, Clone)]
pub struct InstructionFile {
    path: PathBuf,
    marker: char,
}

impl InstructionFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InsError> {
        let path = path.into();
        let contents = fs::read_to_string(&path).map_err(|e| InsError::Header {
            path: path.clone(),
            message: format!("could not read instruction file: {e}"),
        })?;
        let header = contents.lines().next().ok_or_else(|| InsError::Header {
            path: path.clone(),
            message: "file is empty, expected 'PIF <marker>'".to_string(),
        })?;
        let marker = parse_header(header, "PIF", &path).map_err(|e| InsError::Header {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { path, marker })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate the whole file and return the set of observation names it
    /// declares via `!name!`, `[name]s:e`, `{name}s:e`, or `(name)s:e`.
    pub fn parse_and_check(&self) -> Result<HashSet<String>, InsError> {
        let contents = fs::read_to_string(&self.path).map_err(|e| InsError::Header {
            path: self.path.clone(),
            message: format!("could not read instruction file: {e}"),
        })?;
        let mut names = HashSet::new();
        for (line_no, line) in logical_lines(&contents) {
            for instr in parse_line(&line, self.marker, line_no, &self.path)? {
                if let Some(name) = declared_name(&instr) {
                    names.insert(name);
                }
            }
        }
        Ok(names)
    }

    /// Execute this file's instructions against `output_path` in order,
    /// merging each binding into `bound`. Does not check completeness —
    /// callers that read more than one instruction file into a shared
    /// observation set perform that check once, after every file has run;
    /// see [`Self::read_output_file`] for the standalone single-file form.
    pub(crate) fn bind_into(
        &self,
        output_path: impl AsRef<Path>,
        bound: &mut HashMap<String, f64>,
    ) -> Result<(), InsError> {
        let contents = fs::read_to_string(&self.path).map_err(|e| InsError::Header {
            path: self.path.clone(),
            message: format!("could not read instruction file: {e}"),
        })?;
        let mut cursor = OutputCursor::open(output_path.as_ref())?;

        for (line_no, line) in logical_lines(&contents) {
            for instr in parse_line(&line, self.marker, line_no, &self.path)? {
                execute(&instr, &mut cursor, bound, &self.path)?;
            }
        }
        Ok(())
    }

    /// Read `output_path` and write every bound value into `sink` in one
    /// shot. Every name `sink` expects (`sink.get_keys()`) must receive a
    /// binding or this fails with [`InsError::MissingObs`]. For orchestrating
    /// several instruction files against one shared observation set, use
    /// [`Self::bind_into`] and perform the completeness check once yourself.
    pub fn read_output_file(
        &self,
        output_path: impl AsRef<Path>,
        sink: &mut impl ObservationSink,
    ) -> Result<(), InsError> {
        let mut bound: HashMap<String, f64> = HashMap::new();
        self.bind_into(output_path, &mut bound)?;

        let names: Vec<String> = sink.get_keys();
        let mut values = Vec::with_capacity(names.len());
        for name in &names {
            match bound.get(name) {
                Some(v) => values.push(*v),
                None => {
                    return Err(InsError::MissingObs {
                        path: self.path.clone(),
                        name: name.clone(),
                    })
                }
            }
        }
        sink.update(&names, &values);
        Ok(())
    }
}

fn declared_name(instr: &Instruction) -> Option<String> {
    match instr {
        Instruction::Free(name)
        | Instruction::Fixed { name, .. }
        | Instruction::Semi { name, .. }
        | Instruction::FreeHinted { name, .. } => Some(name.clone()),
        _ => None,
    }
}

fn bind(
    bound: &mut HashMap<String, f64>,
    name: &str,
    text: &str,
    line_no: usize,
    col: usize,
    path: &Path,
) -> Result<(), InsError> {
    let value = parse_double(text).ok_or_else(|| InsError::ParseNumber {
        path: path.to_path_buf(),
        name: name.to_string(),
        line: line_no,
        col,
    })?;
    if bound.insert(name.to_string(), value).is_some() {
        logging::warning_untagged(InsError::DuplicateObs { name: name.to_string() }.to_string());
    }
    Ok(())
}

fn execute(
    instr: &Instruction,
    cursor: &mut OutputCursor,
    bound: &mut HashMap<String, f64>,
    path: &Path,
) -> Result<(), InsError> {
    match instr {
        Instruction::LineAdvance(n) => cursor.advance_lines(*n),
        Instruction::Whitespace(None) => cursor.skip_whitespace_run(),
        Instruction::Whitespace(Some(n)) => {
            for _ in 0..*n {
                cursor.skip_token_and_trailing_whitespace()?;
            }
            Ok(())
        }
        Instruction::Dum => cursor.skip_token_and_trailing_whitespace(),
        Instruction::Free(name) => {
            let text = cursor.read_free_token()?;
            bind(bound, name, &text, cursor.line_num(), cursor.col(), path)
        }
        Instruction::Fixed { name, start, end } => {
            let text = cursor.read_fixed(*start, *end)?;
            bind(bound, name, &text, cursor.line_num(), *start, path)
        }
        Instruction::Semi { name, start, end } => {
            let text = cursor.read_semi(*start, *end)?;
            bind(bound, name, &text, cursor.line_num(), *start, path)
        }
        Instruction::FreeHinted { name, start, .. } => {
            let text = cursor.read_free_hinted(*start)?;
            bind(bound, name, &text, cursor.line_num(), cursor.col(), path)
        }
        Instruction::Primary(text) => cursor.primary_search(text),
        Instruction::Secondary(text) => cursor.secondary_search(text),
    }
}

/// Join `&`-prefixed continuation lines onto the previous logical line,
/// returning each logical line paired with the 1-indexed source line
/// number of its first physical line.
fn logical_lines(contents: &str) -> Vec<(usize, String)> {
    let mut groups: Vec<(usize, String)> = Vec::new();
    for (idx, raw) in contents.lines().enumerate().skip(1) {
        let trimmed = raw.trim_start();
        if let Some(cont) = trimmed.strip_prefix('&') {
            match groups.last_mut() {
                Some(last) => {
                    last.1.push(' ');
                    last.1.push_str(cont.trim());
                }
                None => groups.push((idx + 1, cont.trim().to_string())),
            }
        } else {
            groups.push((idx + 1, raw.to_string()));
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::ValueMap;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parse_and_check_collects_all_declared_forms() {
        let dir = tempfile::tempdir().unwrap();
        let ins = write_file(&dir, "m.ins", "PIF ~\n~Head~ !obs1! [obs2]10:15 {obs3}1:3\n");
        let f = InstructionFile::open(&ins).unwrap();
        let names = f.parse_and_check().unwrap();
        assert_eq!(names.len(), 3);
        assert!(names.contains("OBS1"));
        assert!(names.contains("OBS2"));
        assert!(names.contains("OBS3"));
    }

    #[test]
    fn free_read_after_primary_search_binds_value() {
        let dir = tempfile::tempdir().unwrap();
        let ins = write_file(&dir, "m.ins", "PIF ~\n~Head:~ !obs1!\n");
        let out = write_file(&dir, "m.out", "noise\nHead: 3.5\n");
        let f = InstructionFile::open(&ins).unwrap();
        let mut sink = ValueMap::new();
        sink.set("obs1", 0.0);
        f.read_output_file(&out, &mut sink).unwrap();
        assert_eq!(sink.get("OBS1"), Some(3.5));
    }

    #[test]
    fn line_advance_then_fixed_read() {
        let dir = tempfile::tempdir().unwrap();
        let ins = write_file(&dir, "m.ins", "PIF ~\nl2 [obs1]1:3\n");
        let out = write_file(&dir, "m.out", "header\n123456\n");
        let f = InstructionFile::open(&ins).unwrap();
        let mut sink = ValueMap::new();
        sink.set("obs1", 0.0);
        f.read_output_file(&out, &mut sink).unwrap();
        assert_eq!(sink.get("OBS1"), Some(123.0));
    }

    #[test]
    fn continuation_line_extends_previous_instructions() {
        let dir = tempfile::tempdir().unwrap();
        let ins = write_file(&dir, "m.ins", "PIF ~\n!obs1!\n& !obs2!\n");
        let out = write_file(&dir, "m.out", "1.0 2.0\n");
        let f = InstructionFile::open(&ins).unwrap();
        let names = f.parse_and_check().unwrap();
        assert_eq!(names.len(), 2);
        let mut sink = ValueMap::new();
        sink.set("obs1", 0.0);
        sink.set("obs2", 0.0);
        f.read_output_file(&out, &mut sink).unwrap();
        assert_eq!(sink.get("OBS1"), Some(1.0));
        assert_eq!(sink.get("OBS2"), Some(2.0));
    }

    #[test]
    fn missing_binding_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ins = write_file(&dir, "m.ins", "PIF ~\n!obs1!\n");
        let out = write_file(&dir, "m.out", "1.0\n");
        let f = InstructionFile::open(&ins).unwrap();
        let mut sink = ValueMap::new();
        sink.set("obs1", 0.0);
        sink.set("obs_never_bound", 0.0);
        let err = f.read_output_file(&out, &mut sink).unwrap_err();
        assert!(matches!(err, InsError::MissingObs { .. }));
    }
}
