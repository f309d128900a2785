//! TPL: the template-file mini-language used to materialize simulator
//! input files from parameter values.
//!
//! Grammar:
//! ```text
//! PTF ~
//! x= ~PAR1    ~ end
//! ```
//! The first line names a single marker character; every later line may
//! contain zero or more *fields* delimited by a pair of that marker. The
//! whitespace-trimmed, upper-cased text between a pair is the field's
//! parameter name; the inclusive span (both markers included) is the
//! field's declared width.

pub mod error;

use std::fs;
use std::path::{Path, PathBuf};

use crate::format::format_fixed_width;
use crate::names::{canonicalize, ParameterSource};

pub use error::TplError;

/// One field on a TPL line: a parameter name bound to a char span.
#[derive(Debug, Clone)]
struct TemplateField {
    name: String,
    /// Inclusive start column (char index), at the opening marker.
    start: usize,
    /// Inclusive end column (char index), at the closing marker.
    end: usize,
}

impl TemplateField {
    fn width(&self) -> usize {
        self.end - self.start + 1
    }
}

/// A parsed template file. Reusable across evaluations — each call to
/// [`TemplateFile::parse_and_check`] or [`TemplateFile::write_input_file`]
/// re-opens and re-scans the underlying file, so external edits between
/// evaluations are picked up.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    path: PathBuf,
    marker: char,
}

impl TemplateFile {
    /// Open a template file, reading and validating just its header line.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TplError> {
        let path = path.into();
        let contents = read_to_string(&path)?;
        let mut lines = contents.lines();
        let header = lines.next().ok_or_else(|| TplError::Header {
            path: path.clone(),
            message: "file is empty, expected 'PTF <marker>'".to_string(),
        })?;
        let marker = parse_header(header, "PTF", &path)?;
        Ok(Self { path, marker })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn marker(&self) -> char {
        self.marker
    }

    /// Validate the whole file and return the set of parameter names it
    /// references. Does not check those names exist in any catalog.
    pub fn parse_and_check(&self) -> Result<std::collections::HashSet<String>, TplError> {
        let contents = read_to_string(&self.path)?;
        let mut names = std::collections::HashSet::new();
        for (line_no, line) in contents.lines().enumerate().skip(1) {
            let fields = parse_line_fields(line, self.marker, line_no + 1, &self.path)?;
            names.extend(fields.into_iter().map(|f| f.name));
        }
        Ok(names)
    }

    /// Instantiate this template into `out_path`, pulling parameter values
    /// from `params`. Fails without writing a complete file if any
    /// referenced parameter is missing or cannot be rendered to width.
    pub fn write_input_file(
        &self,
        out_path: impl AsRef<Path>,
        params: &impl ParameterSource,
    ) -> Result<(), TplError> {
        let contents = read_to_string(&self.path)?;
        let mut out = String::new();
        for (line_no, line) in contents.lines().enumerate().skip(1) {
            let fields = parse_line_fields(line, self.marker, line_no + 1, &self.path)?;
            out.push_str(&instantiate_line(line, &fields, params, line_no + 1, &self.path)?);
            out.push('\n');
        }
        fs::write(out_path.as_ref(), out).map_err(|e| TplError::Io {
            path: out_path.as_ref().to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

fn read_to_string(path: &Path) -> Result<String, TplError> {
    fs::read_to_string(path).map_err(|e| TplError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse a `PTF <marker>` / `PIF <marker>` header line shared by TPL/INS.
pub(crate) fn parse_header(line: &str, tag: &str, path: &Path) -> Result<char, TplError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(TplError::Header {
            path: path.to_path_buf(),
            message: format!("incorrect first line - expecting '{tag} <marker>'"),
        });
    }
    if tokens.len() > 2 {
        return Err(TplError::Header {
            path: path.to_path_buf(),
            message: "extra unused items on first line".to_string(),
        });
    }
    if tokens[0].to_uppercase() != tag {
        return Err(TplError::Header {
            path: path.to_path_buf(),
            message: format!("first line should start with '{tag}', not: {}", tokens[0]),
        });
    }
    let mut marker_chars = tokens[1].chars();
    let marker = marker_chars.next().ok_or_else(|| TplError::Header {
        path: path.to_path_buf(),
        message: "marker on first line must not be empty".to_string(),
    })?;
    if marker_chars.next().is_some() {
        return Err(TplError::Header {
            path: path.to_path_buf(),
            message: format!("marker on first line should be one character, not: {}", tokens[1]),
        });
    }
    Ok(marker)
}

fn parse_line_fields(
    line: &str,
    marker: char,
    line_no: usize,
    path: &Path,
) -> Result<Vec<TemplateField>, TplError> {
    let chars: Vec<char> = line.chars().collect();
    let marker_positions: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == marker)
        .map(|(i, _)| i)
        .collect();
    if marker_positions.len() % 2 != 0 {
        return Err(TplError::UnbalancedMarker {
            path: path.to_path_buf(),
            line: line_no,
        });
    }
    let mut fields = Vec::new();
    for pair in marker_positions.chunks_exact(2) {
        let (start, end) = (pair[0], pair[1]);
        let name: String = chars[start + 1..end].iter().collect();
        fields.push(TemplateField {
            name: canonicalize(&name),
            start,
            end,
        });
    }
    Ok(fields)
}

fn instantiate_line(
    line: &str,
    fields: &[TemplateField],
    params: &impl ParameterSource,
    line_no: usize,
    path: &Path,
) -> Result<String, TplError> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0usize;
    for field in fields {
        out.extend(&chars[cursor..field.start]);
        let value = params.get_rec(&field.name).ok_or_else(|| TplError::UnknownParameter {
            path: path.to_path_buf(),
            name: field.name.clone(),
            line: line_no,
        })?;
        out.push_str(&format_fixed_width(value, field.width(), &field.name)?);
        cursor = field.end + 1;
    }
    out.extend(&chars[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::ValueMap;
    use std::io::Write;

    fn write_tpl(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_and_check_collects_names_across_lines() {
        let f = write_tpl("PTF ~\nx= ~PAR1    ~ end\ny= ~par2~ ~PAR1~\n");
        let tpl = TemplateFile::open(f.path()).unwrap();
        let names = tpl.parse_and_check().unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains("PAR1"));
        assert!(names.contains("PAR2"));
    }

    #[test]
    fn unbalanced_marker_is_reported_on_its_line() {
        let f = write_tpl("PTF ~\nok line\n~PAR1 end\n");
        let tpl = TemplateFile::open(f.path()).unwrap();
        let err = tpl.parse_and_check().unwrap_err();
        assert_eq!(err, TplError::UnbalancedMarker { path: f.path().to_path_buf(), line: 3 });
    }

    #[test]
    fn write_input_file_replaces_fields_in_place() {
        let f = write_tpl("PTF ~\nx= ~PAR1    ~ end\n");
        let tpl = TemplateFile::open(f.path()).unwrap();
        let mut params = ValueMap::new();
        params.set("PAR1", -1.5);
        let out = tempfile::NamedTempFile::new().unwrap();
        tpl.write_input_file(out.path(), &params).unwrap();
        let written = fs::read_to_string(out.path()).unwrap();
        assert_eq!(written, "x= -1.5000000 end\n");
    }

    #[test]
    fn missing_parameter_is_fatal() {
        let f = write_tpl("PTF ~\nx= ~PAR1~\n");
        let tpl = TemplateFile::open(f.path()).unwrap();
        let params = ValueMap::new();
        let out = tempfile::NamedTempFile::new().unwrap();
        let err = tpl.write_input_file(out.path(), &params).unwrap_err();
        assert!(matches!(err, TplError::UnknownParameter { .. }));
    }

    #[test]
    fn header_errors_are_rejected() {
        let f = write_tpl("not a header\n");
        assert!(TemplateFile::open(f.path()).is_err());

        let f = write_tpl("PTF ~~\n");
        assert!(TemplateFile::open(f.path()).is_err());
    }

    #[test]
    fn multiple_fields_on_one_line_are_independent() {
        let f = write_tpl("PTF @\na @A   @ b @BB    @ c\n");
        let tpl = TemplateFile::open(f.path()).unwrap();
        let mut params = ValueMap::new();
        params.set("A", 2.0);
        params.set("BB", 3.5);
        let out = tempfile::NamedTempFile::new().unwrap();
        tpl.write_input_file(out.path(), &params).unwrap();
        let written = fs::read_to_string(out.path()).unwrap();
        assert_eq!(written, "a 2.0000 b 3.500000 c\n");
    }
}
