//! Forward-only cursor over a model output file: tracks the current
//! line and column the way the instruction interpreter consumes them.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use super::error::InsError;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?\d+(\.\d+)?([eEdD][+-]?\d+)?$").expect("static"))
}

/// Parse a token as a double the way an INS numeric field does: Fortran's
/// `D` exponent marker is accepted alongside `E`.
pub(crate) fn parse_double(token: &str) -> Option<f64> {
    let t = token.trim();
    if t.is_empty() || !number_re().is_match(t) {
        return None;
    }
    t.replace(['d', 'D'], "E").parse().ok()
}

pub struct OutputCursor {
    reader: BufReader<File>,
    path: PathBuf,
    line: Option<Vec<char>>,
    col: usize,
    line_num: usize,
}

impl OutputCursor {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InsError> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| InsError::Header {
            path: path.clone(),
            message: format!("could not open output file: {e}"),
        })?;
        Ok(Self {
            reader: BufReader::new(file),
            path,
            line: None,
            col: 0,
            line_num: 0,
        })
    }

    /// Current line in the output file, 1-indexed, for diagnostics.
    pub(crate) fn line_num(&self) -> usize {
        self.line_num
    }

    /// Current column, 1-indexed, for diagnostics.
    pub fn col(&self) -> usize {
        self.col + 1
    }

    fn ensure_line(&mut self) -> Result<(), InsError> {
        if self.line.is_none() {
            self.advance_line()?;
        }
        Ok(())
    }

    /// Move to the next line of the output file, resetting the column.
    pub fn advance_line(&mut self) -> Result<(), InsError> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).map_err(|e| InsError::Header {
            path: self.path.clone(),
            message: format!("error reading output file: {e}"),
        })?;
        if n == 0 {
            return Err(InsError::UnexpectedEof {
                path: self.path.clone(),
                line: self.line_num + 1,
            });
        }
        let trimmed = buf.trim_end_matches(['\n', '\r']);
        self.line = Some(trimmed.chars().collect());
        self.col = 0;
        self.line_num += 1;
        Ok(())
    }

    pub fn advance_lines(&mut self, n: usize) -> Result<(), InsError> {
        for _ in 0..n.max(1) {
            self.advance_line()?;
        }
        Ok(())
    }

    fn chars(&self) -> &[char] {
        self.line.as_deref().unwrap_or(&[])
    }

    fn is_ws(c: char) -> bool {
        c.is_whitespace()
    }

    /// Skip the whitespace run starting at the current column, landing on
    /// the next non-whitespace column (or end of line).
    pub fn skip_whitespace_run(&mut self) -> Result<(), InsError> {
        self.ensure_line()?;
        while self.col < self.chars().len() && Self::is_ws(self.chars()[self.col]) {
            self.col += 1;
        }
        Ok(())
    }

    /// Skip the current whitespace-delimited token, then the whitespace run
    /// that follows it. Used by `Wn` and `DUM`.
    pub fn skip_token_and_trailing_whitespace(&mut self) -> Result<(), InsError> {
        self.ensure_line()?;
        self.skip_whitespace_run()?;
        while self.col < self.chars().len() && !Self::is_ws(self.chars()[self.col]) {
            self.col += 1;
        }
        self.skip_whitespace_run()
    }

    /// Read the next whitespace-delimited token and advance past it.
    pub fn read_free_token(&mut self) -> Result<String, InsError> {
        self.ensure_line()?;
        self.skip_whitespace_run()?;
        let start = self.col;
        while self.col < self.chars().len() && !Self::is_ws(self.chars()[self.col]) {
            self.col += 1;
        }
        if start == self.col {
            return Err(InsError::UnexpectedEof {
                path: self.path.clone(),
                line: self.line_num,
            });
        }
        Ok(self.chars()[start..self.col].iter().collect())
    }

    /// Move the column to `col` (1-indexed) if not already past it, then
    /// perform a normal free read.
    pub fn read_free_hinted(&mut self, col_hint: usize) -> Result<String, InsError> {
        self.ensure_line()?;
        if col_hint >= 1 && self.col < col_hint - 1 {
            self.col = col_hint - 1;
        }
        self.read_free_token()
    }

    /// Extract the exact inclusive character span `[start, end]` (1-indexed),
    /// without moving the column.
    pub fn read_fixed(&mut self, start: usize, end: usize) -> Result<String, InsError> {
        self.ensure_line()?;
        let chars = self.chars();
        let lo = start.saturating_sub(1).min(chars.len());
        let hi = end.min(chars.len());
        let text: String = if lo < hi { chars[lo..hi].iter().collect() } else { String::new() };
        self.col = end.max(self.col);
        Ok(text)
    }

    /// Find the whitespace-delimited token overlapping `[start, end]`
    /// (1-indexed, inclusive) and advance past it.
    pub fn read_semi(&mut self, start: usize, end: usize) -> Result<String, InsError> {
        self.ensure_line()?;
        let chars = self.chars().to_vec();
        let mut lo = start.saturating_sub(1).min(chars.len());
        while lo > 0 && !Self::is_ws(chars[lo - 1]) {
            lo -= 1;
        }
        let mut hi = end.min(chars.len());
        while hi < chars.len() && !Self::is_ws(chars[hi]) {
            hi += 1;
        }
        self.col = hi;
        Ok(chars[lo..hi].iter().collect())
    }

    /// Search forward, possibly across lines, for `text`; land just past
    /// the match. Used for the first (primary) search token on a line.
    pub fn primary_search(&mut self, text: &str) -> Result<(), InsError> {
        loop {
            self.ensure_line()?;
            let line: String = self.chars()[self.col.min(self.chars().len())..].iter().collect();
            if let Some(pos) = line.find(text) {
                let prefix_chars = line[..pos].chars().count();
                self.col += prefix_chars + text.chars().count();
                return Ok(());
            }
            self.advance_line()?;
        }
    }

    /// Search within the remainder of the current line only.
    pub fn secondary_search(&mut self, text: &str) -> Result<(), InsError> {
        self.ensure_line()?;
        let line: String = self.chars()[self.col.min(self.chars().len())..].iter().collect();
        match line.find(text) {
            Some(pos) => {
                let prefix_chars = line[..pos].chars().count();
                self.col += prefix_chars + text.chars().count();
                Ok(())
            }
            None => Err(InsError::UnexpectedEof {
                path: self.path.clone(),
                line: self.line_num,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cursor(contents: &str) -> (OutputCursor, tempfile::NamedTempFile) {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (OutputCursor::open(f.path()).unwrap(), f)
    }

    #[test]
    fn free_tokens_advance_left_to_right() {
        let (mut c, _f) = cursor("alpha beta  gamma\n");
        assert_eq!(c.read_free_token().unwrap(), "alpha");
        assert_eq!(c.read_free_token().unwrap(), "beta");
        assert_eq!(c.read_free_token().unwrap(), "gamma");
    }

    #[test]
    fn fixed_read_does_not_move_past_its_own_span() {
        let (mut c, _f) = cursor("0123456789\n");
        assert_eq!(c.read_fixed(3, 5).unwrap(), "234");
    }

    #[test]
    fn semi_read_grabs_overlapping_token() {
        let (mut c, _f) = cursor("  foo bar  \n");
        // columns are 1-indexed; "bar" occupies columns 7-9
        assert_eq!(c.read_semi(8, 8).unwrap(), "bar");
    }

    #[test]
    fn primary_search_crosses_lines() {
        let (mut c, _f) = cursor("nothing here\nHead: 42\n");
        c.primary_search("Head:").unwrap();
        assert_eq!(c.read_free_token().unwrap(), "42");
    }

    #[test]
    fn parse_double_accepts_fortran_exponent() {
        assert_eq!(parse_double("1.5D+02"), Some(150.0));
        assert_eq!(parse_double("not-a-number"), None);
    }
}
