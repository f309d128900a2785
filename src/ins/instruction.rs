//! Instruction tokens: the parsed form of one whitespace-delimited word
//! on an instruction-file line.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::names::canonicalize;

use super::error::InsError;

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `L`, `L3`, ... — advance the output cursor this many lines (default 1).
    LineAdvance(usize),
    /// Bare `W` skips the whitespace run at the current column, landing on
    /// the next non-whitespace column. `Wn` repeats "skip the current
    /// token, then its trailing whitespace run" `n` times.
    Whitespace(Option<usize>),
    /// `DUM` — skip the next whitespace-delimited token without binding it.
    Dum,
    /// `!name!` — free (whitespace-delimited) read, bound to `name`.
    Free(String),
    /// `[name]s:e` — exact fixed-column read.
    Fixed { name: String, start: usize, end: usize },
    /// `{name}s:e` — semi-fixed read: the token overlapping `[s, e]`.
    Semi { name: String, start: usize, end: usize },
    /// `(name)s:e` — free read with a column hint.
    FreeHinted { name: String, start: usize, end: usize },
    /// `~text~` — anchor a search for `text`, forward across lines, to the
    /// first instruction on an instruction line.
    Primary(String),
    /// `~text~` — search for `text` within the remainder of the current
    /// line only, used for any such token after the line's primary anchor.
    Secondary(String),
}

fn bracket_regex(open: char, close: char) -> Regex {
    let pattern = format!(
        "^{}(?P<name>[^\\{close}]+){}(?P<start>\\d+):(?P<end>\\d+)$",
        regex::escape(&open.to_string()),
        regex::escape(&close.to_string()),
    );
    Regex::new(&pattern).expect("static bracket pattern is valid")
}

fn fixed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| bracket_regex('[', ']'))
}

fn semi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| bracket_regex('{', '}'))
}

fn free_hinted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| bracket_regex('(', ')'))
}

/// Parse one logical instruction line (continuation lines already joined)
/// into its ordered list of instructions.
pub(crate) fn parse_line(
    line: &str,
    marker: char,
    line_no: usize,
    path: &Path,
) -> Result<Vec<Instruction>, InsError> {
    let mut out = Vec::new();
    let mut anchored = false;
    for token in line.split_whitespace() {
        out.push(parse_token(token, marker, line_no, path, &mut anchored)?);
    }
    Ok(out)
}

fn parse_token(
    token: &str,
    marker: char,
    line_no: usize,
    path: &Path,
    anchored: &mut bool,
) -> Result<Instruction, InsError> {
    if token.len() >= 2 && token.starts_with(marker) && token.ends_with(marker) {
        let text = &token[marker.len_utf8()..token.len() - marker.len_utf8()];
        if text.contains(marker) {
            return Err(InsError::UnbalancedTag {
                path: path.to_path_buf(),
                token: token.to_string(),
                line: line_no,
            });
        }
        return Ok(if std::mem::replace(anchored, true) {
            Instruction::Secondary(text.to_string())
        } else {
            Instruction::Primary(text.to_string())
        });
    }

    if token.starts_with('!') {
        if !token.ends_with('!') || token.len() < 2 {
            return Err(InsError::UnbalancedTag {
                path: path.to_path_buf(),
                token: token.to_string(),
                line: line_no,
            });
        }
        let name = token[1..token.len() - 1].trim();
        return Ok(Instruction::Free(canonicalize(name)));
    }

    if let Some(caps) = fixed_re().captures(token) {
        return Ok(Instruction::Fixed {
            name: canonicalize(caps.name("name").unwrap().as_str()),
            start: caps.name("start").unwrap().as_str().parse().unwrap(),
            end: caps.name("end").unwrap().as_str().parse().unwrap(),
        });
    }
    if let Some(caps) = semi_re().captures(token) {
        return Ok(Instruction::Semi {
            name: canonicalize(caps.name("name").unwrap().as_str()),
            start: caps.name("start").unwrap().as_str().parse().unwrap(),
            end: caps.name("end").unwrap().as_str().parse().unwrap(),
        });
    }
    if let Some(caps) = free_hinted_re().captures(token) {
        return Ok(Instruction::FreeHinted {
            name: canonicalize(caps.name("name").unwrap().as_str()),
            start: caps.name("start").unwrap().as_str().parse().unwrap(),
            end: caps.name("end").unwrap().as_str().parse().unwrap(),
        });
    }

    if token.eq_ignore_ascii_case("DUM") {
        return Ok(Instruction::Dum);
    }

    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.eq_ignore_ascii_case(&'l') => {
            let rest = chars.as_str();
            if rest.is_empty() {
                return Ok(Instruction::LineAdvance(1));
            }
            if let Ok(n) = rest.parse::<usize>() {
                return Ok(Instruction::LineAdvance(n));
            }
        }
        Some(c) if c.eq_ignore_ascii_case(&'w') => {
            let rest = chars.as_str();
            if rest.is_empty() {
                return Ok(Instruction::Whitespace(None));
            }
            if let Ok(n) = rest.parse::<usize>() {
                return Ok(Instruction::Whitespace(Some(n)));
            }
        }
        _ => {}
    }

    Err(InsError::BadInstruction {
        path: path.to_path_buf(),
        token: token.to_string(),
        line: line_no,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(line: &str) -> Vec<Instruction> {
        parse_line(line, '~', 2, &PathBuf::from("t.ins")).unwrap()
    }

    #[test]
    fn line_and_whitespace_advance() {
        assert_eq!(parse("L1 L3 W W2"), vec![
            Instruction::LineAdvance(1),
            Instruction::LineAdvance(3),
            Instruction::Whitespace(None),
            Instruction::Whitespace(Some(2)),
        ]);
    }

    #[test]
    fn dum_and_free() {
        assert_eq!(parse("DUM !obs1!"), vec![
            Instruction::Dum,
            Instruction::Free("OBS1".to_string()),
        ]);
    }

    #[test]
    fn fixed_semi_and_hinted() {
        assert_eq!(parse("[a]1:5 {b}6:10 (c)11:15"), vec![
            Instruction::Fixed { name: "A".into(), start: 1, end: 5 },
            Instruction::Semi { name: "B".into(), start: 6, end: 10 },
            Instruction::FreeHinted { name: "C".into(), start: 11, end: 15 },
        ]);
    }

    #[test]
    fn first_marker_pair_is_primary_rest_secondary() {
        assert_eq!(parse("~head~ !a! ~tail~"), vec![
            Instruction::Primary("head".to_string()),
            Instruction::Free("A".to_string()),
            Instruction::Secondary("tail".to_string()),
        ]);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = parse_line("Q7", '~', 2, &PathBuf::from("t.ins")).unwrap_err();
        assert!(matches!(err, InsError::BadInstruction { .. }));
    }
}
