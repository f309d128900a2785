//! Fixed-width numeric formatting.
//!
//! The simulator parses its input files by fixed column; any deviation from
//! the declared field width silently corrupts the model. [`format_fixed_width`]
//! is the one place in the crate that is allowed to get this wrong, so it is
//! kept small and tested against worked examples covering every branch.

use std::fmt;

/// Errors raised while rendering a value into a fixed-width field.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// `v` is NaN or infinite and has no fixed-width representation.
    NonFiniteValue { name: String },
    /// No precision (down to zero significant digits) fits `v` into `width`
    /// characters.
    FormatOverflow { name: String, value: f64, width: usize },
    /// The renderer produced a string of the wrong length after the pad
    /// step; this should never happen and indicates a bug in this module.
    InternalInvariant {
        name: String,
        width: usize,
        got_len: usize,
    },
}

impl std::error::Error for FormatError {}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::NonFiniteValue { name } => {
                write!(f, "value for '{name}' is NaN or infinite and cannot be formatted")
            }
            FormatError::FormatOverflow { name, value, width } => {
                write!(
                    f,
                    "cannot represent value {value} for '{name}' in a field only {width} chars wide"
                )
            }
            FormatError::InternalInvariant { name, width, got_len } => {
                write!(
                    f,
                    "internal error formatting '{name}': expected {width} chars, produced {got_len}"
                )
            }
        }
    }
}

/// Render `value` into exactly `width` characters, for diagnostics purposes
/// attributed to `name` (a parameter name).
///
/// Values with `|v| >= 10` or `|v| <= 1`
/// are rendered in scientific notation (to preserve significant digits for
/// very small magnitudes); everything else uses fixed notation. Precision is
/// reduced until the rendered string fits in `width`, then zero-padded on
/// rounding undershoot.
pub fn format_fixed_width(value: f64, width: usize, name: &str) -> Result<String, FormatError> {
    if !value.is_finite() {
        return Err(FormatError::NonFiniteValue {
            name: name.to_string(),
        });
    }
    if width == 0 {
        return Err(FormatError::FormatOverflow {
            name: name.to_string(),
            value,
            width,
        });
    }

    let negative = value.is_sign_negative() && value != 0.0;
    let mut precision: i64 = width as i64;
    if negative {
        precision -= 1;
    }

    let scientific = value.abs() >= 10.0 || value.abs() <= 1.0;
    if scientific {
        let exponent_digits = provisional_exponent_digit_count(value);
        let reserve = if exponent_digits >= 3 { 3 } else { 2 };
        precision -= reserve;
    }

    let rendered = loop {
        if precision < 0 {
            return Err(FormatError::FormatOverflow {
                name: name.to_string(),
                value,
                width,
            });
        }
        let candidate = if scientific {
            render_scientific(value, precision as usize)
        } else {
            render_fixed(value, precision as usize)
        };
        if candidate.len() <= width {
            break candidate;
        }
        precision -= 1;
    };

    let padded = pad_to_width(&rendered, width);
    if padded.len() != width {
        return Err(FormatError::InternalInvariant {
            name: name.to_string(),
            width,
            got_len: padded.len(),
        });
    }
    Ok(padded)
}

/// Render in PEST-style scientific notation: `<mantissa>E<+|-><exponent>`,
/// no padding on the exponent.
fn render_scientific(value: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    let e_pos = raw.find('e').expect("LowerExp output always has 'e'");
    let mantissa = &raw[..e_pos];
    let exponent = &raw[e_pos + 1..];
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("+", exponent),
    };
    format!("{mantissa}E{sign}{digits}")
}

fn render_fixed(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

/// Estimate the number of decimal digits in the exponent `format_fixed_width`
/// will end up producing, used only to decide whether to reserve 2 or 3
/// characters for `E<sign><exponent>` before the precision-shrink loop
/// starts. A zero-precision render is cheap and matches the exponent any
/// higher-precision render of the same value will choose.
fn provisional_exponent_digit_count(value: f64) -> usize {
    let raw = format!("{:.0e}", value);
    let e_pos = raw.find('e').expect("LowerExp output always has 'e'");
    raw[e_pos + 1..].trim_start_matches('-').len()
}

/// Left-pad `s` with `'0'` to `width`, inserting the padding after any sign
/// character so the result stays a parseable number (rounding can
/// occasionally drop one trailing digit, landing one character short).
fn pad_to_width(s: &str, width: usize) -> String {
    if s.len() >= width {
        return s.to_string();
    }
    let (sign, digits) = if let Some(rest) = s.strip_prefix('-') {
        ("-", rest)
    } else {
        ("", s)
    };
    let pad_len = width - s.len();
    format!("{sign}{}{digits}", "0".repeat(pad_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_8_scientific_large_value() {
        let got = format_fixed_width(1.23456789e10, 8, "PAR1").unwrap();
        assert_eq!(got.len(), 8);
        assert_eq!(got, "1.23E+10");
    }

    #[test]
    fn width_6_negative_fixed() {
        let got = format_fixed_width(-1.5, 6, "PAR1").unwrap();
        assert_eq!(got, "-1.500");
    }

    #[test]
    fn width_9_scientific_with_sign_reservation() {
        let got = format_fixed_width(1.23456789e10, 9, "PAR1").unwrap();
        assert_eq!(got.len(), 9);
        assert_eq!(got, "1.235E+10");
    }

    #[test]
    fn non_finite_is_rejected() {
        assert!(matches!(
            format_fixed_width(f64::NAN, 8, "PAR1"),
            Err(FormatError::NonFiniteValue { .. })
        ));
        assert!(matches!(
            format_fixed_width(f64::INFINITY, 8, "PAR1"),
            Err(FormatError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn overflow_when_width_too_small() {
        let err = format_fixed_width(1.23456789e120, 3, "PAR1").unwrap_err();
        assert!(matches!(err, FormatError::FormatOverflow { .. }));
    }

    #[test]
    fn large_exponent_reserves_three_chars() {
        let got = format_fixed_width(1.0e123, 9, "PAR1").unwrap();
        assert_eq!(got.len(), 9);
        assert!(got.contains("E+123"));
    }

    #[test]
    fn value_between_one_and_ten_uses_fixed_notation() {
        let got = format_fixed_width(3.14159, 6, "PAR1").unwrap();
        assert_eq!(got.len(), 6);
        assert!(!got.to_uppercase().contains('E'));
    }

    #[test]
    fn exact_one_and_exact_ten_are_scientific_boundaries() {
        // |v| <= 1 and |v| >= 10 both route to scientific notation.
        let at_one = format_fixed_width(1.0, 8, "PAR1").unwrap();
        assert!(at_one.to_uppercase().contains('E'));
        let at_ten = format_fixed_width(10.0, 8, "PAR1").unwrap();
        assert!(at_ten.to_uppercase().contains('E'));
    }
}
