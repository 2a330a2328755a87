//! printf-style templates for the memory and run-time strings.
//!
//! Supports `%d`/`%i`, `%f`/`%F`, `%s` (plain text of the value) and `%%`
//! with the `-`, `0`, `+`, space and `#` flags, a decimal width and a
//! `.precision`. Templates are
//! parsed once at startup so a bad format string is a usage error rather than
//! a garbled line in the middle of a run.

use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FormatError {
    #[error("unsupported conversion `%{0}`")]
    UnknownConversion(char),

    #[error("format string ends in the middle of a conversion")]
    Truncated,

    #[error("format string needs {expected} placeholder(s), found {found}")]
    Arity { expected: usize, found: usize },
}

/// A value substituted into a template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Conv {
    Int,
    Float,
    Str,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
struct Flags {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct Spec {
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    conv: Conv,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Piece {
    Literal(String),
    Spec(Spec),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Template {
    source: String,
    pieces: Vec<Piece>,
}

impl Template {
    /// Number of values `render` consumes.
    pub fn arity(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Spec(_)))
            .count()
    }

    /// Parse and require exactly `expected` placeholders.
    pub fn with_arity(source: &str, expected: usize) -> Result<Self, FormatError> {
        let template: Template = source.parse()?;
        let found = template.arity();
        if found != expected {
            return Err(FormatError::Arity { expected, found });
        }
        Ok(template)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute `args` in order. Missing values render as nothing; numeric
    /// values are converted to whatever the placeholder asks for.
    pub fn render(&self, args: &[Arg]) -> String {
        let mut out = String::new();
        let mut args = args.iter();

        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Spec(spec) => {
                    if let Some(arg) = args.next() {
                        render_spec(&mut out, spec, *arg);
                    }
                }
            }
        }

        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Template {
    type Err = FormatError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '%' {
                literal.push(ch);
                continue;
            }

            if chars.peek() == Some(&'%') {
                chars.next();
                literal.push('%');
                continue;
            }

            let mut flags = Flags::default();
            while let Some(&c) = chars.peek() {
                match c {
                    '-' => flags.left = true,
                    '0' => flags.zero = true,
                    '+' => flags.plus = true,
                    ' ' => flags.space = true,
                    '#' => {}
                    _ => break,
                }
                chars.next();
            }

            let width = take_number(&mut chars);
            let precision = if chars.peek() == Some(&'.') {
                chars.next();
                Some(take_number(&mut chars).unwrap_or(0))
            } else {
                None
            };

            let conv = match chars.next() {
                Some('d' | 'i') => Conv::Int,
                Some('f' | 'F') => Conv::Float,
                Some('s') => Conv::Str,
                Some(other) => return Err(FormatError::UnknownConversion(other)),
                None => return Err(FormatError::Truncated),
            };

            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Spec(Spec {
                flags,
                width,
                precision,
                conv,
            }));
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            pieces,
        })
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        chars.next();
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
    }
    value
}

fn render_spec(out: &mut String, spec: &Spec, arg: Arg) {
    let (sign, body) = match (spec.conv, arg) {
        (Conv::Int, Arg::Int(v)) => split_sign(v < 0, int_digits(v.unsigned_abs(), spec.precision)),
        (Conv::Int, Arg::Float(v)) => {
            let v = v.trunc();
            split_sign(v < 0.0, int_digits(v.abs() as u64, spec.precision))
        }
        (Conv::Float, Arg::Float(v)) => split_sign(
            v.is_sign_negative() && v != 0.0,
            format!("{:.*}", spec.precision.unwrap_or(6), v.abs()),
        ),
        (Conv::Float, Arg::Int(v)) => split_sign(
            v < 0,
            format!("{:.*}", spec.precision.unwrap_or(6), v.unsigned_abs() as f64),
        ),
        (Conv::Str, arg) => {
            let text = match arg {
                Arg::Int(v) => v.to_string(),
                Arg::Float(v) => v.to_string(),
            };
            let text = match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            };
            pad(out, spec, "", &text, false);
            return;
        }
    };

    let sign = match sign {
        "-" => "-",
        _ if spec.flags.plus => "+",
        _ if spec.flags.space => " ",
        _ => "",
    };
    pad(out, spec, sign, &body, spec.flags.zero && !spec.flags.left);
}

fn split_sign(negative: bool, body: String) -> (&'static str, String) {
    (if negative { "-" } else { "" }, body)
}

fn int_digits(v: u64, precision: Option<usize>) -> String {
    let digits = v.to_string();
    match precision {
        Some(p) if p > digits.len() => format!("{}{digits}", "0".repeat(p - digits.len())),
        _ => digits,
    }
}

fn pad(out: &mut String, spec: &Spec, sign: &str, body: &str, zero_fill: bool) {
    let len = sign.chars().count() + body.chars().count();
    let fill = spec.width.unwrap_or(0).saturating_sub(len);

    if spec.flags.left {
        out.push_str(sign);
        out.push_str(body);
        out.extend(std::iter::repeat_n(' ', fill));
    } else if zero_fill {
        out.push_str(sign);
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(body);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(sign);
        out.push_str(body);
    }
}
