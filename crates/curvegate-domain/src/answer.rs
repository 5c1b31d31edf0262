//! Answer-file text format.
//!
//! ```text
//! preamble lines are skipped until the first `#`
//! # node 12 x-displacement
//! 0.0 1.0
//! 1.0e-3 1.5
//! end
//! # kinetic energy
//! ...
//! ```
//!
//! A `#` line with at least one token names the curve that following data
//! lines belong to. Bare `#` lines and tolerance annotations (`rel` /
//! `abs` keywords) leave the current name alone. `end` closes the current curve;
//! blank lines are ignored.

use curvegate_error::{ParseError, ParseErrorKind};
use curvegate_types::CurveSet;
use std::fmt::Write as _;

/// Parse answer-file text into a [`CurveSet`].
///
/// `source_name` labels errors (usually the file name).
pub fn parse_answers(source_name: &str, text: &str) -> Result<CurveSet, ParseError> {
    let mut set = CurveSet::new();
    let mut current: Option<String> = None;
    let mut seen_comment = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        let line_no = idx + 1;

        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('#') {
            seen_comment = true;
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            if !tokens.is_empty() && !is_annotation(&tokens) {
                current = Some(tokens.join(" "));
            }
            continue;
        }

        if !seen_comment {
            continue;
        }

        if line.starts_with("end") {
            current = None;
            continue;
        }

        let (timestep, value) = parse_data_line(source_name, line_no, line)?;
        let Some(name) = current.as_deref() else {
            return Err(ParseError::new(
                source_name,
                line_no,
                ParseErrorKind::OrphanData,
            ));
        };
        set.append(name, timestep, value);
    }

    Ok(set)
}

/// Parse several answer texts for one test, merging curves of the same name.
pub fn parse_answer_texts<'a, I>(sources: I) -> Result<CurveSet, ParseError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut merged = CurveSet::new();
    for (name, text) in sources {
        merged.merge(parse_answers(name, text)?);
    }
    Ok(merged)
}

/// Canonical text form: one `# name` block per curve, one line per value,
/// closed by `end`. Parsing the output yields an equal [`CurveSet`].
pub fn serialize_answers(set: &CurveSet) -> String {
    let mut out = String::new();
    for curve in set.iter() {
        let _ = writeln!(out, "# {}", curve.name());
        for (timestep, values) in curve.iter() {
            for value in values {
                let _ = writeln!(out, "{timestep} {value}");
            }
        }
        out.push_str("end\n");
    }
    out
}

/// Tolerance annotations carry a `rel` or `abs` keyword after the first token.
fn is_annotation(tokens: &[&str]) -> bool {
    tokens
        .iter()
        .skip(1)
        .any(|t| *t == "rel" || *t == "abs")
}

fn parse_data_line(
    source_name: &str,
    line_no: usize,
    line: &str,
) -> Result<(f64, f64), ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [time, value] = tokens.as_slice() else {
        return Err(ParseError::new(
            source_name,
            line_no,
            ParseErrorKind::MalformedLine {
                tokens: tokens.len(),
            },
        ));
    };
    Ok((
        parse_number(source_name, line_no, time)?,
        parse_number(source_name, line_no, value)?,
    ))
}

fn parse_number(source_name: &str, line_no: usize, token: &str) -> Result<f64, ParseError> {
    let value: f64 = token.parse().map_err(|_| {
        ParseError::new(
            source_name,
            line_no,
            ParseErrorKind::InvalidNumber {
                token: token.to_string(),
            },
        )
    })?;
    if !value.is_finite() {
        return Err(ParseError::new(
            source_name,
            line_no,
            ParseErrorKind::NonFinite {
                token: token.to_string(),
            },
        ));
    }
    Ok(value)
}
