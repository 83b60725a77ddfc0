//! Matching and in-place update of numeric runs.
//!
//! The policy is deliberately literal: a run whose trimmed text looks like a
//! plain or grouped number is overwritten by any candidate value that differs
//! from it and parses as a number. Candidates are not correlated with the
//! run's position or label, so correctness depends on the caller passing a
//! value mapping with few distinct numeric candidates.

use crate::types::{Deck, RunPath};
use crate::values::ValueMap;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Digits with optional grouping separators, an optional decimal point and
/// optional trailing digits.
static NUMERIC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d,]+\.?\d*$").unwrap());

/// A single Unicode decimal digit (`Nd`), matching what `\d` accepts above.
static DECIMAL_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d$").unwrap());

/// Thousands separator stripped before matching and parsing.
const GROUPING_SEPARATOR: char = ',';

fn strip_grouping(text: &str) -> String {
    text.replace(GROUPING_SEPARATOR, "")
}

fn is_decimal_digit(c: char) -> bool {
    c.is_ascii_digit() || (!c.is_ascii() && DECIMAL_DIGIT.is_match(c.encode_utf8(&mut [0; 4])))
}

/// Numeric value of a decimal digit from any script.
///
/// Unicode encodes decimal digits as contiguous runs of complete `0..=9`
/// sets, so the distance to the start of the run gives the value.
fn digit_value(c: char) -> u32 {
    let mut offset = 0;
    let mut code = c as u32;
    while let Some(prev) = code.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        offset += 1;
        code -= 1;
    }
    offset % 10
}

/// Rewrite non-ASCII decimal digits (full-width, Arabic-Indic, ...) as ASCII.
fn ascii_digits(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }
    text.chars()
        .map(|c| {
            if !c.is_ascii() && is_decimal_digit(c) {
                char::from_digit(digit_value(c), 10).unwrap_or(c)
            } else {
                c
            }
        })
        .collect::<String>()
        .into()
}

/// Text that parsed as a floating-point number once grouping separators
/// were removed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericText(f64);

impl NumericText {
    /// Attempt the conversion. `None` means the text is not a number and the
    /// candidate is treated as a non-match.
    ///
    /// Decimal digits of any script are accepted, the same set that
    /// [`looks_numeric`] matches.
    pub fn parse(text: &str) -> Option<Self> {
        ascii_digits(&strip_grouping(text)).trim().parse::<f64>().ok().map(Self)
    }
}

/// Whether run text has the shape of a plain or grouped number.
pub fn looks_numeric(text: &str) -> bool {
    NUMERIC_PATTERN.is_match(&strip_grouping(text))
}

/// Outcome of comparing a run's current text against one candidate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Numeric run, different candidate, both parse: overwrite with the candidate.
    Replace,
    /// The candidate already equals the run text.
    AlreadyCurrent,
    /// The run text does not look like a number.
    NotNumeric,
    /// The run looks numeric but one side failed to parse.
    Unparseable,
}

/// Decide what a single candidate does to a run whose trimmed text is `current`.
pub fn decide(current: &str, candidate: &str) -> Decision {
    if looks_numeric(current) && current != candidate {
        match (NumericText::parse(current), NumericText::parse(candidate)) {
            (Some(_), Some(_)) => Decision::Replace,
            _ => Decision::Unparseable,
        }
    } else if current == candidate {
        Decision::AlreadyCurrent
    } else {
        Decision::NotNumeric
    }
}

/// A run whose text was rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunChange {
    pub path: RunPath,
    pub before: String,
    pub after: String,
}

/// Summary of one update pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Runs examined, including blank ones.
    pub runs_visited: usize,
    /// Changed runs, in document order.
    pub changes: Vec<RunChange>,
}

impl UpdateReport {
    /// Number of runs whose text changed.
    pub fn changed(&self) -> usize {
        self.changes.len()
    }
}

/// Rewrite numeric runs of `deck` from the values of `values`.
///
/// Runs are visited once in document order. Each candidate is checked with
/// [`decide`] against the run's original trimmed text; every
/// [`Decision::Replace`] overwrites the run, so the last qualifying
/// candidate in insertion order is the one that remains. Keys of `values`
/// are ignored.
pub fn update_deck(deck: &mut Deck, values: &ValueMap) -> UpdateReport {
    let mut report = UpdateReport::default();

    for (path, run) in deck.runs_mut() {
        report.runs_visited += 1;
        let current = run.text.trim().to_string();

        let mut replacement: Option<&String> = None;
        for candidate in values.values() {
            match decide(&current, candidate) {
                Decision::Replace => replacement = Some(candidate),
                Decision::Unparseable => {
                    log::trace!("{}: '{}' vs '{}' did not parse", path, current, candidate)
                }
                Decision::AlreadyCurrent | Decision::NotNumeric => {}
            }
        }

        if let Some(after) = replacement {
            if *after != run.text {
                log::debug!("{}: '{}' -> '{}'", path, run.text, after);
                let before = std::mem::replace(&mut run.text, after.clone());
                report.changes.push(RunChange {
                    path,
                    before,
                    after: after.clone(),
                });
            }
        }
    }

    log::info!(
        "Updated {} of {} runs",
        report.changed(),
        report.runs_visited
    );
    report
}
