//! Advisory value ranges for the correction controls.
//!
//! Rule texts are free-form ("max 500, min 0", "Maximum 12 months"). Nothing here fails: text that
//! yields no usable literal leaves that side at its default.

use fieldfix_types::SourceRecord;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_MIN: i64 = 0;
pub const DEFAULT_MAX: i64 = 100_000;

/// Inclusive range with `min <= max` guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    min: i64,
    max: i64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
        }
    }
}

impl Bounds {
    /// An inverted pair is repaired by raising `max` to `min`.
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Min,
    Max,
    /// `None` when the digits overflow.
    Literal(Option<i64>),
}

fn tokenize(rule: &str) -> Vec<Token> {
    let lower = rule.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            tokens.push(Token::Literal(lower[start..i].parse().ok()));
        } else if bytes[i..].starts_with(b"min") {
            tokens.push(Token::Min);
            i += 3;
        } else if bytes[i..].starts_with(b"max") {
            tokens.push(Token::Max);
            i += 3;
        } else {
            i += 1;
        }
    }
    tokens
}

/// Infer bounds from rule text, binding each keyword to the first integer literal that follows it
/// before the next keyword.
///
/// `"min 10, max 500"` gives `(10, 500)`; `"max 500"` gives `(0, 500)`. Matching is a
/// case-insensitive substring match, so "Maximum" counts as `max`.
pub fn infer_bounds(rule: &str) -> Bounds {
    let mut min = None;
    let mut max = None;
    let mut open: Option<Token> = None;

    for token in tokenize(rule) {
        match token {
            Token::Min | Token::Max => open = Some(token),
            Token::Literal(value) => {
                match open.take() {
                    Some(Token::Min) => min = value.or(min),
                    Some(Token::Max) => max = value.or(max),
                    _ => {}
                }
            }
        }
    }

    if min.is_none() && max.is_none() {
        debug!(rule, "no bound literal found; using defaults");
    }
    Bounds::new(min.unwrap_or(DEFAULT_MIN), max.unwrap_or(DEFAULT_MAX))
}

/// The field app's original reading: each keyword present takes the *last* literal in the whole
/// text, so `"min 10, max 500"` gives `(500, 500)`.
pub fn infer_bounds_legacy(rule: &str) -> Bounds {
    let tokens = tokenize(rule);
    let last = tokens.iter().rev().find_map(|t| match t {
        Token::Literal(v) => Some(*v),
        _ => None,
    });
    let has = |kw: Token| tokens.contains(&kw);

    let max = match last {
        Some(Some(v)) if has(Token::Max) => v,
        _ => DEFAULT_MAX,
    };
    let min = match last {
        Some(Some(v)) if has(Token::Min) => v,
        _ => DEFAULT_MIN,
    };
    Bounds::new(min, max)
}

/// Bounds for a logic discrepancy: zero up to twice the larger of the two values.
pub fn logic_bounds(reported: &str, reference: &str) -> Bounds {
    match (coerce_integer(reported), coerce_integer(reference)) {
        (Some(r), Some(f)) => Bounds::new(0, r.max(f).saturating_mul(2)),
        _ => Bounds::default(),
    }
}

/// Bounds shown next to a flagged value.
pub fn advisory_bounds(record: &SourceRecord) -> Bounds {
    match record {
        SourceRecord::Constraint(r) => infer_bounds(&r.constraint_rule),
        SourceRecord::Logic(r) => logic_bounds(&r.reported_value, &r.reference_value),
    }
}

/// Reported value as an integer, clamped into `bounds`; unparseable text shows as `bounds.min()`.
pub fn display_value(reported: &str, bounds: Bounds) -> i64 {
    coerce_integer(reported)
        .map(|v| bounds.clamp(v))
        .unwrap_or(bounds.min())
}

fn coerce_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.strip_suffix(".0").and_then(|t| t.parse().ok()))
}
