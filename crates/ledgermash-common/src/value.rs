use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calendar date layouts recognised in text fields, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse `s` as a calendar date. Plain numbers never parse as dates.
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() || s.parse::<f64>().is_ok() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Parse `s` as a finite number, ignoring surrounding whitespace.
pub fn parse_finite_number(s: &str) -> Option<f64> {
    let n: f64 = s.trim().parse().ok()?;
    if n.is_finite() { Some(n) } else { None }
}

/// A single cell of a source record.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Empty => Ok(()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl FieldValue {
    /// Infer a value from a raw field: blank → `Empty`, finite numeric →
    /// `Number`, anything else → trimmed `Text`.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FieldValue::Empty;
        }
        match parse_finite_number(trimmed) {
            Some(n) => FieldValue::Number(n),
            None => FieldValue::Text(trimmed.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(_) => false,
        }
    }

    /// Numeric view: numbers as-is, numeric text parsed, everything else `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => parse_finite_number(s),
            FieldValue::Empty => None,
        }
    }

    /// Date view: only text values can be dates.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Text(s) => parse_calendar_date(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The textual form used for grouping keys and curve keys.
    pub fn raw_text(&self) -> String {
        self.to_string()
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Empty => false,
        }
    }
}
