//! Run configuration: which formula to evaluate, how to group and present
//! results, and which libraries and sources to bring in.

use std::collections::BTreeMap;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How repeated presentation values for one key are folded together.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combine {
    /// Last contributing record wins.
    #[default]
    Last,
    /// Distinct values joined with `", "` in first-seen order.
    Concat,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationColumn {
    /// Field name, fuzzily translated per record.
    pub field: String,
    /// Output heading; defaults to `field`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub heading: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub combine: Combine,
}

impl PresentationColumn {
    pub fn new<S: Into<String>>(field: S) -> Self {
        Self {
            field: field.into(),
            heading: None,
            combine: Combine::Last,
        }
    }

    pub fn with_heading<S: Into<String>>(mut self, heading: S) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn with_combine(mut self, combine: Combine) -> Self {
        self.combine = combine;
        self
    }

    pub fn heading(&self) -> &str {
        self.heading.as_deref().unwrap_or(&self.field)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Presentation {
    #[cfg_attr(feature = "serde", serde(default))]
    pub columns: Vec<PresentationColumn>,
}

/// Eligibility window for probability curves: a curve is built only when
/// `min_distinct_exclusive < distinct <= max_distinct`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvePolicy {
    pub min_distinct_exclusive: usize,
    pub max_distinct: usize,
}

impl Default for CurvePolicy {
    fn default() -> Self {
        Self {
            min_distinct_exclusive: 4,
            max_distinct: 16,
        }
    }
}

impl CurvePolicy {
    pub fn admits(&self, distinct: usize) -> bool {
        distinct > self.min_distinct_exclusive && distinct <= self.max_distinct
    }
}

/// Per-library overrides and external data.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibraryData {
    pub attributes: BTreeMap<String, f64>,
    pub dictionaries: BTreeMap<String, BTreeMap<String, f64>>,
    /// Table name → CSV path (relative paths resolve against the config file).
    pub tables: BTreeMap<String, PathBuf>,
}

/// Everything one run needs besides the source data itself.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunConfig {
    pub formula: String,
    /// Column grouping the results; absent means everything lands in one group.
    #[cfg_attr(feature = "serde", serde(default))]
    pub unique: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub presentation: Presentation,
    #[cfg_attr(feature = "serde", serde(default))]
    pub libraries: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub library_data: BTreeMap<String, LibraryData>,
    /// Stem → alternative field names tried when direct matching fails.
    #[cfg_attr(feature = "serde", serde(default))]
    pub synonyms: BTreeMap<String, Vec<String>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve_policy: CurvePolicy,
    /// Explicit source name → CSV path bindings.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sources: BTreeMap<String, PathBuf>,
}

impl RunConfig {
    pub fn new<S: Into<String>>(formula: S) -> Self {
        Self {
            formula: formula.into(),
            ..Self::default()
        }
    }

    pub fn with_unique<S: Into<String>>(mut self, key: S) -> Self {
        self.unique = Some(key.into());
        self
    }

    pub fn with_library<S: Into<String>>(mut self, name: S) -> Self {
        self.libraries.push(name.into());
        self
    }

    pub fn with_presentation(mut self, column: PresentationColumn) -> Self {
        self.presentation.columns.push(column);
        self
    }

    pub fn with_synonyms<S, I, T>(mut self, stem: S, alternatives: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.synonyms.insert(
            stem.into(),
            alternatives.into_iter().map(Into::into).collect(),
        );
        self
    }
}
