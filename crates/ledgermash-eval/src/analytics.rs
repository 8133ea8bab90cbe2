//! Per-source, per-column descriptive statistics and probability curves.
//!
//! Notes:
//! - A column is profiled only when every value is numeric, blank, the literal
//!   `null` (any case), or an ordinal code such as `3W` (digit run plus at most
//!   one trailing letter). A single date anywhere disqualifies the column.
//! - Ordinal codes count as the digit run plus one half: `3W` → 3.5.
//! - Variance and standard deviation are population statistics.
//! - Distinct values are compared numerically; each keeps the first raw
//!   spelling seen, which is what curve lookups key on.

use std::collections::BTreeMap;

use ledgermash_common::{CurvePolicy, FieldValue, SourceSet, parse_finite_number};
use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "serde")]
use serde::Serialize;

static ORDINAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[A-Za-z]?$").unwrap());

/// The most frequent value(s) of a sample.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Single(f64),
    /// Ascending; every listed value shares the highest frequency.
    Tied(Vec<f64>),
}

impl Mode {
    /// The value used as the curve pivot: the single mode, or the smallest tied one.
    pub fn pivot(&self) -> f64 {
        match self {
            Mode::Single(v) => *v,
            Mode::Tied(vs) => vs.first().copied().unwrap_or(0.0),
        }
    }

    pub fn values(&self) -> Vec<f64> {
        match self {
            Mode::Single(v) => vec![*v],
            Mode::Tied(vs) => vs.clone(),
        }
    }
}

/// Probability percentages keyed by the textual form of each distinct value,
/// in ascending value order.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityCurve {
    points: Vec<(String, f64)>,
}

impl ProbabilityCurve {
    pub fn points(&self) -> &[(String, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Percentage for a raw key. Ordinal codes match in any letter case.
    pub fn probability(&self, key: &str) -> Option<f64> {
        let key = curve_key(key);
        self.points
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, p)| *p)
    }

    pub fn probability_for(&self, value: &FieldValue) -> Option<f64> {
        self.probability(&value.raw_text())
    }
}

/// Descriptive statistics for one numeric column.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub mode: Mode,
    pub variance: f64,
    pub std_dev: f64,
    pub sum: f64,
    pub count: usize,
    pub distinct: usize,
    /// Multiplier that annualises period-bound figures.
    pub ytd_factor: f64,
    pub curve: Option<ProbabilityCurve>,
}

/// Column profiles for every loaded source.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analytics {
    sources: BTreeMap<String, BTreeMap<String, ColumnProfile>>,
}

impl Analytics {
    pub fn profile(&self, source: &str, column: &str) -> Option<&ColumnProfile> {
        self.sources.get(source)?.get(column)
    }

    pub fn source(&self, source: &str) -> Option<&BTreeMap<String, ColumnProfile>> {
        self.sources.get(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, ColumnProfile>)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn insert(&mut self, source: &str, column: &str, profile: ColumnProfile) {
        self.sources
            .entry(source.to_string())
            .or_default()
            .insert(column.to_string(), profile);
    }
}

/// Profile every eligible column of every source.
pub fn compute_analytics(sources: &SourceSet, policy: &CurvePolicy) -> Analytics {
    let _span = tracing::info_span!("compute_analytics", sources = sources.len()).entered();
    let mut out = Analytics::default();
    for source in sources.iter() {
        // Sources with no profiled column still get an (empty) entry.
        out.sources.entry(source.name().to_string()).or_default();
        for header in source.headers() {
            let Some(values) = source.column(header) else {
                continue;
            };
            match profile_column(header, values, policy) {
                Some(p) => {
                    tracing::debug!(
                        source = source.name(),
                        column = header.as_str(),
                        distinct = p.distinct,
                        curve = p.curve.is_some(),
                        "profiled column"
                    );
                    out.insert(source.name(), header, p);
                }
                None => {
                    tracing::trace!(source = source.name(), column = header.as_str(), "column not profiled");
                }
            }
        }
    }
    out
}

/// Trimmed key text; ordinal codes are upper-cased so `3w` and `3W` agree.
fn curve_key(raw: &str) -> String {
    let s = raw.trim();
    if ORDINAL_CODE.is_match(s) {
        s.to_ascii_uppercase()
    } else {
        s.to_string()
    }
}

enum Sample {
    Value(f64),
    Skip,
}

fn classify(value: &FieldValue) -> Option<Sample> {
    match value {
        FieldValue::Empty => Some(Sample::Skip),
        FieldValue::Number(n) => Some(Sample::Value(*n)),
        FieldValue::Text(raw) => {
            let s = raw.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("null") {
                return Some(Sample::Skip);
            }
            if value.as_date().is_some() {
                return None;
            }
            if ORDINAL_CODE.is_match(s) {
                let digits_end = s
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(s.len());
                let base: f64 = s[..digits_end].parse().ok()?;
                let bump = if digits_end < s.len() { 0.5 } else { 0.0 };
                return Some(Sample::Value(base + bump));
            }
            parse_finite_number(s).map(Sample::Value)
        }
    }
}

/// Profile one column; `None` when the column is ineligible or has no sample.
pub fn profile_column<'a, I>(name: &str, values: I, policy: &CurvePolicy) -> Option<ColumnProfile>
where
    I: IntoIterator<Item = &'a FieldValue>,
{
    let mut sample: Vec<f64> = Vec::new();
    // (value, raw spelling) for every sample; deduplicated after sorting
    let mut raw_by_value: Vec<(f64, String)> = Vec::new();

    for v in values {
        match classify(v)? {
            Sample::Skip => {}
            Sample::Value(x) => {
                sample.push(x);
                let raw = match v {
                    FieldValue::Text(s) => curve_key(s),
                    other => other.raw_text(),
                };
                raw_by_value.push((x, raw));
            }
        }
    }
    if sample.is_empty() {
        return None;
    }

    sample.sort_by(f64::total_cmp);
    // stable: the first spelling of each value survives the dedup
    raw_by_value.sort_by(|a, b| a.0.total_cmp(&b.0));
    raw_by_value.dedup_by(|later, first| later.0 == first.0);

    let count = sample.len();
    let sum: f64 = sample.iter().sum();
    let mean = sum / count as f64;
    let variance = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
    let median = median_of_sorted(&sample);
    let mode = mode_of_sorted(&sample);
    let distinct = raw_by_value.len();

    let curve = if policy.admits(distinct) && (median.trunc() as i64) < distinct as i64 - 1 {
        Some(build_curve(&raw_by_value, mode.pivot()))
    } else {
        None
    };

    Some(ColumnProfile {
        min: sample[0],
        max: sample[count - 1],
        mean,
        median,
        mode,
        variance,
        std_dev: variance.sqrt(),
        sum,
        count,
        distinct,
        ytd_factor: ytd_factor(name),
        curve,
    })
}

/// Central value, or the mean of the two central values for even sizes.
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Highest-frequency value(s) of an ascending sample.
pub fn mode_of_sorted(sorted: &[f64]) -> Mode {
    let mut runs: Vec<(f64, usize)> = Vec::new();
    for &x in sorted {
        match runs.last_mut() {
            Some((v, n)) if *v == x => *n += 1,
            _ => runs.push((x, 1)),
        }
    }
    let best = runs.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let mut tied: Vec<f64> = runs
        .into_iter()
        .filter(|(_, n)| *n == best)
        .map(|(v, _)| v)
        .collect();
    if tied.len() == 1 {
        Mode::Single(tied.remove(0))
    } else {
        Mode::Tied(tied)
    }
}

/// `mtd` columns annualise by 12, daily columns by 365.
pub fn ytd_factor(column: &str) -> f64 {
    let lower = column.to_lowercase();
    if lower.contains("mtd") {
        12.0
    } else if lower.contains("day") || lower.contains("daily") {
        365.0
    } else {
        1.0
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `n` evenly spaced points from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    (0..n).map(move |i| {
        if n == 1 {
            start
        } else {
            start + (end - start) * i as f64 / (n - 1) as f64
        }
    })
}

/// Two linear segments pivoting at the truncated mode: `0.0..=1.0` below it,
/// `5.0..=100.0` from it upward.
fn build_curve(distinct: &[(f64, String)], mode: f64) -> ProbabilityCurve {
    let n = distinct.len();
    let pivot = if mode.is_finite() {
        (mode.trunc().max(0.0) as usize).min(n)
    } else {
        0
    };
    let values = linspace(0.0, 1.0, pivot).chain(linspace(5.0, 100.0, n - pivot));
    let points = distinct
        .iter()
        .zip(values)
        .map(|((_, raw), p)| (raw.clone(), round2(p)))
        .collect();
    ProbabilityCurve { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermash_common::Source;
    use proptest::prelude::*;

    fn nums(xs: &[f64]) -> Vec<FieldValue> {
        xs.iter().map(|x| FieldValue::Number(*x)).collect()
    }

    fn profile(xs: &[f64]) -> ColumnProfile {
        profile_column("risk", &nums(xs), &CurvePolicy::default()).unwrap()
    }

    #[test]
    fn mode_single_and_tied() {
        assert_eq!(profile(&[1.0, 1.0, 2.0, 3.0]).mode, Mode::Single(1.0));
        assert_eq!(profile(&[1.0, 1.0, 2.0, 2.0]).mode, Mode::Tied(vec![1.0, 2.0]));
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(profile(&[3.0, 1.0, 2.0]).median, 2.0);
        assert_eq!(profile(&[4.0, 1.0, 3.0, 2.0]).median, 2.5);
    }

    #[test]
    fn descriptive_statistics() {
        let p = profile(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(p.min, 2.0);
        assert_eq!(p.max, 9.0);
        assert_eq!(p.sum, 40.0);
        assert_eq!(p.mean, 5.0);
        assert_eq!(p.variance, 4.0);
        assert_eq!(p.std_dev, 2.0);
        assert_eq!(p.count, 8);
        assert_eq!(p.distinct, 5);
    }

    #[test]
    fn ordinal_codes_and_nulls() {
        let values: Vec<FieldValue> = vec!["3W".into(), "NULL".into(), "2".into(), FieldValue::Empty, 1.0.into()];
        let p = profile_column("grade", &values, &CurvePolicy::default()).unwrap();
        assert_eq!(p.count, 3);
        assert_eq!(p.max, 3.5);
        assert_eq!(p.min, 1.0);
    }

    #[test]
    fn ineligible_columns_get_no_profile() {
        let policy = CurvePolicy::default();
        let dates: Vec<FieldValue> = vec![1.0.into(), "2024-01-31".into()];
        assert!(profile_column("opened", &dates, &policy).is_none());
        let words: Vec<FieldValue> = vec![1.0.into(), "North".into()];
        assert!(profile_column("branch", &words, &policy).is_none());
        let long_code: Vec<FieldValue> = vec!["3WX".into()];
        assert!(profile_column("grade", &long_code, &policy).is_none());
        let blanks: Vec<FieldValue> = vec![FieldValue::Empty, "null".into()];
        assert!(profile_column("notes", &blanks, &policy).is_none());
    }

    #[test]
    fn ytd_factor_from_column_name() {
        assert_eq!(ytd_factor("Fees_MTD"), 12.0);
        assert_eq!(ytd_factor("DailyBalance"), 365.0);
        assert_eq!(ytd_factor("days_past_due"), 365.0);
        assert_eq!(ytd_factor("balance"), 1.0);
    }

    #[test]
    fn curve_splits_at_mode() {
        // ten distinct values, mode 3, median 4
        let p = profile(&[0.0, 1.0, 2.0, 3.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(p.mode, Mode::Single(3.0));
        let curve = p.curve.expect("curve");
        let values: Vec<f64> = curve.points().iter().map(|(_, v)| *v).collect();
        assert_eq!(&values[..3], &[0.0, 0.5, 1.0]);
        assert_eq!(values.len() - 3, 7);
        assert_eq!(values[3], 5.0);
        assert_eq!(values[4], 20.83);
        assert_eq!(values[9], 100.0);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(curve.probability("3"), Some(5.0));
        assert_eq!(curve.probability_for(&FieldValue::Number(0.0)), Some(0.0));
        assert_eq!(curve.probability("42"), None);
    }

    #[test]
    fn curve_keys_keep_raw_spelling() {
        let values: Vec<FieldValue> = ["1", "2", "2", "3W", "4", "5", "6"]
            .into_iter()
            .map(FieldValue::from)
            .collect();
        let p = profile_column("grade", &values, &CurvePolicy::default()).unwrap();
        let curve = p.curve.unwrap();
        let keys: Vec<&str> = curve.points().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["1", "2", "3W", "4", "5", "6"]);
        // pivot index 2: [0, 1] then four points 5 → 100
        assert_eq!(curve.probability("1"), Some(0.0));
        assert_eq!(curve.probability("2"), Some(1.0));
        assert_eq!(curve.probability("3W"), Some(5.0));
        assert_eq!(curve.probability("6"), Some(100.0));
        assert_eq!(curve.probability("0"), None);
    }

    #[test]
    fn ordinal_codes_match_in_any_case() {
        let values: Vec<FieldValue> = ["1", "2", "2", "3w", "3W", "4", "5", "6"]
            .into_iter()
            .map(FieldValue::from)
            .collect();
        let p = profile_column("grade", &values, &CurvePolicy::default()).unwrap();
        assert_eq!(p.distinct, 6);
        let curve = p.curve.unwrap();
        assert_eq!(curve.points()[2].0, "3W");
        assert_eq!(curve.probability("3w"), Some(5.0));
        assert_eq!(curve.probability("3W"), Some(5.0));
        assert_eq!(curve.probability_for(&"3w".into()), Some(5.0));
    }

    #[test]
    fn high_cardinality_columns_profile_quickly() {
        let n = 60_000;
        let values: Vec<FieldValue> = (0..n)
            .rev()
            .map(|i| FieldValue::Number(f64::from(i) * 1.01))
            .chain(std::iter::once(FieldValue::Number(0.0)))
            .collect();
        let started = std::time::Instant::now();
        let p = profile_column("balance", &values, &CurvePolicy::default()).unwrap();
        assert_eq!(p.count, n as usize + 1);
        assert_eq!(p.distinct, n as usize);
        assert_eq!(p.mode, Mode::Single(0.0));
        assert!(p.curve.is_none());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn curve_window_and_median_guard() {
        // four distinct values: below the window
        assert!(profile(&[1.0, 2.0, 3.0, 4.0]).curve.is_none());
        // seventeen distinct values: above the window
        let wide: Vec<f64> = (0..17).map(f64::from).collect();
        assert!(profile(&wide).curve.is_none());
        // median 10 is not below distinct - 1 = 4
        assert!(profile(&[10.0, 10.0, 10.0, 10.0, 10.0, 11.0, 12.0, 13.0, 14.0, 1.0]).curve.is_none());
        // configurable window
        let loose = CurvePolicy { min_distinct_exclusive: 2, max_distinct: 16 };
        assert!(profile_column("r", &nums(&[0.0, 1.0, 1.0, 2.0]), &loose).unwrap().curve.is_some());
    }

    #[test]
    fn analytics_cover_every_eligible_column() {
        let src = Source::new("loan", vec!["AccountId".into(), "branch".into(), "risk".into()])
            .with_row(vec![FieldValue::Number(1.0), "North".into(), FieldValue::Number(2.0)])
            .with_row(vec![FieldValue::Number(2.0), "South".into(), FieldValue::Number(3.0)]);
        let a = compute_analytics(&SourceSet::new().with_source(src), &CurvePolicy::default());
        assert!(a.profile("loan", "AccountId").is_some());
        assert!(a.profile("loan", "branch").is_none());
        assert_eq!(a.profile("loan", "risk").unwrap().sum, 5.0);
        assert_eq!(a.source("loan").unwrap().len(), 2);
    }

    proptest! {
        #[test]
        fn curves_are_bounded_and_monotone(xs in prop::collection::vec(0u8..20, 1..60)) {
            let sample: Vec<f64> = xs.iter().map(|x| f64::from(*x)).collect();
            let p = profile(&sample);
            if let Some(curve) = p.curve {
                prop_assert_eq!(curve.len(), p.distinct);
                let vals: Vec<f64> = curve.points().iter().map(|(_, v)| *v).collect();
                prop_assert!(vals.iter().all(|v| (0.0..=100.0).contains(v)));
                prop_assert!(vals.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }
}
