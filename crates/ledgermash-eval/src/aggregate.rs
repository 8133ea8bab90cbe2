//! Per-record evaluation folded into keyed result entries.

use std::collections::BTreeMap;

use ledgermash_common::{Combine, EvalError, FieldValue, PresentationColumn, Record, Source, SourceSet};
use ledgermash_parse::Formula;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::context::RunContext;
use crate::interpreter::{Interpreter, SymbolTable};
use crate::resolver::SourceResolver;
use crate::translate::HeaderIndex;

/// Group used for records without a unique key (or runs without one configured).
pub const UNKEYED_GROUP: &str = "(unkeyed)";

/// Value shown for presentation fields whose cell is blank or zero.
pub const NOT_AVAILABLE: &str = "N/A";

/// Running totals for one unique-key value.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultEntry {
    pub result: f64,
    pub count: u64,
    /// presentation field → last-seen or concatenated value
    pub fields: BTreeMap<String, FieldValue>,
    /// distinct values seen so far for `concat` fields, in first-seen order
    #[cfg_attr(feature = "serde", serde(skip))]
    concat_parts: BTreeMap<String, Vec<String>>,
}

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub records: usize,
    pub contributed: usize,
    pub skipped: usize,
}

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    entries: BTreeMap<String, ResultEntry>,
    stats: RunStats,
}

impl ResultSet {
    pub fn get(&self, key: &str) -> Option<&ResultEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Entries ordered by result, largest first; ties keep key order.
    pub fn ranked(&self) -> Vec<(&str, &ResultEntry)> {
        let mut v: Vec<_> = self.iter().collect();
        v.sort_by(|a, b| b.1.result.total_cmp(&a.1.result));
        v
    }

    pub fn into_entries(self) -> BTreeMap<String, ResultEntry> {
        self.entries
    }
}

/// Evaluates a formula over every record of the sources it names.
pub struct Aggregator<'a> {
    run: &'a RunContext,
    formula: &'a Formula,
    unique: Option<&'a str>,
    presentation: &'a [PresentationColumn],
}

impl<'a> Aggregator<'a> {
    pub fn new(
        run: &'a RunContext,
        formula: &'a Formula,
        unique: Option<&'a str>,
        presentation: &'a [PresentationColumn],
    ) -> Self {
        Self {
            run,
            formula,
            unique,
            presentation,
        }
    }

    /// Sources are visited in formula order; names without data are skipped.
    pub fn aggregate(&self, sources: &SourceSet) -> ResultSet {
        let mut out = ResultSet::default();
        for name in self.formula.sources() {
            let Some(source) = sources.get(name) else {
                tracing::warn!(source = name.as_str(), "no data for source, skipping");
                continue;
            };
            self.aggregate_source(source, &mut out);
        }
        out
    }

    fn aggregate_source(&self, source: &Source, out: &mut ResultSet) {
        let _span = tracing::debug_span!("aggregate_source", source = source.name()).entered();
        let headers = HeaderIndex::new(source.headers());
        let resolver = SourceResolver::new(self.run, source.name(), &headers);

        for (row, record) in source.records().iter().enumerate() {
            out.stats.records += 1;
            match self.evaluate(&resolver, record) {
                Ok(value) => {
                    let key = self.group_key(&headers, record);
                    let entry = out.entries.entry(key).or_default();
                    entry.result += value;
                    entry.count += 1;
                    self.fold_presentation(&headers, record, entry);
                    out.stats.contributed += 1;
                }
                Err(e) => {
                    out.stats.skipped += 1;
                    tracing::warn!(
                        source = source.name(),
                        row,
                        error = %e,
                        "record skipped"
                    );
                }
            }
        }
    }

    /// Resolve every distinct reference once, then fold the tree.
    pub fn evaluate(&self, resolver: &SourceResolver<'_>, record: &Record) -> Result<f64, EvalError> {
        let mut symbols = SymbolTable::default();
        for r in self.formula.references() {
            let v = resolver.resolve(&r.field, record)?;
            symbols.insert(r.clone(), v);
        }
        Interpreter::new(&symbols).evaluate_ast(self.formula.ast())
    }

    fn group_key(&self, headers: &HeaderIndex, record: &Record) -> String {
        let Some(unique) = self.unique else {
            return UNKEYED_GROUP.to_string();
        };
        let value = record.get(unique).or_else(|| {
            self.run
                .translator()
                .translate_indexed(headers, unique)
                .and_then(|h| record.get(h))
        });
        match value {
            Some(v) if !v.is_empty() => v.raw_text(),
            _ => UNKEYED_GROUP.to_string(),
        }
    }

    fn fold_presentation(&self, headers: &HeaderIndex, record: &Record, entry: &mut ResultEntry) {
        for column in self.presentation {
            let Some(header) = self.run.translator().translate_indexed(headers, &column.field) else {
                continue;
            };
            let value = match record.get(header) {
                Some(v) if v.is_truthy() => v.clone(),
                _ => FieldValue::Text(NOT_AVAILABLE.to_string()),
            };
            match column.combine {
                Combine::Last => {
                    entry.fields.insert(column.field.clone(), value);
                }
                Combine::Concat => {
                    let raw = value.raw_text();
                    let parts = entry.concat_parts.entry(column.field.clone()).or_default();
                    if parts.contains(&raw) {
                        continue;
                    }
                    parts.push(raw);
                    let combined = if parts.len() == 1 {
                        value
                    } else {
                        FieldValue::Text(parts.join(", "))
                    };
                    entry.fields.insert(column.field.clone(), combined);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Analytics;
    use crate::library::LibrarySet;
    use crate::translate::FieldTranslator;
    use chrono::NaiveDate;

    fn run_ctx() -> RunContext {
        let now = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        RunContext::new(LibrarySet::new(), Analytics::default(), FieldTranslator::new(), now)
    }

    fn accounts() -> SourceSet {
        let src = Source::new(
            "checking",
            vec!["AccountId".into(), "Balance".into(), "Branch".into(), "Product".into()],
        )
        .with_row(vec![FieldValue::Number(1.0), 100.0.into(), "North".into(), "DDA".into()])
        .with_row(vec![FieldValue::Number(1.0), 50.0.into(), FieldValue::Empty, "SAV".into()])
        .with_row(vec![FieldValue::Number(2.0), "n/a".into(), "South".into(), "DDA".into()])
        .with_row(vec![FieldValue::Number(2.0), 25.0.into(), "South".into(), "DDA".into()]);
        SourceSet::new().with_source(src)
    }

    #[test]
    fn groups_by_unique_key_and_skips_bad_records() {
        let run = run_ctx();
        let formula = Formula::parse("checking.balance * 2").unwrap();
        let results = Aggregator::new(&run, &formula, Some("AccountId"), &[]).aggregate(&accounts());
        assert_eq!(results.get("1").unwrap().result, 300.0);
        assert_eq!(results.get("1").unwrap().count, 2);
        assert_eq!(results.get("2").unwrap().count, 1);
        assert_eq!(
            results.stats(),
            RunStats {
                records: 4,
                contributed: 3,
                skipped: 1
            }
        );
        let ranked: Vec<_> = results.ranked().into_iter().map(|(k, _)| k).collect();
        assert_eq!(ranked, vec!["1", "2"]);
    }

    #[test]
    fn presentation_last_and_concat() {
        let run = run_ctx();
        let formula = Formula::parse("checking.balance").unwrap();
        let columns = [
            PresentationColumn::new("branch"),
            PresentationColumn::new("product").with_combine(Combine::Concat),
            PresentationColumn::new("officer"),
        ];
        let results =
            Aggregator::new(&run, &formula, Some("AccountId"), &columns).aggregate(&accounts());
        let one = results.get("1").unwrap();
        assert_eq!(one.fields["branch"], FieldValue::Text("N/A".into()));
        assert_eq!(one.fields["product"], FieldValue::Text("DDA, SAV".into()));
        assert!(!one.fields.contains_key("officer"));
        let two = results.get("2").unwrap();
        assert_eq!(two.fields["product"], FieldValue::Text("DDA".into()));
    }

    #[test]
    fn concat_keeps_values_that_contain_the_separator() {
        let run = run_ctx();
        let formula = Formula::parse("ledger.amount").unwrap();
        let src = Source::new("ledger", vec!["Id".into(), "Amount".into(), "Owner".into()])
            .with_row(vec![FieldValue::Number(1.0), 1.0.into(), "Smith, J".into()])
            .with_row(vec![FieldValue::Number(1.0), 2.0.into(), "Smith, J".into()])
            .with_row(vec![FieldValue::Number(1.0), 3.0.into(), "Jones".into()])
            .with_row(vec![FieldValue::Number(1.0), 4.0.into(), "Smith, J".into()]);
        let columns = [PresentationColumn::new("owner").with_combine(Combine::Concat)];
        let results = Aggregator::new(&run, &formula, Some("Id"), &columns)
            .aggregate(&SourceSet::new().with_source(src));
        let one = results.get("1").unwrap();
        assert_eq!(one.count, 4);
        assert_eq!(one.fields["owner"], FieldValue::Text("Smith, J, Jones".into()));
    }

    #[test]
    fn missing_key_falls_into_unkeyed_group() {
        let run = run_ctx();
        let formula = Formula::parse("checking.balance + 1").unwrap();
        let results = Aggregator::new(&run, &formula, Some("CustomerNumber"), &[]).aggregate(&accounts());
        assert_eq!(results.len(), 1);
        let all = results.get(UNKEYED_GROUP).unwrap();
        assert_eq!(all.count, 3);
        assert_eq!(all.result, 178.0);

        let no_key = Aggregator::new(&run, &formula, None, &[]).aggregate(&accounts());
        assert_eq!(no_key.get(UNKEYED_GROUP).unwrap().count, 3);
    }

    #[test]
    fn fuzzy_key_lookup_when_exact_header_missing() {
        let run = run_ctx();
        let formula = Formula::parse("checking.balance").unwrap();
        let results = Aggregator::new(&run, &formula, Some("accountid"), &[]).aggregate(&accounts());
        assert_eq!(results.get("1").unwrap().count, 2);
    }
}
