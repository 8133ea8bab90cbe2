//! Text and JSON renderings of run results, column profiles and libraries.

use std::fmt::Write as _;

use ledgermash_common::{FieldValue, PresentationColumn};
use ledgermash_eval::{Analytics, ColumnProfile, Library, ResultSet};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RankedRow<'a> {
    pub key: &'a str,
    pub result: f64,
    pub count: u64,
    pub fields: Vec<(&'a str, &'a FieldValue)>,
}

/// Rows ordered by result, largest first, with presentation fields in
/// configured order under their headings.
pub fn ranked_rows<'a>(results: &'a ResultSet, columns: &'a [PresentationColumn]) -> Vec<RankedRow<'a>> {
    results
        .ranked()
        .into_iter()
        .map(|(key, entry)| RankedRow {
            key,
            result: entry.result,
            count: entry.count,
            fields: columns
                .iter()
                .filter_map(|c| entry.fields.get(&c.field).map(|v| (c.heading(), v)))
                .collect(),
        })
        .collect()
}

pub fn results_json(results: &ResultSet, columns: &[PresentationColumn]) -> serde_json::Result<String> {
    #[derive(Serialize)]
    struct Report<'a> {
        rows: Vec<RankedRow<'a>>,
        stats: ledgermash_eval::RunStats,
    }
    serde_json::to_string_pretty(&Report {
        rows: ranked_rows(results, columns),
        stats: results.stats(),
    })
}

fn table(header: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    let mut out = String::new();
    let line = |out: &mut String, cells: &[String]| {
        let rendered: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect();
        let _ = writeln!(out, "{}", rendered.join("  ").trim_end());
    };
    line(&mut out, header);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    line(&mut out, &rule);
    for row in rows {
        line(&mut out, row);
    }
    out
}

pub fn results_table(results: &ResultSet, columns: &[PresentationColumn]) -> String {
    let mut header = vec!["Key".to_string(), "Count".to_string()];
    header.extend(columns.iter().map(|c| c.heading().to_string()));
    header.push("Result".to_string());

    let rows: Vec<Vec<String>> = results
        .ranked()
        .into_iter()
        .map(|(key, entry)| {
            let mut row = vec![key.to_string(), entry.count.to_string()];
            row.extend(columns.iter().map(|c| {
                entry
                    .fields
                    .get(&c.field)
                    .map(FieldValue::raw_text)
                    .unwrap_or_default()
            }));
            row.push(format!("{:.2}", entry.result));
            row
        })
        .collect();

    let stats = results.stats();
    let mut out = table(&header, &rows);
    let _ = writeln!(
        out,
        "\n{} records, {} contributed, {} skipped",
        stats.records, stats.contributed, stats.skipped
    );
    out
}

fn curve_summary(p: &ColumnProfile) -> String {
    match &p.curve {
        Some(c) => c
            .points()
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(" "),
        None => String::new(),
    }
}

pub fn profiles_table(analytics: &Analytics) -> String {
    let header: Vec<String> = [
        "Source", "Column", "Count", "Distinct", "Min", "Max", "Mean", "Median", "Mode", "StdDev",
        "YTD", "Curve",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let mut rows = Vec::new();
    for (source, columns) in analytics.iter() {
        for (column, p) in columns {
            let mode = p
                .mode
                .values()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("|");
            rows.push(vec![
                source.to_string(),
                column.clone(),
                p.count.to_string(),
                p.distinct.to_string(),
                p.min.to_string(),
                p.max.to_string(),
                format!("{:.2}", p.mean),
                p.median.to_string(),
                mode,
                format!("{:.2}", p.std_dev),
                p.ytd_factor.to_string(),
                curve_summary(p),
            ]);
        }
    }
    table(&header, &rows)
}

pub fn library_listing(library: &Library) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - {}", library.name(), library.description());
    let _ = writeln!(out, "\nfunctions:");
    for f in library.functions() {
        let params: Vec<String> = f
            .params()
            .iter()
            .map(|p| {
                if p.required {
                    p.name.to_string()
                } else {
                    format!("{}?", p.name)
                }
            })
            .collect();
        let _ = writeln!(out, "  {}({})", f.name(), params.join(", "));
        let _ = writeln!(out, "      {}", f.description());
    }
    let _ = writeln!(out, "\nattributes:");
    for (name, a) in library.attributes() {
        let _ = writeln!(out, "  {name} = {}  {}", a.value, a.description);
    }
    for (name, entries) in library.dictionaries() {
        let _ = writeln!(out, "\ndictionary {name}:");
        for (k, v) in entries {
            let _ = writeln!(out, "  {k} = {v}");
        }
    }
    out
}
