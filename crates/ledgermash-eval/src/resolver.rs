//! Turns one `source.field` occurrence into a number for the current record.
//!
//! Resolution order, first match wins:
//! 1. a library function named `field` (function names shadow columns);
//! 2. a column matched by the field translator;
//! 3. the literal `0`.

use ledgermash_common::{EvalError, FieldValue, Record, parse_finite_number};

use crate::clock::days_since;
use crate::context::RunContext;
use crate::function::{ArgValue, ParamKind, ParamSpec};
use crate::translate::HeaderIndex;

/// How an occurrence was resolved, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Function { library: String, name: String },
    Column { header: String },
    Unresolved,
}

/// Resolver bound to one source's headers for the duration of a run.
pub struct SourceResolver<'a> {
    run: &'a RunContext,
    source: &'a str,
    headers: &'a HeaderIndex,
}

impl<'a> SourceResolver<'a> {
    pub fn new(run: &'a RunContext, source: &'a str, headers: &'a HeaderIndex) -> Self {
        Self {
            run,
            source,
            headers,
        }
    }

    pub fn resolve(&self, field: &str, record: &Record) -> Result<f64, EvalError> {
        self.resolve_traced(field, record).map(|(v, _)| v)
    }

    pub fn resolve_traced(
        &self,
        field: &str,
        record: &Record,
    ) -> Result<(f64, Resolution), EvalError> {
        if let Some((library, function)) = self.run.libraries().find_function(field) {
            let args = function
                .params()
                .iter()
                .map(|spec| self.resolve_param(spec, record))
                .collect::<Result<Vec<_>, _>>()?;
            let value =
                self.run
                    .invoke(library, function.as_ref(), &args, self.source, self.headers)?;
            if !value.is_finite() {
                return Err(EvalError::new_num()
                    .with_message(format!("{field} returned a non-finite value")));
            }
            return Ok((
                value,
                Resolution::Function {
                    library: library.name().to_string(),
                    name: field.to_string(),
                },
            ));
        }

        let Some(header) = self.run.translator().translate_indexed(self.headers, field) else {
            return Ok((0.0, Resolution::Unresolved));
        };
        let value = record.get(header).unwrap_or(&FieldValue::Empty);
        let n = column_number(value, self.run.now()).map_err(|e| {
            e.with_message(format!("column `{header}` holds {value:?}, not a number or date"))
        })?;
        Ok((
            n,
            Resolution::Column {
                header: header.to_string(),
            },
        ))
    }

    fn resolve_param(&self, spec: &ParamSpec, record: &Record) -> Result<ArgValue, EvalError> {
        let Some(header) = self
            .run
            .translator()
            .translate_indexed(self.headers, spec.name)
        else {
            return Ok(ArgValue::Absent);
        };
        let value = record.get(header).unwrap_or(&FieldValue::Empty);
        coerce_arg(value, spec.kind).map_err(|e| {
            e.with_message(format!(
                "parameter `{}` (column `{header}`) cannot take {value:?}",
                spec.name
            ))
        })
    }
}

/// Coerce a raw cell into a function argument.
///
/// Dates win over everything else, then numbers, then text where the
/// parameter accepts it. Blank cells are `Absent`.
pub fn coerce_arg(value: &FieldValue, kind: ParamKind) -> Result<ArgValue, EvalError> {
    match value {
        FieldValue::Empty => Ok(ArgValue::Absent),
        FieldValue::Number(n) => Ok(ArgValue::Number(*n)),
        FieldValue::Text(s) => {
            if s.trim().is_empty() {
                return Ok(ArgValue::Absent);
            }
            if let Some(d) = value.as_date() {
                return Ok(ArgValue::Date(d));
            }
            if let Some(n) = parse_finite_number(s) {
                return Ok(ArgValue::Number(n));
            }
            if kind.accepts_text() {
                Ok(ArgValue::Text(s.trim().to_string()))
            } else {
                Err(EvalError::new_value())
            }
        }
    }
}

/// Numeric stand-in for a column value: dates become days since `now`.
pub fn column_number(
    value: &FieldValue,
    now: chrono::NaiveDateTime,
) -> Result<f64, EvalError> {
    if let Some(d) = value.as_date() {
        return Ok(days_since(d, now) as f64);
    }
    value.as_number().ok_or_else(EvalError::new_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ledgermash_common::EvalErrorKind;

    #[test]
    fn coerce_prefers_dates_then_numbers() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(
            coerce_arg(&"2026-01-31".into(), ParamKind::Number),
            Ok(ArgValue::Date(d))
        );
        assert_eq!(
            coerce_arg(&"12.5".into(), ParamKind::Text),
            Ok(ArgValue::Number(12.5))
        );
        assert_eq!(
            coerce_arg(&"DDA".into(), ParamKind::Text),
            Ok(ArgValue::Text("DDA".into()))
        );
        assert_eq!(
            coerce_arg(&"DDA".into(), ParamKind::Number).unwrap_err().kind,
            EvalErrorKind::Value
        );
        assert_eq!(coerce_arg(&FieldValue::Empty, ParamKind::Number), Ok(ArgValue::Absent));
    }

    #[test]
    fn column_numbers_turn_dates_into_day_counts() {
        let now = NaiveDate::from_ymd_opt(2025, 1, 11)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(column_number(&"2025-01-01".into(), now), Ok(10.0));
        assert_eq!(column_number(&FieldValue::Number(7.0), now), Ok(7.0));
        assert!(column_number(&"North".into(), now).is_err());
        assert!(column_number(&FieldValue::Empty, now).is_err());
    }
}
