//! The core `Function` trait, its capability flags, declared parameters and
//! the context a function sees while it runs.

use chrono::{NaiveDate, NaiveDateTime};
use ledgermash_common::{EvalError, EvalErrorKind};

use crate::analytics::ColumnProfile;

bitflags::bitflags! {
    /// Describes what a library function touches beyond its own arguments.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct FnCaps: u16 {
        /// Same inputs, same output; no side effects. Every library function is pure.
        const PURE          = 0b0000_0001;
        /// Reads library attributes or dictionaries.
        const ATTRIBUTES    = 0b0000_0010;
        /// Reads an external lookup table loaded with the library.
        const TABLES        = 0b0000_0100;
        /// Reads column profiles computed by the analytics pass.
        const PROFILES      = 0b0000_1000;
        /// Calls sibling functions of the same library.
        const CALLS         = 0b0001_0000;
        /// Depends on the run's captured `now`.
        const CLOCK         = 0b0010_0000;
    }
}

/// How a resolved parameter value should be coerced.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParamKind {
    Number,
    Text,
    Date,
    Any,
}

impl ParamKind {
    pub fn accepts_text(self) -> bool {
        matches!(self, ParamKind::Text | ParamKind::Any)
    }
}

/// One declared, positionally resolved parameter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    /// Optional parameters carry a function-specific default when absent;
    /// required numeric ones count as zero.
    pub required: bool,
}

impl ParamSpec {
    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Number,
            required: true,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Text,
            required: true,
        }
    }

    pub const fn any(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Any,
            required: true,
        }
    }

    pub const fn date(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Date,
            required: true,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A coerced argument handed to a function.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    /// The parameter did not resolve to a column, or the cell was blank.
    Absent,
}

impl ArgValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, ArgValue::Absent)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ArgValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ArgValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Key form used for curve and dictionary lookups.
    pub fn lookup_key(&self) -> Option<String> {
        match self {
            ArgValue::Number(n) => Some(format!("{n}")),
            ArgValue::Text(s) => Some(s.clone()),
            ArgValue::Date(d) => Some(d.to_string()),
            ArgValue::Absent => None,
        }
    }
}

/// What a running function may read. Everything is read-only.
pub trait FunctionContext {
    /// The instant captured once at the start of the run.
    fn now(&self) -> NaiveDateTime;

    /// A numeric attribute of the function's own library.
    fn attribute(&self, name: &str) -> Result<f64, EvalError>;

    /// An entry of a named dictionary of the function's own library.
    fn dictionary_value(&self, dictionary: &str, key: &str) -> Result<f64, EvalError>;

    /// Step lookup in an external table loaded with the library.
    fn table_lookup(&self, table: &str, key: f64) -> Result<f64, EvalError>;

    /// Invoke a sibling function of the same library.
    fn call(&self, function: &str, args: &[ArgValue]) -> Result<f64, EvalError>;

    /// Profile of the column the `index`-th declared parameter resolved to.
    fn param_profile(&self, index: usize) -> Option<&ColumnProfile>;

    /// Profile of any column of any loaded source.
    fn profile(&self, source: &str, column: &str) -> Option<&ColumnProfile>;
}

/// A named, described, pure computation with a fixed parameter list.
pub trait Function: Send + Sync + 'static {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE
    }

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    /// Declared parameters, resolved positionally against record headers.
    fn params(&self) -> &'static [ParamSpec];

    fn eval(&self, args: &[ArgValue], ctx: &dyn FunctionContext) -> Result<f64, EvalError>;
}

/// Pad `args` with `Absent` up to the declared parameter count.
pub fn fit_args(f: &dyn Function, args: &[ArgValue]) -> Result<Vec<ArgValue>, EvalError> {
    let params = f.params();
    if args.len() > params.len() {
        return Err(EvalError::new_arity().with_message(format!(
            "{} takes {} arguments, got {}",
            f.name(),
            params.len(),
            args.len()
        )));
    }
    let mut out = args.to_vec();
    out.resize(params.len(), ArgValue::Absent);
    Ok(out)
}

/* ───────────────────── argument helpers ───────────────────── */

/// A numeric argument. Absent counts as zero, like an unresolved column;
/// text or a date where a number belongs is `#VALUE!`.
pub(crate) fn number_arg(args: &[ArgValue], index: usize, spec: &ParamSpec) -> Result<f64, EvalError> {
    match args.get(index) {
        Some(ArgValue::Number(n)) => Ok(*n),
        Some(ArgValue::Absent) | None => Ok(0.0),
        Some(other) => Err(EvalError::new(EvalErrorKind::Value)
            .with_message(format!("parameter `{}` is not numeric: {other:?}", spec.name))),
    }
}

pub(crate) fn optional_number(args: &[ArgValue], index: usize) -> Option<f64> {
    args.get(index).and_then(ArgValue::as_number)
}
