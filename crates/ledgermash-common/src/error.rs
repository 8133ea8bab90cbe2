//! Evaluation error representation shared by the resolver, the interpreter
//! and library functions.
//!
//! - **`EvalErrorKind`** : the fixed set of failure classes
//! - **`EvalError`**     : kind plus an optional human explanation
//!
//! Any `EvalError` raised while a record is evaluated makes that record
//! contribute nothing; the run itself carries on.

use std::{error::Error, fmt};

/// All recognised evaluation failure classes.
///
/// `Display` renders them as short spreadsheet-like codes (`#DIV/0!`, …) so
/// log lines stay greppable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EvalErrorKind {
    /// A value could not be coerced to the type an operation needs.
    Value,
    /// Division by zero.
    Div,
    /// Non-finite or otherwise invalid numeric result.
    Num,
    /// A named function does not exist.
    Name,
    /// A library attribute, dictionary, table or profile is missing.
    Config,
    /// A function received the wrong number of arguments.
    Arity,
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Value => "#VALUE!",
            Self::Div => "#DIV/0!",
            Self::Num => "#NUM!",
            Self::Name => "#NAME?",
            Self::Config => "#CONFIG!",
            Self::Arity => "#ARITY!",
        })
    }
}

impl EvalErrorKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "#value!" => Some(Self::Value),
            "#div/0!" => Some(Self::Div),
            "#num!" => Some(Self::Num),
            "#name?" => Some(Self::Name),
            "#config!" => Some(Self::Config),
            "#arity!" => Some(Self::Arity),
            _ => None,
        }
    }
}

/// The single error struct passed around during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: Option<String>,
}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        kind.into()
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    pub fn new_value() -> Self {
        Self::new(EvalErrorKind::Value)
    }

    pub fn new_div() -> Self {
        Self::new(EvalErrorKind::Div)
    }

    pub fn new_num() -> Self {
        Self::new(EvalErrorKind::Num)
    }

    pub fn new_name() -> Self {
        Self::new(EvalErrorKind::Name)
    }

    pub fn new_config() -> Self {
        Self::new(EvalErrorKind::Config)
    }

    pub fn new_arity() -> Self {
        Self::new(EvalErrorKind::Arity)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl Error for EvalError {}

impl From<EvalError> for String {
    fn from(error: EvalError) -> Self {
        format!("{error}")
    }
}

impl PartialEq<str> for EvalErrorKind {
    fn eq(&self, other: &str) -> bool {
        format!("{self}") == other
    }
}

impl PartialEq<&str> for EvalError {
    fn eq(&self, other: &&str) -> bool {
        self.kind.to_string() == *other
    }
}
