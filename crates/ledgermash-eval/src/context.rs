//! Per-run state handed to the resolver and to every library function call.
//!
//! A `RunContext` is built once per run, after analytics and before the
//! first record is evaluated, and is never shared across runs.

use chrono::NaiveDateTime;
use ledgermash_common::EvalError;

use crate::analytics::{Analytics, ColumnProfile};
use crate::function::{ArgValue, Function, FunctionContext, fit_args};
use crate::library::{Library, LibrarySet};
use crate::translate::{FieldTranslator, HeaderIndex};

/// Sibling calls nest at most this deep.
pub const MAX_CALL_DEPTH: usize = 16;

pub struct RunContext {
    libraries: LibrarySet,
    analytics: Analytics,
    translator: FieldTranslator,
    now: NaiveDateTime,
}

impl RunContext {
    pub fn new(
        libraries: LibrarySet,
        analytics: Analytics,
        translator: FieldTranslator,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            libraries,
            analytics,
            translator,
            now,
        }
    }

    pub fn libraries(&self) -> &LibrarySet {
        &self.libraries
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn translator(&self) -> &FieldTranslator {
        &self.translator
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn into_analytics(self) -> Analytics {
        self.analytics
    }

    /// Invoke `function` of `library` for a record of `source`.
    pub fn invoke(
        &self,
        library: &Library,
        function: &dyn Function,
        args: &[ArgValue],
        source: &str,
        headers: &HeaderIndex,
    ) -> Result<f64, EvalError> {
        let ctx = CallContext {
            run: self,
            library,
            function,
            source,
            headers,
            depth: 0,
        };
        let args = fit_args(function, args)?;
        function.eval(&args, &ctx)
    }
}

struct CallContext<'a> {
    run: &'a RunContext,
    library: &'a Library,
    function: &'a dyn Function,
    source: &'a str,
    headers: &'a HeaderIndex,
    depth: usize,
}

impl CallContext<'_> {
    fn missing(&self, what: &str, name: &str) -> EvalError {
        EvalError::new_config().with_message(format!(
            "{what} `{name}` is not loaded in library `{}` (needed by {})",
            self.library.name(),
            self.function.name()
        ))
    }
}

impl FunctionContext for CallContext<'_> {
    fn now(&self) -> NaiveDateTime {
        self.run.now
    }

    fn attribute(&self, name: &str) -> Result<f64, EvalError> {
        self.library
            .attribute(name)
            .ok_or_else(|| self.missing("attribute", name))
    }

    fn dictionary_value(&self, dictionary: &str, key: &str) -> Result<f64, EvalError> {
        if !self.library.dictionaries().contains_key(dictionary) {
            return Err(self.missing("dictionary", dictionary));
        }
        self.library
            .dictionary_value(dictionary, key)
            .ok_or_else(|| self.missing(&format!("entry `{key}` of dictionary"), dictionary))
    }

    fn table_lookup(&self, table: &str, key: f64) -> Result<f64, EvalError> {
        self.library
            .table(table)
            .and_then(|t| t.lookup(key))
            .ok_or_else(|| self.missing("table", table))
    }

    fn call(&self, function: &str, args: &[ArgValue]) -> Result<f64, EvalError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::new_num().with_message(format!(
                "call depth exceeded calling {function} from {}",
                self.function.name()
            )));
        }
        let sibling = self.library.function(function).ok_or_else(|| {
            EvalError::new_name().with_message(format!(
                "library `{}` has no function `{function}`",
                self.library.name()
            ))
        })?;
        let args = fit_args(sibling.as_ref(), args)?;
        let ctx = CallContext {
            run: self.run,
            library: self.library,
            function: sibling.as_ref(),
            source: self.source,
            headers: self.headers,
            depth: self.depth + 1,
        };
        sibling.eval(&args, &ctx)
    }

    fn param_profile(&self, index: usize) -> Option<&ColumnProfile> {
        let spec = self.function.params().get(index)?;
        let header = self
            .run
            .translator
            .translate_indexed(self.headers, spec.name)?;
        self.run.analytics.profile(self.source, header)
    }

    fn profile(&self, source: &str, column: &str) -> Option<&ColumnProfile> {
        self.run.analytics.profile(source, column)
    }
}
