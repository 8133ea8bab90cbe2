//! Run orchestration: acquire every source the formula names, profile them,
//! then evaluate and aggregate under one captured `now`.

use std::sync::Arc;

use ledgermash_common::{RunConfig, Source, SourceSet};
use ledgermash_parse::{Formula, ParserError};
use rayon::prelude::*;

use crate::aggregate::{Aggregator, ResultSet};
use crate::analytics::{Analytics, compute_analytics};
use crate::clock::ClockProvider;
use crate::context::RunContext;
use crate::library::LibrarySet;
use crate::translate::FieldTranslator;

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("no data available for source `{0}`")]
    MissingSource(String),

    #[error("failed to read source `{name}`: {error}")]
    Io {
        name: String,
        #[source]
        error: std::io::Error,
    },

    #[error("source `{name}` could not be parsed by {backend}: {message}")]
    Backend {
        name: String,
        backend: &'static str,
        message: String,
    },
}

impl AcquireError {
    pub fn from_backend<E: std::fmt::Display>(name: &str, backend: &'static str, e: E) -> Self {
        AcquireError::Backend {
            name: name.to_string(),
            backend,
            message: e.to_string(),
        }
    }

    /// The source the failure belongs to.
    pub fn source_name(&self) -> &str {
        match self {
            AcquireError::MissingSource(name)
            | AcquireError::Io { name, .. }
            | AcquireError::Backend { name, .. } => name,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("formula does not parse: {0}")]
    Formula(#[from] ParserError),

    #[error(transparent)]
    Acquire(#[from] AcquireError),
}

/// Supplies the data of a named source.
pub trait SourceProvider: Sync {
    fn acquire(&self, name: &str) -> Result<Source, AcquireError>;
}

impl SourceProvider for SourceSet {
    fn acquire(&self, name: &str) -> Result<Source, AcquireError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| AcquireError::MissingSource(name.to_string()))
    }
}

/// Acquire every named source in parallel. Any failure fails the whole set;
/// the first failure in name order is reported.
pub fn acquire_all<P: SourceProvider + ?Sized>(
    provider: &P,
    names: &[String],
) -> Result<SourceSet, AcquireError> {
    let _span = tracing::info_span!("acquire_all", sources = names.len()).entered();
    let acquired: Vec<Result<Source, AcquireError>> =
        names.par_iter().map(|name| provider.acquire(name)).collect();
    acquired.into_iter().collect()
}

/// A configured run: parsed formula, loaded libraries and a clock.
pub struct Engine {
    config: RunConfig,
    formula: Formula,
    libraries: LibrarySet,
    translator: FieldTranslator,
    clock: Arc<dyn ClockProvider>,
}

impl Engine {
    /// Parses the formula up front; a formula that does not parse never runs.
    pub fn with_clock(
        config: RunConfig,
        libraries: LibrarySet,
        clock: Arc<dyn ClockProvider>,
    ) -> Result<Self, RunError> {
        let formula = Formula::parse(&config.formula)?;
        let translator = FieldTranslator::with_synonyms(&config.synonyms);
        Ok(Self {
            config,
            formula,
            libraries,
            translator,
            clock,
        })
    }

    #[cfg(feature = "system-clock")]
    pub fn new(config: RunConfig, libraries: LibrarySet) -> Result<Self, RunError> {
        Self::with_clock(config, libraries, Arc::new(crate::clock::SystemClock))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn libraries(&self) -> &LibrarySet {
        &self.libraries
    }

    /// Distinct source names in formula order.
    pub fn required_sources(&self) -> &[String] {
        self.formula.sources()
    }

    /// Evaluate over already loaded sources. Every source the formula names
    /// must be present.
    pub fn run(&self, sources: &SourceSet) -> Result<ResultSet, RunError> {
        let _span = tracing::info_span!("run", formula = %self.formula).entered();
        if let Some(missing) = self
            .required_sources()
            .iter()
            .find(|name| sources.get(name).is_none())
        {
            return Err(AcquireError::MissingSource(missing.clone()).into());
        }

        let analytics = self.profile(sources);
        let now = self.clock.now();
        tracing::debug!(%now, "captured run clock");
        let run = RunContext::new(self.libraries.clone(), analytics, self.translator.clone(), now);

        let aggregator = Aggregator::new(
            &run,
            &self.formula,
            self.config.unique.as_deref(),
            &self.config.presentation.columns,
        );
        let results = aggregator.aggregate(sources);
        let stats = results.stats();
        tracing::info!(
            groups = results.len(),
            records = stats.records,
            contributed = stats.contributed,
            skipped = stats.skipped,
            "run complete"
        );
        Ok(results)
    }

    /// Acquire the formula's sources first, then run. Nothing is evaluated
    /// unless every source arrives.
    pub fn run_with<P: SourceProvider + ?Sized>(&self, provider: &P) -> Result<ResultSet, RunError> {
        let sources = acquire_all(provider, self.required_sources())?;
        self.run(&sources)
    }

    pub fn profile(&self, sources: &SourceSet) -> Analytics {
        compute_analytics(sources, &self.config.curve_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use ledgermash_common::FieldValue;

    fn clock() -> Arc<dyn ClockProvider> {
        Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
    }

    struct Failing;

    impl SourceProvider for Failing {
        fn acquire(&self, name: &str) -> Result<Source, AcquireError> {
            if name == "bad" {
                Err(AcquireError::from_backend(name, "test", "boom"))
            } else {
                Ok(Source::new(name, vec!["x".into()]).with_row([FieldValue::Number(1.0)]))
            }
        }
    }

    #[test]
    fn bad_formula_is_rejected_before_running() {
        let err = Engine::with_clock(RunConfig::new("loan.rate *"), LibrarySet::new(), clock());
        assert!(matches!(err, Err(RunError::Formula(_))));
    }

    #[test]
    fn acquisition_is_all_or_nothing() {
        let engine =
            Engine::with_clock(RunConfig::new("good.x + bad.x"), LibrarySet::new(), clock()).unwrap();
        let err = engine.run_with(&Failing).unwrap_err();
        match err {
            RunError::Acquire(e) => assert_eq!(e.source_name(), "bad"),
            other => panic!("unexpected {other:?}"),
        }

        let engine = Engine::with_clock(RunConfig::new("good.x * 3"), LibrarySet::new(), clock())
            .unwrap();
        let results = engine.run_with(&Failing).unwrap();
        assert_eq!(results.stats().contributed, 1);
    }

    #[test]
    fn missing_source_fails_run() {
        let engine = Engine::with_clock(RunConfig::new("loan.x"), LibrarySet::new(), clock()).unwrap();
        let err = engine.run(&SourceSet::new()).unwrap_err();
        assert!(matches!(err, RunError::Acquire(AcquireError::MissingSource(ref n)) if n == "loan"));
    }
}
