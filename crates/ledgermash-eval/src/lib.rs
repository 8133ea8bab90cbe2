pub mod aggregate;
pub mod analytics;
pub mod builtins;
pub mod clock;
pub mod context;
pub mod function;
pub mod interpreter;
pub mod library;
pub mod resolver;
pub mod translate;

pub mod engine;

pub use aggregate::{Aggregator, ResultEntry, ResultSet, RunStats, UNKEYED_GROUP};
pub use analytics::{Analytics, ColumnProfile, Mode, ProbabilityCurve, compute_analytics};
pub use builtins::{BUILTIN_LIBRARIES, builtin_library};
pub use clock::{ClockProvider, FixedClock};
#[cfg(feature = "system-clock")]
pub use clock::SystemClock;
pub use context::RunContext;
pub use engine::{AcquireError, Engine, RunError, SourceProvider, acquire_all};
pub use function::{ArgValue, FnCaps, Function, FunctionContext, ParamKind, ParamSpec};
pub use library::{Library, LibrarySet, LookupTable};
pub use translate::{FieldTranslator, HeaderIndex};
