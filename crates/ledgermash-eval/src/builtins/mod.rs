pub mod financial;

use crate::library::Library;

/// Identifiers accepted in a run's `libraries` list.
pub const BUILTIN_LIBRARIES: &[&str] = &[financial::LIBRARY_NAME];

/// A fresh copy of the named built-in library, ready for per-run overrides.
pub fn builtin_library(name: &str) -> Option<Library> {
    match name {
        financial::LIBRARY_NAME => Some(financial::library()),
        _ => None,
    }
}
