pub mod config;
pub mod csv;
pub mod library;

pub use crate::config::{ConfigError, load_run_config};
pub use crate::csv::{CsvReadOptions, CsvSourceProvider, CsvTrim, read_source, read_source_path};
pub use crate::library::{LoadError, load_libraries, load_table};
