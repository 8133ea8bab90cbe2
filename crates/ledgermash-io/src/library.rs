//! Resolves a run's library identifiers to loaded libraries, applying
//! per-run attribute and dictionary overrides and reading external tables.

use std::path::{Path, PathBuf};

use ledgermash_common::{FieldValue, RunConfig};
use ledgermash_eval::{
    AcquireError, BUILTIN_LIBRARIES, LibrarySet, LookupTable, builtin_library,
};

use crate::csv::{CsvReadOptions, read_source_path};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unknown library `{name}` (available: {available})", available = BUILTIN_LIBRARIES.join(", "))]
    UnknownLibrary { name: String },

    #[error("library data given for `{0}`, which is not in the run's library list")]
    UnlistedLibraryData(String),

    #[error("failed to load table `{table}` of library `{library}`: {error}")]
    Table {
        library: String,
        table: String,
        #[source]
        error: AcquireError,
    },

    #[error("table `{table}` ({}) has no rows with a numeric key and value", .path.display())]
    EmptyTable { table: String, path: PathBuf },
}

/// Load every library the run names, in order. Relative table paths
/// resolve against `base_dir`.
pub fn load_libraries(config: &RunConfig, base_dir: &Path) -> Result<LibrarySet, LoadError> {
    if let Some(unlisted) = config
        .library_data
        .keys()
        .find(|name| !config.libraries.contains(name))
    {
        return Err(LoadError::UnlistedLibraryData(unlisted.clone()));
    }

    let mut set = LibrarySet::new();
    for name in &config.libraries {
        let mut library = builtin_library(name).ok_or_else(|| LoadError::UnknownLibrary {
            name: name.clone(),
        })?;
        if let Some(data) = config.library_data.get(name) {
            for (attr, value) in &data.attributes {
                library.set_attribute(attr, *value);
            }
            for (dict, entries) in &data.dictionaries {
                for (key, value) in entries {
                    library.set_dictionary_entry(dict, key, *value);
                }
            }
            for (table, path) in &data.tables {
                let path = base_dir.join(path);
                let lookup = load_table(name, table, &path)?;
                tracing::debug!(
                    library = name.as_str(),
                    table = table.as_str(),
                    entries = lookup.len(),
                    "loaded lookup table"
                );
                library.set_table(table, lookup);
            }
        }
        tracing::info!(
            library = name.as_str(),
            functions = library.functions().len(),
            "library loaded"
        );
        set.push(library);
    }
    Ok(set)
}

/// Read a two-column key/value table. Rows whose first two fields are not
/// both numeric (labels, notes) are ignored.
///
/// A `label,number` row is not turned around into `number → label`: lookup
/// tables map numbers to numbers, so such a row has no usable value and is
/// dropped with the other label rows.
pub fn load_table(library: &str, table: &str, path: &Path) -> Result<LookupTable, LoadError> {
    let source = read_source_path(table, path, &CsvReadOptions::default()).map_err(|error| {
        LoadError::Table {
            library: library.to_string(),
            table: table.to_string(),
            error,
        }
    })?;
    let pairs: Vec<(f64, f64)> = source
        .records()
        .iter()
        .filter_map(|r| {
            let key = r.value_at(0).and_then(FieldValue::as_number)?;
            let value = r.value_at(1).and_then(FieldValue::as_number)?;
            Some((key, value))
        })
        .collect();
    let lookup = LookupTable::from_pairs(pairs);
    if lookup.is_empty() {
        return Err(LoadError::EmptyTable {
            table: table.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(lookup)
}
