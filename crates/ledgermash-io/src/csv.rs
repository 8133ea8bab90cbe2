use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use ledgermash_common::{FieldValue, RunConfig, Source};
use ledgermash_eval::{AcquireError, SourceProvider};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CsvTrim {
    /// Only headers are trimmed; values keep their padding until inference.
    #[default]
    Headers,
    All,
}

#[derive(Clone, Debug)]
pub struct CsvReadOptions {
    /// Field delimiter as a single byte. Use `b'\t'` for TSV.
    pub delimiter: u8,
    pub trim: CsvTrim,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: CsvTrim::Headers,
        }
    }
}

/// Read one source from delimited text.
///
/// Semantics:
/// - The first row holds the headers (trimmed).
/// - Rows whose field count differs from the header count are discarded.
/// - Fields are inferred: blank → `Empty`, finite number → `Number`,
///   anything else → trimmed `Text`.
pub fn read_source<R: Read>(
    name: &str,
    reader: R,
    options: &CsvReadOptions,
) -> Result<Source, AcquireError> {
    let mut rb = csv::ReaderBuilder::new();
    rb.delimiter(options.delimiter)
        .has_headers(true)
        // Ragged rows are dropped below rather than failing the read.
        .flexible(true);
    match options.trim {
        CsvTrim::Headers => rb.trim(csv::Trim::Headers),
        CsvTrim::All => rb.trim(csv::Trim::All),
    };

    let mut rdr = rb.from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| AcquireError::from_backend(name, "csv", e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut source = Source::new(name, headers);
    let mut discarded = 0usize;
    for rec in rdr.records() {
        let rec = rec.map_err(|e| AcquireError::from_backend(name, "csv", e))?;
        let row: Vec<FieldValue> = rec.iter().map(FieldValue::infer).collect();
        if !source.push_row(row) {
            discarded += 1;
        }
    }
    if discarded > 0 {
        tracing::debug!(source = name, discarded, "dropped rows with mismatched field counts");
    }
    Ok(source)
}

pub fn read_source_path<P: AsRef<Path>>(
    name: &str,
    path: P,
    options: &CsvReadOptions,
) -> Result<Source, AcquireError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            AcquireError::MissingSource(name.to_string())
        } else {
            AcquireError::Io {
                name: name.to_string(),
                error,
            }
        }
    })?;
    read_source(name, BufReader::new(file), options)
}

/// Resolves source names to CSV files: explicit paths first, then
/// `<data_dir>/<name>.csv`.
#[derive(Clone, Debug, Default)]
pub struct CsvSourceProvider {
    paths: BTreeMap<String, PathBuf>,
    data_dir: Option<PathBuf>,
    options: CsvReadOptions,
}

impl CsvSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths from a run configuration, relative ones joined onto `base_dir`.
    pub fn from_config(config: &RunConfig, base_dir: &Path) -> Self {
        config
            .sources
            .iter()
            .fold(Self::new(), |p, (name, path)| p.with_path(name, base_dir.join(path)))
    }

    pub fn with_path<N: Into<String>, P: Into<PathBuf>>(mut self, name: N, path: P) -> Self {
        self.paths.insert(name.into(), path.into());
        self
    }

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_options(mut self, options: CsvReadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        self.paths
            .get(name)
            .cloned()
            .or_else(|| self.data_dir.as_ref().map(|d| d.join(format!("{name}.csv"))))
    }
}

impl SourceProvider for CsvSourceProvider {
    fn acquire(&self, name: &str) -> Result<Source, AcquireError> {
        let path = self
            .path_for(name)
            .ok_or_else(|| AcquireError::MissingSource(name.to_string()))?;
        let _span = tracing::debug_span!("acquire", source = name, path = %path.display()).entered();
        let source = read_source_path(name, &path, &self.options)?;
        tracing::debug!(records = source.len(), "source loaded");
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Source {
        read_source("t", text.as_bytes(), &CsvReadOptions::default()).unwrap()
    }

    #[test]
    fn headers_are_trimmed_and_values_inferred() {
        let src = read(" AccountId , Balance ,Branch\n1001, 250.5 , North \n1002,,South\n");
        assert_eq!(src.headers(), &["AccountId", "Balance", "Branch"]);
        let first = &src.records()[0];
        assert_eq!(first.get("AccountId"), Some(&FieldValue::Number(1001.0)));
        assert_eq!(first.get("Balance"), Some(&FieldValue::Number(250.5)));
        assert_eq!(first.get("Branch"), Some(&FieldValue::Text("North".into())));
        assert_eq!(src.records()[1].get("Balance"), Some(&FieldValue::Empty));
    }

    #[test]
    fn ragged_rows_are_discarded() {
        let src = read("a,b\n1,2\n3\n4,5,6\n7,8\n");
        assert_eq!(src.len(), 2);
        assert_eq!(src.records()[1].get("a"), Some(&FieldValue::Number(7.0)));
    }

    #[test]
    fn quoted_fields_and_tabs() {
        let src = read("name,amount\n\"Smith, J\",\"1,5\"\n");
        assert_eq!(
            src.records()[0].get("name"),
            Some(&FieldValue::Text("Smith, J".into()))
        );
        // not a number in this locale
        assert_eq!(
            src.records()[0].get("amount"),
            Some(&FieldValue::Text("1,5".into()))
        );

        let opts = CsvReadOptions {
            delimiter: b'\t',
            ..CsvReadOptions::default()
        };
        let tsv = read_source("t", "a\tb\n1\t2\n".as_bytes(), &opts).unwrap();
        assert_eq!(tsv.records()[0].get("b"), Some(&FieldValue::Number(2.0)));
    }

    #[test]
    fn provider_prefers_explicit_paths() {
        let p = CsvSourceProvider::new()
            .with_data_dir("/data")
            .with_path("loan", "/elsewhere/loans.csv");
        assert_eq!(p.path_for("loan"), Some(PathBuf::from("/elsewhere/loans.csv")));
        assert_eq!(p.path_for("checking"), Some(PathBuf::from("/data/checking.csv")));
        assert_eq!(CsvSourceProvider::new().path_for("x"), None);
        assert!(matches!(
            CsvSourceProvider::new().acquire("x"),
            Err(AcquireError::MissingSource(_))
        ));
    }
}
