//! Tabular input: records, named sources and the per-run source set.

use std::sync::Arc;

use crate::FieldValue;

/// One row of a source: an ordered header → value mapping.
///
/// Headers are shared with the owning [`Source`]; values are immutable once
/// the record is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    headers: Arc<[String]>,
    values: Vec<FieldValue>,
}

impl Record {
    /// Build a record; `None` when the value count differs from the header count.
    pub fn new(headers: Arc<[String]>, values: Vec<FieldValue>) -> Option<Self> {
        if headers.len() != values.len() {
            return None;
        }
        Some(Self { headers, values })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn get(&self, header: &str) -> Option<&FieldValue> {
        self.headers
            .iter()
            .position(|h| h == header)
            .map(|i| &self.values[i])
    }

    pub fn value_at(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// A named, ordered collection of records sharing one header list.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    name: String,
    headers: Arc<[String]>,
    records: Vec<Record>,
}

impl Source {
    pub fn new<S: Into<String>>(name: S, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers: headers.into(),
            records: Vec::new(),
        }
    }

    /// Append a row. Rows whose length differs from the header list are
    /// discarded and `false` is returned.
    pub fn push_row(&mut self, values: Vec<FieldValue>) -> bool {
        match Record::new(Arc::clone(&self.headers), values) {
            Some(rec) => {
                self.records.push(rec);
                true
            }
            None => false,
        }
    }

    /// Builder-style convenience for tests and programmatic sources.
    pub fn with_row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.push_row(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every value of one column, in record order.
    pub fn column(&self, header: &str) -> Option<impl Iterator<Item = &FieldValue>> {
        let idx = self.headers.iter().position(|h| h == header)?;
        Some(self.records.iter().filter_map(move |r| r.value_at(idx)))
    }
}

/// The sources acquired for one run, kept in acquisition order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSet {
    sources: Vec<Source>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a source, replacing any existing source with the same name in place.
    pub fn insert(&mut self, source: Source) {
        match self.sources.iter_mut().find(|s| s.name == source.name) {
            Some(slot) => *slot = source,
            None => self.sources.push(source),
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.insert(source);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl FromIterator<Source> for SourceSet {
    fn from_iter<T: IntoIterator<Item = Source>>(iter: T) -> Self {
        let mut set = SourceSet::new();
        for s in iter {
            set.insert(s);
        }
        set
    }
}
