//! Libraries bundle functions with the constants and lookup data they read.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::function::Function;

/// A named numeric constant with a human description.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub description: String,
    pub value: f64,
}

/// Numeric key → value table with step lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable {
    /// sorted by key, keys unique
    entries: Vec<(f64, f64)>,
}

impl LookupTable {
    /// Build from pairs; non-finite keys are dropped and a repeated key keeps its last value.
    pub fn from_pairs<I: IntoIterator<Item = (f64, f64)>>(pairs: I) -> Self {
        let mut entries: Vec<(f64, f64)> = Vec::new();
        for (k, v) in pairs {
            if !k.is_finite() {
                continue;
            }
            match entries.iter_mut().find(|(ek, _)| *ek == k) {
                Some(slot) => slot.1 = v,
                None => entries.push((k, v)),
            }
        }
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { entries }
    }

    /// Value for the greatest key `<= key`; below the first key, the first value.
    pub fn lookup(&self, key: f64) -> Option<f64> {
        let first = self.entries.first()?;
        if key < first.0 {
            return Some(first.1);
        }
        self.entries
            .iter()
            .take_while(|(k, _)| *k <= key)
            .last()
            .map(|(_, v)| *v)
    }

    pub fn entries(&self) -> &[(f64, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A named bundle of functions, attributes, dictionaries and tables.
#[derive(Clone, Default)]
pub struct Library {
    name: String,
    description: String,
    functions: Vec<Arc<dyn Function>>,
    attributes: BTreeMap<String, Attribute>,
    dictionaries: BTreeMap<String, BTreeMap<String, f64>>,
    tables: BTreeMap<String, LookupTable>,
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field(
                "functions",
                &self.functions.iter().map(|x| x.name()).collect::<Vec<_>>(),
            )
            .field("attributes", &self.attributes)
            .field("dictionaries", &self.dictionaries)
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Library {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Register a function; a later function with the same name replaces the earlier one.
    pub fn with_function(mut self, f: Arc<dyn Function>) -> Self {
        self.functions.retain(|g| g.name() != f.name());
        self.functions.push(f);
        self
    }

    pub fn with_attribute<N: Into<String>, D: Into<String>>(
        mut self,
        name: N,
        description: D,
        value: f64,
    ) -> Self {
        self.attributes.insert(
            name.into(),
            Attribute {
                description: description.into(),
                value,
            },
        );
        self
    }

    pub fn with_dictionary<N, I, K>(mut self, name: N, entries: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.dictionaries.insert(
            name.into(),
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        );
        self
    }

    pub fn with_table<N: Into<String>>(mut self, name: N, table: LookupTable) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Override an attribute's value, keeping any existing description.
    pub fn set_attribute(&mut self, name: &str, value: f64) {
        self.attributes
            .entry(name.to_string())
            .and_modify(|a| a.value = value)
            .or_insert_with(|| Attribute {
                description: String::new(),
                value,
            });
    }

    /// Override or add one dictionary entry.
    pub fn set_dictionary_entry(&mut self, dictionary: &str, key: &str, value: f64) {
        self.dictionaries
            .entry(dictionary.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn set_table(&mut self, name: &str, table: LookupTable) {
        self.tables.insert(name.to_string(), table);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn functions(&self) -> &[Arc<dyn Function>] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&Arc<dyn Function>> {
        self.functions.iter().find(|f| f.name() == name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).map(|a| a.value)
    }

    pub fn dictionaries(&self) -> &BTreeMap<String, BTreeMap<String, f64>> {
        &self.dictionaries
    }

    /// Exact key first, then a case-insensitive match.
    pub fn dictionary_value(&self, dictionary: &str, key: &str) -> Option<f64> {
        let dict = self.dictionaries.get(dictionary)?;
        dict.get(key).copied().or_else(|| {
            dict.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| *v)
        })
    }

    pub fn table(&self, name: &str) -> Option<&LookupTable> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> &BTreeMap<String, LookupTable> {
        &self.tables
    }
}

/// The libraries loaded for a run, in load order.
#[derive(Debug, Clone, Default)]
pub struct LibrarySet {
    libraries: Vec<Arc<Library>>,
}

impl LibrarySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, library: Library) {
        self.libraries.push(Arc::new(library));
    }

    pub fn with_library(mut self, library: Library) -> Self {
        self.push(library);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Library> {
        self.libraries
            .iter()
            .find(|l| l.name() == name)
            .map(Arc::as_ref)
    }

    /// First library (in load order) that defines `name`.
    pub fn find_function(&self, name: &str) -> Option<(&Library, &Arc<dyn Function>)> {
        self.libraries
            .iter()
            .find_map(|l| l.function(name).map(|f| (l.as_ref(), f)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Library> {
        self.libraries.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

impl FromIterator<Library> for LibrarySet {
    fn from_iter<T: IntoIterator<Item = Library>>(iter: T) -> Self {
        Self {
            libraries: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{ArgValue, FunctionContext, ParamSpec};
    use ledgermash_common::EvalError;

    struct Named(&'static str, f64);

    impl Function for Named {
        fn name(&self) -> &'static str {
            self.0
        }
        fn params(&self) -> &'static [ParamSpec] {
            &[]
        }
        fn eval(&self, _: &[ArgValue], _: &dyn FunctionContext) -> Result<f64, EvalError> {
            Ok(self.1)
        }
    }

    #[test]
    fn table_lookup_steps_down_to_nearest_key() {
        let t = LookupTable::from_pairs([(12.0, 0.04), (1.0, 0.02), (6.0, 0.03), (6.0, 0.035)]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.lookup(0.0), Some(0.02));
        assert_eq!(t.lookup(1.0), Some(0.02));
        assert_eq!(t.lookup(7.0), Some(0.035));
        assert_eq!(t.lookup(360.0), Some(0.04));
        assert_eq!(LookupTable::default().lookup(1.0), None);
    }

    #[test]
    fn first_library_defining_a_function_wins() {
        let set: LibrarySet = [
            Library::new("a").with_function(Arc::new(Named("f", 1.0))),
            Library::new("b")
                .with_function(Arc::new(Named("f", 2.0)))
                .with_function(Arc::new(Named("g", 3.0))),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.find_function("f").unwrap().0.name(), "a");
        assert_eq!(set.find_function("g").unwrap().0.name(), "b");
        assert!(set.find_function("h").is_none());
    }

    #[test]
    fn overrides_keep_descriptions() {
        let mut lib = Library::new("fin").with_attribute("factor", "servicing factor", 0.0025);
        lib.set_attribute("factor", 0.003);
        lib.set_attribute("fresh", 1.0);
        assert_eq!(lib.attribute("factor"), Some(0.003));
        assert_eq!(lib.attributes()["factor"].description, "servicing factor");
        assert_eq!(lib.attribute("fresh"), Some(1.0));
    }

    #[test]
    fn dictionary_lookup_falls_back_to_case_insensitive() {
        let mut lib = Library::new("fin").with_dictionary("rates", [("DDA", 0.012)]);
        lib.set_dictionary_entry("rates", "SAV", 0.008);
        assert_eq!(lib.dictionary_value("rates", "DDA"), Some(0.012));
        assert_eq!(lib.dictionary_value("rates", "dda"), Some(0.012));
        assert_eq!(lib.dictionary_value("rates", "SAV"), Some(0.008));
        assert_eq!(lib.dictionary_value("rates", "CD"), None);
        assert_eq!(lib.dictionary_value("missing", "DDA"), None);
    }
}
