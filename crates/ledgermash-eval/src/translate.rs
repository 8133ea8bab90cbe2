//! Fuzzy field-name → column-header matching.
//!
//! Both sides are normalised by [`stem`] and compared by containment: the
//! stemmed header must contain the stemmed field. The first header in column
//! order wins, so `Late_Charges` answers for `charge` before `Charge_Code`
//! would if it comes first.

use std::collections::BTreeMap;

/// Suffix rules applied in order, each at most once: `(suffix, replacement)`.
const SUFFIX_RULES: &[&[(&str, &str)]] = &[
    &[("ing", "")],
    &[("ed", "")],
    &[("ly", "")],
    &[("es", "e")],
    &[("s", "")],
    &[("est", ""), ("er", "")],
];

/// Lower-case `word` and strip the fixed suffix sequence.
///
/// A suffix is only stripped when a non-empty stem remains.
pub fn stem(word: &str) -> String {
    let mut out = word.trim().to_lowercase();
    for rule in SUFFIX_RULES {
        for (suffix, replacement) in *rule {
            if out.len() > suffix.len() && out.ends_with(suffix) {
                out.truncate(out.len() - suffix.len());
                out.push_str(replacement);
                break;
            }
        }
    }
    out
}

/// Headers of one source, pre-stemmed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderIndex {
    entries: Vec<(String, String)>,
}

impl HeaderIndex {
    pub fn new(headers: &[String]) -> Self {
        Self {
            entries: headers.iter().map(|h| (h.clone(), stem(h))).collect(),
        }
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(h, _)| h.as_str())
    }

    fn find_stemmed(&self, stemmed: &str) -> Option<&str> {
        if stemmed.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(_, s)| s.contains(stemmed))
            .map(|(h, _)| h.as_str())
    }
}

/// Stem-and-contain matcher with an optional synonym table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTranslator {
    /// stemmed field → stemmed alternatives, in configured order
    synonyms: BTreeMap<String, Vec<String>>,
}

impl FieldTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a raw synonym table; keys and alternatives are stemmed here.
    pub fn with_synonyms(synonyms: &BTreeMap<String, Vec<String>>) -> Self {
        let mut table: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, alts) in synonyms {
            let slot = table.entry(stem(key)).or_default();
            for alt in alts {
                let s = stem(alt);
                if !s.is_empty() && !slot.contains(&s) {
                    slot.push(s);
                }
            }
        }
        Self { synonyms: table }
    }

    /// Match `field` against a pre-stemmed header index.
    pub fn translate_indexed<'h>(&self, index: &'h HeaderIndex, field: &str) -> Option<&'h str> {
        let stemmed = stem(field);
        if stemmed.is_empty() {
            return None;
        }
        if let Some(h) = index.find_stemmed(&stemmed) {
            return Some(h);
        }
        self.synonyms
            .get(&stemmed)?
            .iter()
            .find_map(|alt| index.find_stemmed(alt))
    }

    /// Match `field` against raw headers. Returns one of `headers` or `None`.
    pub fn translate<'h>(&self, headers: &'h [String], field: &str) -> Option<&'h str> {
        let index = HeaderIndex::new(headers);
        let found = self.translate_indexed(&index, field)?;
        headers.iter().find(|h| h.as_str() == found).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn stem_strips_suffix_sequence() {
        assert_eq!(stem("Charges"), "charge");
        assert_eq!(stem("Late_Charges"), "late_charge");
        assert_eq!(stem("rates"), "rate");
        assert_eq!(stem("Balances"), "balance");
        assert_eq!(stem("Pending"), "pend");
        assert_eq!(stem("monthly"), "month");
        assert_eq!(stem("Payments"), "payment");
        assert_eq!(stem("largest"), "larg");
        assert_eq!(stem("Principal"), "principal");
    }

    #[test]
    fn stem_never_empties_a_word() {
        assert_eq!(stem("s"), "s");
        assert_eq!(stem("ed"), "ed");
        assert_eq!(stem("es"), "e");
        assert_eq!(stem(""), "");
    }

    #[test]
    fn containment_matches_compound_headers() {
        let t = FieldTranslator::new();
        let headers = hs(&["AccountId", "Late_Charges", "Principal_Balance"]);
        assert_eq!(t.translate(&headers, "charge"), Some("Late_Charges"));
        assert_eq!(t.translate(&headers, "principal"), Some("Principal_Balance"));
        assert_eq!(t.translate(&headers, "balances"), Some("Principal_Balance"));
        assert_eq!(t.translate(&headers, "rate"), None);
    }

    #[test]
    fn first_header_in_order_wins() {
        let t = FieldTranslator::new();
        let headers = hs(&["CurrentBalance", "Balance"]);
        assert_eq!(t.translate(&headers, "balance"), Some("CurrentBalance"));
    }

    #[test]
    fn synonyms_apply_only_after_direct_miss() {
        let mut syn = BTreeMap::new();
        syn.insert("payment".to_string(), vec!["installment".to_string(), "pmt".to_string()]);
        let t = FieldTranslator::with_synonyms(&syn);
        let headers = hs(&["pmt_amt", "Installments"]);
        // first synonym wins over header order
        assert_eq!(t.translate(&headers, "payments"), Some("Installments"));
        let direct = hs(&["pmt_amt", "MonthlyPayment"]);
        assert_eq!(t.translate(&direct, "payment"), Some("MonthlyPayment"));
    }

    #[test]
    fn empty_field_is_unresolved() {
        let t = FieldTranslator::new();
        assert_eq!(t.translate(&hs(&["a", "b"]), ""), None);
        assert_eq!(t.translate(&hs(&["a", "b"]), "   "), None);
    }

    proptest! {
        #[test]
        fn translation_is_deterministic_and_returns_a_member(
            headers in prop::collection::vec("[A-Za-z_]{1,12}", 0..8),
            field in "[A-Za-z]{1,8}",
        ) {
            let t = FieldTranslator::new();
            let first = t.translate(&headers, &field).map(str::to_string);
            let second = t.translate(&headers, &field).map(str::to_string);
            prop_assert_eq!(&first, &second);
            if let Some(h) = first {
                prop_assert!(headers.contains(&h));
                prop_assert!(stem(&h).contains(&stem(&field)));
            } else {
                let sf = stem(&field);
                prop_assert!(headers.iter().all(|h| !stem(h).contains(&sf)));
            }
        }
    }
}
