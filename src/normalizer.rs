use crate::model::Fact;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Folds a person name into the form used for matching: accents dropped,
/// lowercase, punctuation turned into spaces, whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identifiers (NIF, BI, passport) compare on their ASCII alphanumerics only.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Fills `normalized_name`, drops facts that normalize to nothing and removes
/// duplicates of the same kind and name within a source.
pub fn normalize_all(facts: &mut Vec<Fact>) {
    for fact in facts.iter_mut() {
        fact.normalized_name = normalize_name(&fact.name);
        fact.identifiers = fact
            .identifiers
            .iter()
            .map(|id| normalize_identifier(id))
            .filter(|id| !id.is_empty())
            .collect();
    }

    let mut seen = HashSet::new();
    facts.retain(|fact| {
        !fact.normalized_name.is_empty()
            && seen.insert((fact.source_id, fact.kind, fact.normalized_name.clone()))
    });
}
