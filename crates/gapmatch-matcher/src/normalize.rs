//! Location normalizer: raw location text → canonical region code.
//!
//! Lookup order: exact alias → trailing-state strip → whole-word alias
//! containment → not found. Input hitting two different regions is
//! reported as ambiguous and never guessed.

use gapmatch_core::GapMatchConfig;
use gapmatch_core::types::RegionCode;
use std::collections::{BTreeSet, HashMap};

/// Trailing tokens that only qualify a city ("Denver, CO").
const STATE_SUFFIXES: &[&str] = &[
    "ca", "california", "ny", "new york state", "co", "colorado", "il", "illinois", "mn", "usa",
    "us",
];

/// Result of resolving one location string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(RegionCode),
    Ambiguous(Vec<RegionCode>),
    NotFound,
}

impl Resolution {
    pub fn region(self) -> Option<RegionCode> {
        match self {
            Self::Found(code) => Some(code),
            _ => None,
        }
    }
}

/// Immutable alias → region mapping. Every region code is also an alias of itself.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, RegionCode>,
    regions: BTreeSet<RegionCode>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table built from the `[aliases]` and `regions` config entries.
    pub fn from_config(config: &GapMatchConfig) -> Self {
        let mut table = Self::new();
        for region in &config.regions {
            table.add_region(RegionCode::new(region));
        }
        for (alias, code) in &config.aliases {
            table.insert(alias, RegionCode::new(code));
        }
        table
    }

    pub fn with_alias(mut self, alias: &str, code: &str) -> Self {
        self.insert(alias, RegionCode::new(code));
        self
    }

    pub fn insert(&mut self, alias: &str, code: RegionCode) {
        let key = canonical_key(alias);
        if !key.is_empty() {
            self.aliases.insert(key, code.clone());
        }
        self.add_region(code);
    }

    pub fn add_region(&mut self, code: RegionCode) {
        let key = canonical_key(code.as_str());
        if !key.is_empty() {
            self.aliases.entry(key).or_insert_with(|| code.clone());
        }
        self.regions.insert(code);
    }

    pub fn regions(&self) -> impl Iterator<Item = &RegionCode> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    fn get(&self, key: &str) -> Option<&RegionCode> {
        self.aliases.get(key)
    }
}

/// Pure location → region resolver.
#[derive(Debug, Clone)]
pub struct LocationNormalizer {
    table: AliasTable,
}

impl LocationNormalizer {
    pub fn new(table: AliasTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &AliasTable {
        &self.table
    }

    pub fn resolve(&self, raw: &str) -> Resolution {
        let key = canonical_key(raw);
        if key.is_empty() {
            return Resolution::NotFound;
        }

        if let Some(code) = self.table.get(&key) {
            return Resolution::Found(code.clone());
        }

        if let Some(code) = strip_state_suffix(&key).and_then(|k| self.table.get(&k)) {
            return Resolution::Found(code.clone());
        }

        let words: Vec<&str> = key.split(' ').collect();
        let hits: BTreeSet<RegionCode> = self
            .table
            .aliases
            .iter()
            .filter(|(alias, _)| contains_words(&words, alias))
            .map(|(_, code)| code.clone())
            .collect();

        let mut hits = hits.into_iter();
        match (hits.next(), hits.next()) {
            (None, _) => Resolution::NotFound,
            (Some(code), None) => Resolution::Found(code),
            (Some(first), Some(second)) => {
                let mut all = vec![first, second];
                all.extend(hits);
                Resolution::Ambiguous(all)
            }
        }
    }

    /// `Some` only for an unambiguous hit.
    pub fn normalize(&self, raw: &str) -> Option<RegionCode> {
        self.resolve(raw).region()
    }
}

/// Lowercase, punctuation → space, whitespace collapsed.
pub fn canonical_key(raw: &str) -> String {
    let mapped = raw
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_state_suffix(key: &str) -> Option<String> {
    STATE_SUFFIXES.iter().find_map(|suffix| {
        key.strip_suffix(suffix)
            .and_then(|rest| rest.strip_suffix(' '))
            .map(str::to_string)
            .filter(|rest| !rest.is_empty())
    })
}

/// Whole-word, contiguous containment of `alias` inside `words`.
fn contains_words(words: &[&str], alias: &str) -> bool {
    let needle: Vec<&str> = alias.split(' ').collect();
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words.windows(needle.len()).any(|w| w == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> LocationNormalizer {
        LocationNormalizer::new(AliasTable::from_config(&GapMatchConfig::default()))
    }

    #[test]
    fn test_exact_alias_case_and_whitespace() {
        let n = normalizer();
        assert_eq!(n.normalize("  San Francisco  "), Some(RegionCode::new("SF")));
        assert_eq!(n.normalize("NYC"), Some(RegionCode::new("MANHATTAN")));
        assert_eq!(n.normalize("San Francisco, CA"), Some(RegionCode::new("SF")));
    }

    #[test]
    fn test_region_code_is_its_own_alias() {
        let n = normalizer();
        assert_eq!(n.normalize("sf"), Some(RegionCode::new("SF")));
        assert_eq!(n.normalize("Marin County"), Some(RegionCode::new("MARIN COUNTY")));
    }

    #[test]
    fn test_state_suffix_heuristic() {
        let n = LocationNormalizer::new(AliasTable::new().with_alias("oakland", "EAST BAY"));
        assert_eq!(n.normalize("Oakland, CA"), Some(RegionCode::new("EAST BAY")));
        assert_eq!(n.normalize("Oakland California"), Some(RegionCode::new("EAST BAY")));
    }

    #[test]
    fn test_containment_heuristic() {
        let n = normalizer();
        assert_eq!(n.normalize("SF / Mission district"), Some(RegionCode::new("SF")));
        assert_eq!(n.normalize("Minneapolis - St Paul"), Some(RegionCode::new("MINNESOTA")));
    }

    #[test]
    fn test_containment_is_whole_word() {
        // "la" must not match inside "atlanta"
        let n = normalizer();
        assert_eq!(n.resolve("Atlanta"), Resolution::NotFound);
    }

    #[test]
    fn test_ambiguous_is_not_found() {
        let n = normalizer();
        let res = n.resolve("LA / SF");
        assert_eq!(
            res,
            Resolution::Ambiguous(vec![RegionCode::new("LA"), RegionCode::new("SF")])
        );
        assert_eq!(n.normalize("LA / SF"), None);
    }

    #[test]
    fn test_unknown_location() {
        let n = normalizer();
        assert_eq!(n.resolve("Nowhereville"), Resolution::NotFound);
        assert_eq!(n.resolve("   "), Resolution::NotFound);
    }

    #[test]
    fn test_per_test_alias_override() {
        let n = LocationNormalizer::new(AliasTable::new().with_alias("Nowhereville", "NW"));
        assert_eq!(n.normalize("nowhereville"), Some(RegionCode::new("NW")));
        assert_eq!(n.normalize("San Francisco"), None);
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("SF/Oakland (Califronia)"), "sf oakland califronia");
        assert_eq!(canonical_key("  La-OC "), "la oc");
    }
}
