//! Dedup ledger: the only state that survives between runs.
//!
//! Three [`LedgerStore`] backends share one in-memory [`Entries`] set:
//! - [`MemoryLedger`]: plain set, used by tests and dry runs
//! - [`JsonFileLedger`]: flat JSON object, rewritten atomically on flush
//! - [`SqliteLedger`]: one row per pair, `INSERT OR IGNORE` on flush

mod json_file;
mod memory;
mod sqlite;

pub use json_file::JsonFileLedger;
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

use chrono::{DateTime, Utc};
use gapmatch_core::traits::LedgerStore;
use gapmatch_core::types::{LedgerEntry, Match, MatchKey};
use std::collections::BTreeMap;

/// Pair → first notification time.
#[derive(Debug, Clone, Default)]
pub struct Entries {
    map: BTreeMap<MatchKey, DateTime<Utc>>,
}

impl Entries {
    pub fn contains(&self, candidate_id: &str, workshop_id: &str) -> bool {
        self.map.contains_key(&MatchKey::new(candidate_id, workshop_id))
    }

    /// First timestamp wins; returns `true` for a new pair.
    pub fn insert(&mut self, key: MatchKey, at: DateTime<Utc>) -> bool {
        if self.map.contains_key(&key) {
            return false;
        }
        self.map.insert(key, at);
        true
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MatchKey, &DateTime<Utc>)> {
        self.map.iter()
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.map
            .iter()
            .map(|(k, at)| LedgerEntry {
                candidate_id: k.candidate_id.clone(),
                workshop_id: k.workshop_id.clone(),
                notified_at: *at,
            })
            .collect()
    }
}

/// Matches whose identity is not yet in the ledger, order preserved.
pub fn filter_new(matches: &[Match], ledger: &dyn LedgerStore) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| !ledger.has(&m.candidate.id, &m.gap.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapmatch_core::types::{Candidate, PipelineStage, RegionCode, SlotStatus, WorkshopGap};

    fn m(c: &str, w: &str) -> Match {
        Match {
            candidate: Candidate {
                id: c.into(),
                name: c.to_uppercase(),
                email: None,
                stage: PipelineStage::TeachingDemo,
                location: "SF".into(),
                regions: vec![RegionCode::new("SF")],
                school: None,
            },
            gap: WorkshopGap {
                id: w.into(),
                name: "Robotics".into(),
                site: "Rooftop".into(),
                day: "Tuesday".into(),
                time: "3-4".into(),
                date: None,
                start_date: String::new(),
                end_date: String::new(),
                location: "SF".into(),
                region: Some(RegionCode::new("SF")),
                status: SlotStatus::Empty,
                tentative_names: Vec::new(),
                school: None,
            },
            region: RegionCode::new("SF"),
            map_link: String::new(),
        }
    }

    #[test]
    fn test_entries_first_timestamp_wins() {
        let mut entries = Entries::default();
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::hours(1);
        assert!(entries.insert(MatchKey::new("c1", "w1"), t1));
        assert!(!entries.insert(MatchKey::new("c1", "w1"), t2));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.entries()[0].notified_at, t1);
    }

    #[test]
    fn test_filter_new_drops_known_pairs() {
        let mut ledger = MemoryLedger::new();
        ledger.record("c1", "w1", Utc::now());

        let matches = vec![m("c1", "w1"), m("c1", "w2"), m("c2", "w1")];
        let fresh = filter_new(&matches, &ledger);
        let ids: Vec<_> = fresh.iter().map(|m| m.key().to_string()).collect();
        assert_eq!(ids, vec!["c1::w2", "c2::w1"]);
    }
}
