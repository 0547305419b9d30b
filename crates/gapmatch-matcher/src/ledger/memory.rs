//! In-memory ledger. Nothing is persisted.

use chrono::{DateTime, Utc};
use gapmatch_core::error::Result;
use gapmatch_core::traits::LedgerStore;
use gapmatch_core::types::MatchKey;

use super::Entries;

#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    entries: Entries,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }
}

impl LedgerStore for MemoryLedger {
    fn load(&mut self) -> Result<()> {
        Ok(())
    }

    fn has(&self, candidate_id: &str, workshop_id: &str) -> bool {
        self.entries.contains(candidate_id, workshop_id)
    }

    fn record(&mut self, candidate_id: &str, workshop_id: &str, at: DateTime<Utc>) -> bool {
        self.entries.insert(MatchKey::new(candidate_id, workshop_id), at)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
