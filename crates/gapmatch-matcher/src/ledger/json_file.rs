//! File-based ledger stored as `notified.json`.
//! One JSON object: `"candidateId::workshopId": "RFC3339 timestamp"`.
//! Human-readable, compatible with hand edits, rewritten atomically.

use chrono::{DateTime, Utc};
use gapmatch_core::error::{GapMatchError, Result};
use gapmatch_core::traits::LedgerStore;
use gapmatch_core::types::MatchKey;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::Entries;

pub struct JsonFileLedger {
    path: PathBuf,
    entries: Entries,
    dirty: bool,
}

impl JsonFileLedger {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: Entries::default(),
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(json: &str) -> Result<Entries> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|e| GapMatchError::LedgerCorrupt(format!("parse: {e}")))?;

        let mut entries = Entries::default();
        for (key, at) in raw {
            let key = MatchKey::parse(&key)
                .ok_or_else(|| GapMatchError::LedgerCorrupt(format!("bad key '{key}'")))?;
            let at = DateTime::parse_from_rfc3339(&at)
                .map_err(|e| GapMatchError::LedgerCorrupt(format!("bad timestamp for {key}: {e}")))?
                .with_timezone(&Utc);
            entries.insert(key, at);
        }
        Ok(entries)
    }
}

impl LedgerStore for JsonFileLedger {
    /// A missing file is an empty ledger; anything unreadable is an error.
    fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            tracing::info!("📒 No ledger at {}, starting empty", self.path.display());
            self.entries.clear();
            return Ok(());
        }
        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            GapMatchError::LedgerCorrupt(format!("read {}: {e}", self.path.display()))
        })?;
        self.entries = Self::parse(&json)?;
        self.dirty = false;
        tracing::info!(
            "📒 Loaded {} ledger entries from {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    fn has(&self, candidate_id: &str, workshop_id: &str) -> bool {
        self.entries.contains(candidate_id, workshop_id)
    }

    fn record(&mut self, candidate_id: &str, workshop_id: &str, at: DateTime<Utc>) -> bool {
        let added = self.entries.insert(MatchKey::new(candidate_id, workshop_id), at);
        self.dirty |= added;
        added
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty && self.path.exists() {
            tracing::debug!("📒 Ledger unchanged, skipping write");
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|(k, at)| (k.to_string(), at.to_rfc3339()))
            .collect();
        let json = serde_json::to_string_pretty(&raw)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        tracing::debug!("💾 Saved {} ledger entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gapmatch-ledger-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = temp_dir("missing");
        let mut ledger = JsonFileLedger::new(&dir.join("notified.json"));
        ledger.load().unwrap();
        assert!(ledger.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_and_reload() {
        let dir = temp_dir("roundtrip");
        let path = dir.join("nested").join("notified.json");
        let t = Utc::now();

        let mut ledger = JsonFileLedger::new(&path);
        ledger.load().unwrap();
        assert!(ledger.record("c1", "SF|Rooftop|Robotics|Mon|3-4", t));
        assert!(!ledger.record("c1", "SF|Rooftop|Robotics|Mon|3-4", t));
        ledger.flush().unwrap();

        let mut reloaded = JsonFileLedger::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.has("c1", "SF|Rooftop|Robotics|Mon|3-4"));
        assert!(!path.with_extension("json.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_reads_legacy_notified_json() {
        let dir = temp_dir("legacy");
        let path = dir.join("notified.json");
        std::fs::write(
            &path,
            r#"{"abc::SF|Site|Lesson|Mon|3-4": "2025-11-03T17:00:00.123456+00:00"}"#,
        )
        .unwrap();

        let mut ledger = JsonFileLedger::new(&path);
        ledger.load().unwrap();
        assert!(ledger.has("abc", "SF|Site|Lesson|Mon|3-4"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_ids_containing_separator_survive_reload() {
        let dir = temp_dir("separator");
        let path = dir.join("notified.json");
        let t = Utc::now();

        let mut ledger = JsonFileLedger::new(&path);
        ledger.load().unwrap();
        ledger.record("a::b", "c", t);
        ledger.record("a", "b::c", t);
        ledger.flush().unwrap();

        let mut reloaded = JsonFileLedger::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.has("a::b", "c"));
        assert!(reloaded.has("a", "b::c"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_file_fails_closed() {
        let dir = temp_dir("corrupt");
        let path = dir.join("notified.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut ledger = JsonFileLedger::new(&path);
        let err = ledger.load().unwrap_err();
        assert!(matches!(err, GapMatchError::LedgerCorrupt(_)));
        assert!(err.is_fatal());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_bad_key_fails_closed() {
        let dir = temp_dir("badkey");
        let path = dir.join("notified.json");
        std::fs::write(&path, r#"{"no-separator": "2025-11-03T17:00:00Z"}"#).unwrap();

        let mut ledger = JsonFileLedger::new(&path);
        assert!(matches!(ledger.load(), Err(GapMatchError::LedgerCorrupt(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}
