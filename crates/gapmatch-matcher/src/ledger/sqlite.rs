//! SQLite-backed ledger. Same semantics as the JSON file, one row per pair.

use chrono::{DateTime, Utc};
use gapmatch_core::error::{GapMatchError, Result};
use gapmatch_core::traits::LedgerStore;
use gapmatch_core::types::MatchKey;
use std::path::Path;

use super::Entries;

pub struct SqliteLedger {
    conn: rusqlite::Connection,
    entries: Entries,
    pending: Vec<(MatchKey, DateTime<Utc>)>,
}

impl SqliteLedger {
    /// Open or create the ledger database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| GapMatchError::LedgerCorrupt(format!("DB open: {e}")))?;
        let ledger = Self::with_connection(conn);
        ledger.migrate()?;
        Ok(ledger)
    }

    /// Open without creating or altering anything on disk, for dry runs.
    /// A missing database reads as an empty ledger.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("📒 No ledger at {}, starting empty", path.display());
            let conn = rusqlite::Connection::open_in_memory()
                .map_err(|e| GapMatchError::LedgerCorrupt(format!("DB open: {e}")))?;
            let ledger = Self::with_connection(conn);
            ledger.migrate()?;
            return Ok(ledger);
        }
        let conn =
            rusqlite::Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
                .map_err(|e| GapMatchError::LedgerCorrupt(format!("DB open: {e}")))?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn,
            entries: Entries::default(),
            pending: Vec::new(),
        }
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS notified (
                candidate_id TEXT NOT NULL,
                workshop_id TEXT NOT NULL,
                notified_at TEXT NOT NULL,
                PRIMARY KEY (candidate_id, workshop_id)
            );
         ",
            )
            .map_err(|e| GapMatchError::LedgerCorrupt(format!("Migration: {e}")))
    }
}

impl LedgerStore for SqliteLedger {
    fn load(&mut self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT candidate_id, workshop_id, notified_at FROM notified")
            .map_err(|e| GapMatchError::LedgerCorrupt(format!("Prepare: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| GapMatchError::LedgerCorrupt(format!("Query: {e}")))?;

        let mut entries = Entries::default();
        for row in rows {
            let (candidate_id, workshop_id, at) =
                row.map_err(|e| GapMatchError::LedgerCorrupt(format!("Row: {e}")))?;
            let at = DateTime::parse_from_rfc3339(&at)
                .map_err(|e| GapMatchError::LedgerCorrupt(format!("Timestamp '{at}': {e}")))?
                .with_timezone(&Utc);
            entries.insert(MatchKey::new(&candidate_id, &workshop_id), at);
        }

        tracing::info!("📒 Loaded {} ledger entries from SQLite", entries.len());
        self.entries = entries;
        self.pending.clear();
        Ok(())
    }

    fn has(&self, candidate_id: &str, workshop_id: &str) -> bool {
        self.entries.contains(candidate_id, workshop_id)
    }

    fn record(&mut self, candidate_id: &str, workshop_id: &str, at: DateTime<Utc>) -> bool {
        let key = MatchKey::new(candidate_id, workshop_id);
        let added = self.entries.insert(key.clone(), at);
        if added {
            self.pending.push((key, at));
        }
        added
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let tx = self
            .conn
            .transaction()
            .map_err(|e| GapMatchError::LedgerCorrupt(format!("Begin: {e}")))?;
        for (key, at) in &self.pending {
            tx.execute(
                "INSERT OR IGNORE INTO notified (candidate_id, workshop_id, notified_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![key.candidate_id, key.workshop_id, at.to_rfc3339()],
            )
            .map_err(|e| GapMatchError::LedgerCorrupt(format!("Insert: {e}")))?;
        }
        tx.commit()
            .map_err(|e| GapMatchError::LedgerCorrupt(format!("Commit: {e}")))?;
        tracing::debug!("💾 Wrote {} new ledger row(s)", self.pending.len());
        self.pending.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_migrate() {
        let dir = std::env::temp_dir().join("gapmatch-ledger-db-test");
        std::fs::create_dir_all(&dir).ok();
        let mut ledger = SqliteLedger::open(&dir.join("test.db")).unwrap();
        ledger.load().unwrap();
        assert!(ledger.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_record_flush_reload() {
        let dir = std::env::temp_dir().join("gapmatch-ledger-db-test2");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("test2.db");
        let t = Utc::now();

        let mut ledger = SqliteLedger::open(&path).unwrap();
        ledger.load().unwrap();
        assert!(ledger.record("c1", "w1", t));
        assert!(!ledger.record("c1", "w1", t));
        assert!(ledger.record("c2", "w1", t));
        ledger.flush().unwrap();
        drop(ledger);

        let mut reopened = SqliteLedger::open(&path).unwrap();
        reopened.load().unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.has("c1", "w1"));
        assert!(reopened.has("c2", "w1"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_read_only_open_touches_nothing() {
        let dir = std::env::temp_dir().join(format!("gapmatch-ledger-db-ro-{}", std::process::id()));
        let path = dir.join("nested").join("notified.db");

        let mut ledger = SqliteLedger::open_read_only(&path).unwrap();
        ledger.load().unwrap();
        assert!(ledger.is_empty());
        assert!(!dir.exists());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut writer = SqliteLedger::open(&path).unwrap();
        writer.load().unwrap();
        writer.record("c1", "w1", Utc::now());
        writer.flush().unwrap();
        drop(writer);

        let mut reader = SqliteLedger::open_read_only(&path).unwrap();
        reader.load().unwrap();
        assert!(reader.has("c1", "w1"));
        reader.record("c2", "w1", Utc::now());
        assert!(reader.flush().is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_garbage_file_fails_closed() {
        let dir = std::env::temp_dir().join("gapmatch-ledger-db-test3");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("garbage.db");
        std::fs::write(&path, b"this is definitely not a sqlite database file at all").unwrap();

        let result = SqliteLedger::open(&path).and_then(|mut l| l.load());
        assert!(matches!(result, Err(GapMatchError::LedgerCorrupt(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}
