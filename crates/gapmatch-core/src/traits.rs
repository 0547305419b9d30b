//! Collaborator seams. Production adapters live in `gapmatch-sources` and
//! `gapmatch-channels`; tests swap in in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Candidate, WorkshopGap};

/// Reads pipeline candidates at the matchable stages.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &str;
    /// Candidates with their location already normalized (region may be `None`).
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>>;
}

/// Reads workshop rows that need a leader.
#[async_trait]
pub trait GapSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_gaps(&self) -> Result<Vec<WorkshopGap>>;
}

#[async_trait]
pub trait ChatSink: Send + Sync {
    fn name(&self) -> &str;
    async fn post(&self, text: &str) -> Result<()>;
}

#[async_trait]
pub trait EmailSink: Send + Sync {
    fn name(&self) -> &str;
    async fn send_html(&self, subject: &str, html: &str) -> Result<()>;
}

/// Overwrites a whole destination tab.
#[async_trait]
pub trait SheetSink: Send + Sync {
    fn name(&self) -> &str;
    async fn overwrite(&self, rows: &[Vec<String>]) -> Result<()>;
}

/// Durable "already notified" set keyed by (candidate, workshop).
///
/// Loaded in full before anything is sent, flushed in full at the end of a
/// live run. `record` of a known pair is a no-op.
pub trait LedgerStore: Send {
    fn load(&mut self) -> Result<()>;
    fn has(&self, candidate_id: &str, workshop_id: &str) -> bool;
    /// Returns `true` when the pair was not known before.
    fn record(&mut self, candidate_id: &str, workshop_id: &str, at: DateTime<Utc>) -> bool;
    fn flush(&mut self) -> Result<()>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
