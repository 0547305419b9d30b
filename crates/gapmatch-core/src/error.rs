//! Error taxonomy for a gapmatch run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GapMatchError {
    /// Missing or invalid credential / identifier. Raised before any I/O.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Candidate or gap source unreachable or returned malformed data.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A location with no canonical region. The entity is skipped.
    #[error("No region for {0}")]
    NormalizationMiss(String),

    /// The dedup ledger could not be read or parsed.
    #[error("Ledger corrupt: {0}")]
    LedgerCorrupt(String),

    /// One notification sink failed.
    #[error("Sink '{sink}' failed: {reason}")]
    Sink { sink: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GapMatchError {
    pub fn sink(sink: &str, reason: impl std::fmt::Display) -> Self {
        Self::Sink {
            sink: sink.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Fatal errors abort the run; the rest are collected into the run summary.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NormalizationMiss(_) | Self::Sink { .. })
    }
}

pub type Result<T> = std::result::Result<T, GapMatchError>;
