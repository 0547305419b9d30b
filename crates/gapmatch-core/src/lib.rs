//! # gapmatch core
//!
//! Shared vocabulary for the gap matcher: domain types, collaborator traits,
//! the error taxonomy and the configuration file.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::GapMatchConfig;
pub use error::{GapMatchError, Result};
pub use traits::{CandidateSource, ChatSink, EmailSink, GapSource, LedgerStore, SheetSink};
pub use types::{
    Candidate, LedgerEntry, Match, MatchKey, PipelineStage, RegionCode, SchoolContext, SlotStatus,
    WorkshopGap,
};
