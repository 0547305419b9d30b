//! # gapmatch runner
//!
//! Orchestrates one batch pass per invocation:
//! ledger load → sources → normalize → match → dedup → chat / email / sheet → ledger flush.
//!
//! [`bootstrap`] builds the live adapters from config; [`pipeline`] only sees
//! the collaborator traits, so tests drive it with in-memory fakes.

pub mod bootstrap;
pub mod pipeline;
pub mod summary;

pub use pipeline::{RunOptions, Sinks, Sources, run_digest, run_match_notify};
pub use summary::{RunMode, RunSummary};
