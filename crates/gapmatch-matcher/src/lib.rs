//! # gapmatch matcher
//!
//! The pure core of a run:
//!
//! ```text
//! raw location ──► LocationNormalizer ──► RegionCode
//! candidates + gaps ──► GapMatcher ──► Vec<Match> (ordered)
//! Vec<Match> ──► ledger::filter_new ──► matches never notified before
//! ```

pub mod ledger;
pub mod matcher;
pub mod normalize;

pub use ledger::{JsonFileLedger, MemoryLedger, SqliteLedger, filter_new};
pub use matcher::{GapMatcher, map_link};
pub use normalize::{AliasTable, LocationNormalizer, Resolution};
