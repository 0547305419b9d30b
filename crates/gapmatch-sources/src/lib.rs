//! External data sources for gapmatch.
//!
//! - [`NotionCandidateSource`]: hiring pipeline candidates from a Notion database
//! - [`SheetGapSource`]: workshop rows with open leader slots from Google Sheets

pub mod gaps;
pub mod google;
pub mod notion;

pub use gaps::{SheetGapSource, parse_gap_grid, parse_sheet_date};
pub use google::SheetsClient;
pub use notion::{NotionCandidateSource, parse_candidate_page};
