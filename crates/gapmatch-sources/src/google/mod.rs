//! Google service-account auth and the Sheets v4 calls gapmatch needs.

pub mod auth;
pub mod sheets;

pub use auth::{SHEETS_SCOPE, ServiceAccountKey};
pub use sheets::{GridCell, Rgb, SheetsClient, TabInfo};
