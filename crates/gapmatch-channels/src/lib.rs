//! Notification sinks for gap matches.

pub mod checklist;
pub mod digest;
pub mod email;
pub mod sheet;
pub mod slack;

pub use checklist::season_label;
pub use digest::render_digest_html;
pub use email::{SmtpEmailSink, digest_subject};
pub use sheet::{GoogleSheetSink, match_rows};
pub use slack::{SlackChatSink, format_match_message, group_by_candidate};
