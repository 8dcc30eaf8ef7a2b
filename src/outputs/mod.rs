//! Files written by the tool.
//!
//! - [`markdown`]: the assembled report (`output/complete_report.md`)
//! - [`plot`]: an HTML flowchart of the pipeline stages (`report_creator_flow.html`)

pub mod markdown;
pub mod plot;
