//! Core attendance domain logic for the punch clock.
//!
//! This crate contains the fundamental types and logic for:
//! - Punch events: validated check-in/check-out records
//! - Hour computation: worked and overtime totals from event pairs
//! - Report rendering: the tabular CSV export

pub mod event;
pub mod kind;
pub mod report;
pub mod settings;
mod summary;

pub use event::PunchEvent;
pub use kind::{PunchKind, UnknownPunchKind};
pub use report::{REPORT_CONTENT_TYPE, ReportError, generate, report_file_name};
pub use settings::{AttendanceSettings, InvalidSettings};
pub use summary::{
    AttendancePeriodSummary, DaySummary, SummaryError, daily_breakdown, summarize,
};
