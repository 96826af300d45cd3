//! Tabular report rendering.
//!
//! Renders one row per user per calendar day with worked and overtime
//! columns. Column order, header names, and row ordering are fixed so
//! exports are byte-stable for a given ledger state.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::event::PunchEvent;
use crate::settings::AttendanceSettings;
use crate::summary::{self, SummaryError};

/// Content type for rendered reports.
pub const REPORT_CONTENT_TYPE: &str = "text/csv";

/// Report generation errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The requested range starts after it ends. Callers depend on the
    /// error signal, so an inverted range is never treated as empty.
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Hour computation failed.
    #[error(transparent)]
    Summary(#[from] SummaryError),

    /// CSV serialization failed.
    #[error("failed to render report: {0}")]
    Render(#[from] csv::Error),
}

/// Fixed export filename for a report over the given range.
#[must_use]
pub fn report_file_name(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "attendance_{}_{}.csv",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

/// Renders the attendance report for events in `[start, end]`.
///
/// Events must be ordered by timestamp ascending, as returned by the
/// ledger. The overtime column carries the rate-weighted display
/// figure; raw overtime hours stay available through the summary path.
pub fn generate(
    events: &[PunchEvent],
    settings: &AttendanceSettings,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<u8>, ReportError> {
    if start > end {
        return Err(ReportError::InvalidRange { start, end });
    }

    let rows = summary::daily_breakdown(events, settings)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["user_id", "date", "worked_hours", "overtime_hours"])?;
    for row in rows {
        writer.write_record([
            row.user_id.to_string(),
            row.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", row.worked_hours),
            format!("{:.2}", row.overtime_hours * settings.overtime_rate),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| ReportError::Render(err.into_error().into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::PunchKind;
    use chrono::TimeZone;
    use insta::assert_snapshot;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn fixture_events() -> Vec<PunchEvent> {
        let mut events = vec![
            PunchEvent::new(1, PunchKind::CheckIn, at(10, 9)),
            PunchEvent::new(1, PunchKind::CheckOut, at(10, 19)),
            PunchEvent::new(2, PunchKind::CheckIn, at(10, 10)),
            PunchEvent::new(2, PunchKind::CheckOut, at(10, 14)),
            PunchEvent::new(1, PunchKind::CheckIn, at(11, 9)),
            PunchEvent::new(1, PunchKind::CheckOut, at(11, 17)),
        ];
        events.sort_by_key(|e| e.timestamp);
        events
    }

    #[test]
    fn report_rows_are_stable_by_user_then_date() {
        let content = generate(
            &fixture_events(),
            &AttendanceSettings::default(),
            at(10, 0),
            at(12, 0),
        )
        .unwrap();

        let rendered = String::from_utf8(content).unwrap();
        assert_snapshot!(rendered, @r"
        user_id,date,worked_hours,overtime_hours
        1,2025-03-10,10.00,3.00
        1,2025-03-11,8.00,0.00
        2,2025-03-10,4.00,0.00
        ");
    }

    #[test]
    fn inverted_range_is_rejected_even_with_data() {
        let result = generate(
            &fixture_events(),
            &AttendanceSettings::default(),
            at(12, 0),
            at(10, 0),
        );

        assert!(matches!(result, Err(ReportError::InvalidRange { .. })));
    }

    #[test]
    fn empty_ledger_renders_header_only() {
        let content =
            generate(&[], &AttendanceSettings::default(), at(10, 0), at(12, 0)).unwrap();
        let rendered = String::from_utf8(content).unwrap();

        assert_eq!(rendered, "user_id,date,worked_hours,overtime_hours\n");
    }

    #[test]
    fn file_name_follows_fixed_convention() {
        let name = report_file_name(at(10, 0), at(12, 0));
        assert_eq!(name, "attendance_2025-03-10_2025-03-12.csv");
    }
}
