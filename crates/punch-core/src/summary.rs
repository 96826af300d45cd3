//! Worked-hour and overtime computation.
//!
//! Summaries are derived values: they are recomputed from raw punch
//! events plus the current settings on every query and never stored.
//! Replacing the settings therefore needs no cache invalidation.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::event::PunchEvent;
use crate::kind::PunchKind;
use crate::settings::AttendanceSettings;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Errors from hour computation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SummaryError {
    /// A check-out preceding its check-in. Unreachable through the
    /// ledger's alternation invariant; defended against for callers
    /// that construct event sequences by hand.
    #[error("negative duration for user {user_id}: check-out {check_out} precedes check-in {check_in}")]
    NegativeDuration {
        user_id: i64,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    },
}

/// Derived totals for one user over a query range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendancePeriodSummary {
    pub user_id: i64,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    /// Total worked hours across all complete pairs in the range.
    pub worked_hours: f64,
    /// Hours beyond the standard workday, summed per calendar day.
    /// Raw hours; the overtime rate applies only at report rendering.
    pub overtime_hours: f64,
    /// Check-ins with no matching check-out within the range.
    pub incomplete_pairs: usize,
}

/// Worked and overtime hours for one user on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub user_id: i64,
    pub date: NaiveDate,
    pub worked_hours: f64,
    pub overtime_hours: f64,
}

/// A matched (check-in, check-out) pair.
#[derive(Debug, Clone, Copy)]
struct Shift {
    user_id: i64,
    check_in: DateTime<Utc>,
    duration_ms: i64,
}

/// Pairs consecutive check-ins and check-outs per user.
///
/// Events must be sorted by timestamp ascending. Returns the complete
/// shifts and the number of incomplete observations (trailing
/// unmatched check-ins). A leading unmatched check-out, which occurs
/// when a range filter truncates a pair, is skipped and does not count.
fn pair_shifts(events: &[PunchEvent]) -> Result<(Vec<Shift>, usize), SummaryError> {
    let mut pending: BTreeMap<i64, &PunchEvent> = BTreeMap::new();
    let mut shifts = Vec::new();
    let mut incomplete = 0usize;

    for event in events {
        match event.kind {
            PunchKind::CheckIn => {
                if let Some(open) = pending.insert(event.user_id, event) {
                    // Only reachable when the ledger is bypassed: the
                    // superseded check-in is an incomplete observation.
                    tracing::debug!(
                        user_id = open.user_id,
                        timestamp = %open.timestamp,
                        "unmatched check-in superseded by a later check-in"
                    );
                    incomplete += 1;
                }
            }
            PunchKind::CheckOut => {
                let Some(open) = pending.remove(&event.user_id) else {
                    tracing::debug!(
                        user_id = event.user_id,
                        timestamp = %event.timestamp,
                        "skipping check-out with no in-range check-in"
                    );
                    continue;
                };
                let duration_ms = (event.timestamp - open.timestamp).num_milliseconds();
                if duration_ms < 0 {
                    return Err(SummaryError::NegativeDuration {
                        user_id: event.user_id,
                        check_in: open.timestamp,
                        check_out: event.timestamp,
                    });
                }
                shifts.push(Shift {
                    user_id: event.user_id,
                    check_in: open.timestamp,
                    duration_ms,
                });
            }
        }
    }

    incomplete += pending.len();
    Ok((shifts, incomplete))
}

/// Computes the period summary for a single user's ordered events.
///
/// Overtime is assessed per calendar day (UTC date of the check-in):
/// worked time beyond `settings.workday_hours` in one day is overtime.
/// A shift crossing midnight is attributed wholly to its check-in date.
pub fn summarize(
    user_id: i64,
    events: &[PunchEvent],
    settings: &AttendanceSettings,
    range_start: Option<DateTime<Utc>>,
    range_end: Option<DateTime<Utc>>,
) -> Result<AttendancePeriodSummary, SummaryError> {
    let (shifts, incomplete_pairs) = pair_shifts(events)?;

    let mut worked_hours = 0.0;
    let mut overtime_hours = 0.0;
    for (_, day_worked, day_overtime) in worked_by_day(&shifts, settings) {
        worked_hours += day_worked;
        overtime_hours += day_overtime;
    }

    Ok(AttendancePeriodSummary {
        user_id,
        range_start,
        range_end,
        worked_hours,
        overtime_hours,
        incomplete_pairs,
    })
}

/// Computes one row per user per calendar day for report output.
///
/// Accepts events for any number of users; pairing happens per user.
/// Rows are ordered by (user id, date).
pub fn daily_breakdown(
    events: &[PunchEvent],
    settings: &AttendanceSettings,
) -> Result<Vec<DaySummary>, SummaryError> {
    let (shifts, _incomplete) = pair_shifts(events)?;

    let mut rows = Vec::new();
    for ((user_id, date), day_worked, day_overtime) in worked_by_day(&shifts, settings) {
        rows.push(DaySummary {
            user_id,
            date,
            worked_hours: day_worked,
            overtime_hours: day_overtime,
        });
    }
    Ok(rows)
}

/// Buckets shift durations by (user id, check-in date) and splits each
/// day's total into worked and overtime hours.
fn worked_by_day(
    shifts: &[Shift],
    settings: &AttendanceSettings,
) -> Vec<((i64, NaiveDate), f64, f64)> {
    let mut per_day: BTreeMap<(i64, NaiveDate), i64> = BTreeMap::new();
    for shift in shifts {
        *per_day
            .entry((shift.user_id, shift.check_in.date_naive()))
            .or_insert(0) += shift.duration_ms;
    }

    per_day
        .into_iter()
        .map(|(key, total_ms)| {
            #[allow(clippy::cast_precision_loss)]
            let worked = total_ms as f64 / MS_PER_HOUR;
            let overtime = (worked - settings.workday_hours).max(0.0);
            (key, worked, overtime)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
    }

    fn punch(user_id: i64, kind: PunchKind, timestamp: DateTime<Utc>) -> PunchEvent {
        PunchEvent::new(user_id, kind, timestamp)
    }

    #[test]
    fn standard_day_has_no_overtime() {
        let events = vec![
            punch(1, PunchKind::CheckIn, at(9, 0)),
            punch(1, PunchKind::CheckOut, at(17, 0)),
        ];
        let summary =
            summarize(1, &events, &AttendanceSettings::default(), None, None).unwrap();

        assert_eq!(summary.worked_hours, 8.0);
        assert_eq!(summary.overtime_hours, 0.0);
        assert_eq!(summary.incomplete_pairs, 0);
    }

    #[test]
    fn hours_beyond_workday_are_overtime() {
        let events = vec![
            punch(1, PunchKind::CheckIn, at(8, 0)),
            punch(1, PunchKind::CheckOut, at(18, 0)),
        ];
        let summary =
            summarize(1, &events, &AttendanceSettings::default(), None, None).unwrap();

        assert_eq!(summary.worked_hours, 10.0);
        assert_eq!(summary.overtime_hours, 2.0);
    }

    #[test]
    fn trailing_check_in_is_incomplete_not_worked() {
        let events = vec![punch(1, PunchKind::CheckIn, at(9, 0))];
        let summary =
            summarize(1, &events, &AttendanceSettings::default(), None, None).unwrap();

        assert_eq!(summary.worked_hours, 0.0);
        assert_eq!(summary.incomplete_pairs, 1);
    }

    #[test]
    fn leading_check_out_is_skipped() {
        // Range filter cut off the matching check-in.
        let events = vec![
            punch(1, PunchKind::CheckOut, at(1, 0)),
            punch(1, PunchKind::CheckIn, at(9, 0)),
            punch(1, PunchKind::CheckOut, at(13, 0)),
        ];
        let summary =
            summarize(1, &events, &AttendanceSettings::default(), None, None).unwrap();

        assert_eq!(summary.worked_hours, 4.0);
        assert_eq!(summary.incomplete_pairs, 0);
    }

    #[test]
    fn negative_duration_is_an_error_not_clamped() {
        // Hand-built sequence bypassing the ledger.
        let events = vec![
            punch(1, PunchKind::CheckIn, at(17, 0)),
            punch(1, PunchKind::CheckOut, at(9, 0)),
        ];
        let result = summarize(1, &events, &AttendanceSettings::default(), None, None);

        assert!(matches!(
            result,
            Err(SummaryError::NegativeDuration { user_id: 1, .. })
        ));
    }

    #[test]
    fn overtime_is_assessed_per_calendar_day() {
        let day2 = |h, m| Utc.with_ymd_and_hms(2025, 3, 11, h, m, 0).unwrap();
        let events = vec![
            punch(1, PunchKind::CheckIn, at(9, 0)),
            punch(1, PunchKind::CheckOut, at(19, 0)), // 10h -> 2h overtime
            punch(1, PunchKind::CheckIn, day2(9, 0)),
            punch(1, PunchKind::CheckOut, day2(15, 0)), // 6h -> none
        ];
        let summary =
            summarize(1, &events, &AttendanceSettings::default(), None, None).unwrap();

        assert_eq!(summary.worked_hours, 16.0);
        assert_eq!(summary.overtime_hours, 2.0);
    }

    #[test]
    fn split_shifts_accumulate_within_a_day() {
        let events = vec![
            punch(1, PunchKind::CheckIn, at(8, 0)),
            punch(1, PunchKind::CheckOut, at(13, 0)),
            punch(1, PunchKind::CheckIn, at(14, 0)),
            punch(1, PunchKind::CheckOut, at(19, 0)),
        ];
        let summary =
            summarize(1, &events, &AttendanceSettings::default(), None, None).unwrap();

        assert_eq!(summary.worked_hours, 10.0);
        assert_eq!(summary.overtime_hours, 2.0);
    }

    #[test]
    fn daily_breakdown_orders_by_user_then_date() {
        let events = vec![
            punch(2, PunchKind::CheckIn, at(10, 0)),
            punch(2, PunchKind::CheckOut, at(12, 0)),
            punch(1, PunchKind::CheckIn, at(9, 0)),
            punch(1, PunchKind::CheckOut, at(17, 0)),
        ];
        let mut sorted = events;
        sorted.sort_by_key(|e| e.timestamp);

        let rows = daily_breakdown(&sorted, &AttendanceSettings::default()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, 1);
        assert_eq!(rows[0].worked_hours, 8.0);
        assert_eq!(rows[1].user_id, 2);
        assert_eq!(rows[1].worked_hours, 2.0);
    }

    #[test]
    fn zero_length_pair_counts_zero_hours() {
        let events = vec![
            punch(1, PunchKind::CheckIn, at(9, 0)),
            punch(1, PunchKind::CheckOut, at(9, 0)),
        ];
        let summary =
            summarize(1, &events, &AttendanceSettings::default(), None, None).unwrap();

        assert_eq!(summary.worked_hours, 0.0);
        assert_eq!(summary.incomplete_pairs, 0);
    }
}
