//! Per-organization attendance settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for attendance settings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidSettings {
    /// The workday length must be a positive number of hours.
    #[error("workday hours must be positive, got {value}")]
    NonPositiveWorkday { value: f64 },

    /// The overtime rate cannot discount overtime below straight time.
    #[error("overtime rate must be at least 1.0, got {value}")]
    OvertimeRateBelowOne { value: f64 },
}

/// Active configuration for hour and overtime computation.
///
/// One record is active at a time; mutation is an explicit whole-record
/// replace, never a partial patch. Summaries are always recomputed from
/// raw events, so a replacement affects only future computations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSettings {
    /// Standard workday length in hours. Time beyond this per calendar
    /// day counts as overtime.
    pub workday_hours: f64,
    /// Multiplier applied to overtime hours for reporting display.
    pub overtime_rate: f64,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            workday_hours: 8.0,
            overtime_rate: 1.5,
        }
    }
}

impl AttendanceSettings {
    /// Checks the numeric bounds on both fields.
    pub fn validate(&self) -> Result<(), InvalidSettings> {
        // NaN fails both comparisons and is rejected alongside the bound.
        if self.workday_hours <= 0.0 || self.workday_hours.is_nan() {
            return Err(InvalidSettings::NonPositiveWorkday {
                value: self.workday_hours,
            });
        }
        if self.overtime_rate < 1.0 || self.overtime_rate.is_nan() {
            return Err(InvalidSettings::OvertimeRateBelowOne {
                value: self.overtime_rate,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        AttendanceSettings::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_workday() {
        let settings = AttendanceSettings {
            workday_hours: 0.0,
            overtime_rate: 1.5,
        };
        assert_eq!(
            settings.validate(),
            Err(InvalidSettings::NonPositiveWorkday { value: 0.0 })
        );
    }

    #[test]
    fn rejects_nan_workday() {
        let settings = AttendanceSettings {
            workday_hours: f64::NAN,
            overtime_rate: 1.5,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_discounting_overtime_rate() {
        let settings = AttendanceSettings {
            workday_hours: 8.0,
            overtime_rate: 0.5,
        };
        assert_eq!(
            settings.validate(),
            Err(InvalidSettings::OvertimeRateBelowOne { value: 0.5 })
        );
    }
}
