//! Settings inspection and replacement.

use anyhow::Result;
use punch_core::AttendanceSettings;

use crate::service::{AuthClaim, PunchClockService};

/// Prints the active settings (defaults when none are stored).
pub fn show(service: &PunchClockService) -> Result<()> {
    let settings = service.current_settings()?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

/// Replaces the active settings record. Admin-gated.
pub fn set(
    service: &PunchClockService,
    workday_hours: f64,
    overtime_rate: f64,
    auth: AuthClaim,
) -> Result<()> {
    let settings = AttendanceSettings {
        workday_hours,
        overtime_rate,
    };
    service.replace_settings(settings, auth)?;
    println!(
        "settings replaced: workday {workday_hours}h, overtime rate {overtime_rate}"
    );
    Ok(())
}
