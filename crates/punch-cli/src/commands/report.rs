//! Administrative report export.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::commands::util::parse_required_timestamp;
use crate::service::{AuthClaim, PunchClockService};

/// Generates the CSV report and writes it to disk.
///
/// Without `--out` the file lands in the working directory under the
/// fixed report filename.
pub fn run(
    service: &PunchClockService,
    start: &str,
    end: &str,
    out: Option<PathBuf>,
    auth: AuthClaim,
) -> Result<()> {
    let start = parse_required_timestamp(start, "start")?;
    let end = parse_required_timestamp(end, "end")?;

    let report = service.admin_report(start, end, auth)?;
    let path = out.unwrap_or_else(|| PathBuf::from(&report.file_name));
    fs::write(&path, &report.content)
        .with_context(|| format!("failed to write report to {}", path.display()))?;

    println!("report written to {}", path.display());
    Ok(())
}
