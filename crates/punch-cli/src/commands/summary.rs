//! Summary command: worked and overtime hours for one user.

use anyhow::Result;

use crate::commands::util::parse_timestamp;
use crate::service::PunchClockService;

pub fn run(
    service: &PunchClockService,
    user_id: i64,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<()> {
    let start = parse_timestamp(start, "start")?;
    let end = parse_timestamp(end, "end")?;

    let summary = service.period_summary(user_id, start, end)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
