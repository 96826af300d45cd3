//! History command: a user's punch events as JSON lines.

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

    let events = service.history(user_id, start, end)?;
    for event in events {
        let json = serde_json::to_string(&event)?;
        println!("{json}");
    }

    Ok(())
}
