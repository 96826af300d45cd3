//! Check-in and check-out registration.

use anyhow::Result;
use punch_core::PunchKind;

use crate::service::PunchClockService;

/// Registers a punch and confirms it on stdout.
///
/// The service answers as soon as the ledger accepts the event;
/// publication to the bus proceeds in the background.
pub async fn run(service: &PunchClockService, user_id: i64, kind: PunchKind) -> Result<()> {
    let event = service.register_punch(user_id, kind).await?;
    println!(
        "{} recorded for user {} at {}",
        event.kind, event.user_id, event.timestamp
    );
    Ok(())
}
