//! Punch events recorded by the attendance ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kind::PunchKind;

/// A single check-in or check-out record for a user.
///
/// Events are immutable once appended to the ledger. Identity within a
/// user's history is (timestamp, insertion order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchEvent {
    /// Unique identifier for this event.
    pub id: Uuid,
    /// The user who punched.
    pub user_id: i64,
    /// When the punch occurred.
    pub timestamp: DateTime<Utc>,
    /// Check-in or check-out.
    pub kind: PunchKind,
}

impl PunchEvent {
    /// Creates a new event with a fresh identifier.
    #[must_use]
    pub fn new(user_id: i64, kind: PunchKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            timestamp,
            kind,
        }
    }
}
