//! Storage layer for the punch clock.
//!
//! Provides the attendance ledger (ordered append plus range query over
//! punch events) and the settings store, using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Ledger`] type wraps a `rusqlite::Connection`, which is `Send`
//! but not `Sync`. For multi-threaded access wrap it in a `Mutex` and
//! keep the critical section to the single storage call; per-user
//! append serialization is the caller's responsibility (the service
//! holds a lock table keyed by user id).
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond
//! precision (e.g. `2024-01-15T10:30:00.000Z`), so lexicographic
//! ordering matches chronological ordering. Ties between equal
//! timestamps are broken by `rowid`, which is insertion order.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql, params};
use thiserror::Error;
use uuid::Uuid;

use punch_core::{AttendanceSettings, InvalidSettings, PunchEvent, PunchKind};

/// Ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The punch would break the check-in/check-out alternation for
    /// this user.
    #[error("invalid sequence for user {user_id}: {attempted} after {last}")]
    InvalidSequence {
        user_id: i64,
        attempted: PunchKind,
        last: &'static str,
    },

    /// The query range starts after it ends. Treated as a caller error
    /// rather than an empty result; callers depend on the signal.
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Settings failed validation before being written.
    #[error(transparent)]
    Settings(#[from] InvalidSettings),

    /// Failed to parse a stored event timestamp.
    #[error("invalid timestamp for event {event_id}: {timestamp}")]
    TimestampParse {
        event_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Failed to parse a stored event field.
    #[error("invalid stored event {event_id}: {message}")]
    InvalidStoredEvent { event_id: String, message: String },
}

/// Database connection wrapper for punch events and settings.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Opens a ledger at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        let ledger = Self { conn };
        ledger.init()?;
        Ok(ledger)
    }

    /// Opens an in-memory ledger.
    ///
    /// Useful for testing. The data is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self { conn };
        ledger.init()?;
        Ok(ledger)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), LedgerError> {
        self.conn.execute_batch(
            "
            -- Punch events: immutable once appended.
            -- timestamp: RFC 3339 TEXT; rowid breaks timestamp ties in
            -- insertion order.
            CREATE TABLE IF NOT EXISTS punch_events (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('check_in', 'check_out'))
            );

            CREATE INDEX IF NOT EXISTS idx_punch_events_user_ts
                ON punch_events(user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_punch_events_ts
                ON punch_events(timestamp);

            -- Single active settings record, replaced whole.
            CREATE TABLE IF NOT EXISTS attendance_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                workday_hours REAL NOT NULL,
                overtime_rate REAL NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Appends a punch for a user, enforcing the alternation invariant.
    ///
    /// A check-in is rejected while the user's latest event is an
    /// unmatched check-in; a check-out is rejected unless it closes an
    /// unmatched check-in. Validation and insert run in one
    /// transaction, so the event becomes visible atomically.
    pub fn append(
        &mut self,
        user_id: i64,
        kind: PunchKind,
        timestamp: DateTime<Utc>,
    ) -> Result<PunchEvent, LedgerError> {
        let tx = self.conn.transaction()?;

        let last_kind: Option<String> = tx
            .query_row(
                "
                SELECT kind FROM punch_events
                WHERE user_id = ?
                ORDER BY timestamp DESC, rowid DESC
                LIMIT 1
                ",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        let open_shift = last_kind.as_deref() == Some(PunchKind::CheckIn.as_str());
        match kind {
            PunchKind::CheckIn if open_shift => {
                return Err(LedgerError::InvalidSequence {
                    user_id,
                    attempted: kind,
                    last: "an unmatched check-in",
                });
            }
            PunchKind::CheckOut if !open_shift => {
                return Err(LedgerError::InvalidSequence {
                    user_id,
                    attempted: kind,
                    last: "no unmatched check-in",
                });
            }
            _ => {}
        }

        let event = PunchEvent::new(user_id, kind, timestamp);
        tx.execute(
            "INSERT INTO punch_events (id, user_id, timestamp, kind) VALUES (?, ?, ?, ?)",
            params![
                event.id.to_string(),
                event.user_id,
                format_timestamp(event.timestamp),
                event.kind.as_str(),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(
            user_id,
            kind = %event.kind,
            event_id = %event.id,
            "punch appended"
        );
        Ok(event)
    }

    /// Queries one user's events, ordered by timestamp ascending with
    /// ties broken by insertion order.
    ///
    /// Bounds are inclusive when present and unbounded when absent.
    pub fn query(
        &self,
        user_id: i64,
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
    ) -> Result<Vec<PunchEvent>, LedgerError> {
        self.query_all(Some(user_id), range_start, range_end)
    }

    /// Administrative query across all users, with optional user
    /// scoping. Same range semantics as [`Ledger::query`].
    pub fn query_all(
        &self,
        user_filter: Option<i64>,
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
    ) -> Result<Vec<PunchEvent>, LedgerError> {
        if let (Some(start), Some(end)) = (range_start, range_end) {
            if start > end {
                return Err(LedgerError::InvalidRange { start, end });
            }
        }

        let mut sql =
            String::from("SELECT id, user_id, timestamp, kind FROM punch_events WHERE 1=1");
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(user_id) = user_filter {
            sql.push_str(" AND user_id = ?");
            args.push(Box::new(user_id));
        }
        if let Some(start) = range_start {
            sql.push_str(" AND timestamp >= ?");
            args.push(Box::new(format_timestamp(start)));
        }
        if let Some(end) = range_end {
            sql.push_str(" AND timestamp <= ?");
            args.push(Box::new(format_timestamp(end)));
        }
        sql.push_str(" ORDER BY timestamp ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|arg| arg.as_ref())),
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )?;

        let mut events = Vec::new();
        for row in rows {
            events.push(parse_event_row(row?)?);
        }
        Ok(events)
    }

    // ========== Settings store ==========

    /// Replaces the active settings record.
    ///
    /// Whole-record replace; validation runs before any write. The
    /// replacement affects only future computations because summaries
    /// are always recomputed from raw events.
    pub fn replace_settings(
        &mut self,
        settings: AttendanceSettings,
    ) -> Result<(), LedgerError> {
        settings.validate()?;
        self.conn.execute(
            "
            INSERT INTO attendance_settings (id, workday_hours, overtime_rate, updated_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                workday_hours = excluded.workday_hours,
                overtime_rate = excluded.overtime_rate,
                updated_at = excluded.updated_at
            ",
            params![
                settings.workday_hours,
                settings.overtime_rate,
                format_timestamp(Utc::now()),
            ],
        )?;
        tracing::info!(
            workday_hours = settings.workday_hours,
            overtime_rate = settings.overtime_rate,
            "settings replaced"
        );
        Ok(())
    }

    /// Returns the active settings, if any have been stored.
    pub fn current_settings(&self) -> Result<Option<AttendanceSettings>, LedgerError> {
        let settings = self
            .conn
            .query_row(
                "SELECT workday_hours, overtime_rate FROM attendance_settings WHERE id = 1",
                [],
                |row| {
                    Ok(AttendanceSettings {
                        workday_hours: row.get(0)?,
                        overtime_rate: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    /// Returns the active settings or the defaults when none are stored.
    pub fn effective_settings(&self) -> Result<AttendanceSettings, LedgerError> {
        Ok(self.current_settings()?.unwrap_or_default())
    }
}

/// Formats a timestamp for storage so lexicographic order matches
/// chronological order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_event_row(
    (id, user_id, timestamp, kind): (String, i64, String, String),
) -> Result<PunchEvent, LedgerError> {
    let parsed_ts = DateTime::parse_from_rfc3339(&timestamp)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|source| LedgerError::TimestampParse {
            event_id: id.clone(),
            timestamp: timestamp.clone(),
            source,
        })?;
    let parsed_id = Uuid::parse_str(&id).map_err(|err| LedgerError::InvalidStoredEvent {
        event_id: id.clone(),
        message: format!("bad event id: {err}"),
    })?;
    let parsed_kind = kind
        .parse::<PunchKind>()
        .map_err(|err| LedgerError::InvalidStoredEvent {
            event_id: id,
            message: err.to_string(),
        })?;
    Ok(PunchEvent {
        id: parsed_id,
        user_id,
        timestamp: parsed_ts,
        kind: parsed_kind,
    })
}
