//! Punch clock orchestration.
//!
//! [`PunchClockService`] is the only component with side effects beyond
//! the ledger: it resolves timestamps, serializes appends per user, and
//! hands accepted events to the publisher without awaiting delivery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use punch_bus::{DomainEvent, Publisher};
use punch_core::{
    AttendancePeriodSummary, AttendanceSettings, PunchEvent, PunchKind, ReportError,
    SummaryError, report, summarize,
};
use punch_ledger::{Ledger, LedgerError};

/// Authorization claim supplied by the external collaborator.
///
/// The engine trusts this verbatim; credential verification happens
/// upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthClaim {
    pub is_admin: bool,
}

impl AuthClaim {
    #[must_use]
    pub const fn admin() -> Self {
        Self { is_admin: true }
    }
}

/// Service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller lacks the administrative claim.
    #[error("administrative privilege required")]
    Unauthorized,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// A rendered report ready for export.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    /// Fixed filename convention for the export.
    pub file_name: String,
    /// Always `text/csv`.
    pub content_type: &'static str,
    pub content: Vec<u8>,
}

/// Orchestrates the ledger, calculator, report generator, and publisher.
pub struct PunchClockService {
    /// Storage handle; the mutex is held only for the single call.
    ledger: Mutex<Ledger>,
    publisher: Publisher,
    /// One lock per user serializes validate+append; distinct users
    /// proceed in parallel. Never a single global lock.
    user_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl PunchClockService {
    #[must_use]
    pub fn new(ledger: Ledger, publisher: Publisher) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            publisher,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(user_id).or_default())
    }

    fn with_ledger<T>(
        &self,
        f: impl FnOnce(&mut Ledger) -> Result<T, LedgerError>,
    ) -> Result<T, ServiceError> {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut ledger)?)
    }

    /// Registers a punch at the current time.
    ///
    /// Returns as soon as the ledger has accepted the event; the
    /// derived domain event is published in the background.
    pub async fn register_punch(
        &self,
        user_id: i64,
        kind: PunchKind,
    ) -> Result<PunchEvent, ServiceError> {
        self.register_punch_at(user_id, kind, Utc::now()).await
    }

    /// Registers a punch with an explicit timestamp.
    pub async fn register_punch_at(
        &self,
        user_id: i64,
        kind: PunchKind,
        timestamp: DateTime<Utc>,
    ) -> Result<PunchEvent, ServiceError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let event = self.with_ledger(|ledger| ledger.append(user_id, kind, timestamp))?;
        self.publisher.enqueue(DomainEvent::from_punch(&event));
        Ok(event)
    }

    /// A user's punch history over an optional inclusive range.
    ///
    /// No business-rule filtering beyond range validation.
    pub fn history(
        &self,
        user_id: i64,
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
    ) -> Result<Vec<PunchEvent>, ServiceError> {
        self.with_ledger(|ledger| ledger.query(user_id, range_start, range_end))
    }

    /// Worked and overtime hours for a user over an optional range,
    /// recomputed from raw events plus the active settings.
    pub fn period_summary(
        &self,
        user_id: i64,
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
    ) -> Result<AttendancePeriodSummary, ServiceError> {
        let (events, settings) = self.with_ledger(|ledger| {
            let events = ledger.query(user_id, range_start, range_end)?;
            let settings = ledger.effective_settings()?;
            Ok((events, settings))
        })?;
        Ok(summarize(
            user_id, &events, &settings, range_start, range_end,
        )?)
    }

    /// The administrative CSV report across all users.
    pub fn admin_report(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        auth: AuthClaim,
    ) -> Result<RenderedReport, ServiceError> {
        if !auth.is_admin {
            return Err(ServiceError::Unauthorized);
        }

        let (events, settings) = self.with_ledger(|ledger| {
            let events = ledger.query_all(None, Some(range_start), Some(range_end))?;
            let settings = ledger.effective_settings()?;
            Ok((events, settings))
        })?;
        let content = report::generate(&events, &settings, range_start, range_end)?;
        Ok(RenderedReport {
            file_name: report::report_file_name(range_start, range_end),
            content_type: punch_core::REPORT_CONTENT_TYPE,
            content,
        })
    }

    /// Replaces the active settings record. Admin-gated.
    pub fn replace_settings(
        &self,
        settings: AttendanceSettings,
        auth: AuthClaim,
    ) -> Result<(), ServiceError> {
        if !auth.is_admin {
            return Err(ServiceError::Unauthorized);
        }
        self.with_ledger(|ledger| ledger.replace_settings(settings))
    }

    /// The active settings, falling back to defaults.
    pub fn current_settings(&self) -> Result<AttendanceSettings, ServiceError> {
        self.with_ledger(|ledger| ledger.effective_settings())
    }

    /// Waits for in-flight publications to resolve.
    pub async fn flush_publisher(&self) {
        self.publisher.flush().await;
    }
}
