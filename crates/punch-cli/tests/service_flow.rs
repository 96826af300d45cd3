//! Integration tests for the punch clock service.
//!
//! Drives the full orchestration path: per-user append serialization,
//! hour computation, report generation, and background publication
//! against a recording transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use punch_bus::{DomainEvent, Publisher, RetryPolicy, Transport, TransportError};
use punch_cli::{AuthClaim, PunchClockService, ServiceError};
use punch_core::{AttendanceSettings, PunchKind};
use punch_ledger::{Ledger, LedgerError};

/// Transport that records every publish without failing.
#[derive(Default)]
struct RecordingTransport {
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingTransport {
    fn events(&self) -> Vec<DomainEvent> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| serde_json::from_slice(payload).unwrap())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn publish(&self, _topic: &str, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.published
            .lock()
            .unwrap()
            .push((key.to_string(), payload.to_vec()));
        Ok(())
    }
}

fn test_service() -> (PunchClockService, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let policy = RetryPolicy {
        max_attempts: 2,
        attempt_timeout: Duration::from_millis(100),
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        total_deadline: Duration::from_secs(1),
    };
    let publisher = Publisher::new(transport.clone(), "punch-clock", policy);
    let ledger = Ledger::open_in_memory().unwrap();
    (PunchClockService::new(ledger, publisher), transport)
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

#[tokio::test]
async fn nine_to_five_round_trips_through_history_and_summary() {
    let (service, _transport) = test_service();

    service
        .register_punch_at(1, PunchKind::CheckIn, at(9, 0))
        .await
        .unwrap();
    service
        .register_punch_at(1, PunchKind::CheckOut, at(17, 0))
        .await
        .unwrap();

    let history = service.history(1, None, None).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, PunchKind::CheckIn);
    assert_eq!(history[0].timestamp, at(9, 0));
    assert_eq!(history[1].kind, PunchKind::CheckOut);

    let summary = service.period_summary(1, None, None).unwrap();
    assert_eq!(summary.worked_hours, 8.0);
    assert_eq!(summary.overtime_hours, 0.0);
    assert_eq!(summary.incomplete_pairs, 0);
}

#[tokio::test]
async fn double_check_in_is_rejected_and_not_published() {
    let (service, transport) = test_service();

    service
        .register_punch_at(1, PunchKind::CheckIn, at(9, 0))
        .await
        .unwrap();
    let result = service
        .register_punch_at(1, PunchKind::CheckIn, at(10, 0))
        .await;

    assert!(matches!(
        result,
        Err(ServiceError::Ledger(LedgerError::InvalidSequence {
            user_id: 1,
            ..
        }))
    ));

    service.flush_publisher().await;
    assert_eq!(transport.events().len(), 1);
}

#[tokio::test]
async fn check_out_without_open_shift_is_rejected() {
    let (service, _transport) = test_service();

    let result = service
        .register_punch_at(1, PunchKind::CheckOut, at(17, 0))
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::Ledger(LedgerError::InvalidSequence { .. }))
    ));
}

#[tokio::test]
async fn open_shift_counts_as_incomplete_pair() {
    let (service, _transport) = test_service();

    service
        .register_punch_at(1, PunchKind::CheckIn, at(9, 0))
        .await
        .unwrap();

    let summary = service.period_summary(1, None, None).unwrap();
    assert_eq!(summary.worked_hours, 0.0);
    assert_eq!(summary.incomplete_pairs, 1);
}

#[tokio::test]
async fn inverted_history_range_is_rejected() {
    let (service, _transport) = test_service();

    let result = service.history(1, Some(at(17, 0)), Some(at(9, 0)));
    assert!(matches!(
        result,
        Err(ServiceError::Ledger(LedgerError::InvalidRange { .. }))
    ));
}

#[tokio::test]
async fn accepted_punches_publish_one_to_one_in_order() {
    let (service, transport) = test_service();

    let first = service
        .register_punch_at(1, PunchKind::CheckIn, at(9, 0))
        .await
        .unwrap();
    let second = service
        .register_punch_at(1, PunchKind::CheckOut, at(12, 0))
        .await
        .unwrap();
    let third = service
        .register_punch_at(1, PunchKind::CheckIn, at(13, 0))
        .await
        .unwrap();

    service.flush_publisher().await;

    let events = transport.events();
    let ids: Vec<_> = events.iter().map(|event| event.event_id).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);
}

#[tokio::test]
async fn distinct_users_append_concurrently() {
    let (service, transport) = test_service();
    let service = Arc::new(service);

    let a = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.register_punch(1, PunchKind::CheckIn).await })
    };
    let b = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.register_punch(2, PunchKind::CheckIn).await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    service.flush_publisher().await;
    assert_eq!(transport.events().len(), 2);
    assert_eq!(service.history(1, None, None).unwrap().len(), 1);
    assert_eq!(service.history(2, None, None).unwrap().len(), 1);
}

#[tokio::test]
async fn admin_report_is_gated_by_the_external_claim() {
    let (service, _transport) = test_service();

    service
        .register_punch_at(1, PunchKind::CheckIn, at(9, 0))
        .await
        .unwrap();
    service
        .register_punch_at(1, PunchKind::CheckOut, at(19, 0))
        .await
        .unwrap();

    let denied = service.admin_report(at(0, 0), at(23, 0), AuthClaim::default());
    assert!(matches!(denied, Err(ServiceError::Unauthorized)));

    let report = service
        .admin_report(at(0, 0), at(23, 0), AuthClaim::admin())
        .unwrap();
    assert_eq!(report.file_name, "attendance_2025-03-10_2025-03-10.csv");
    assert_eq!(report.content_type, "text/csv");

    let content = String::from_utf8(report.content).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("user_id,date,worked_hours,overtime_hours")
    );
    // 10h worked, 2h raw overtime, displayed at the default 1.5 rate.
    assert_eq!(lines.next(), Some("1,2025-03-10,10.00,3.00"));
}

#[tokio::test]
async fn settings_replacement_only_affects_future_computations() {
    let (service, _transport) = test_service();

    service
        .register_punch_at(1, PunchKind::CheckIn, at(9, 0))
        .await
        .unwrap();
    service
        .register_punch_at(1, PunchKind::CheckOut, at(17, 0))
        .await
        .unwrap();

    let before = service.period_summary(1, None, None).unwrap();
    assert_eq!(before.overtime_hours, 0.0);

    let denied = service.replace_settings(
        AttendanceSettings {
            workday_hours: 6.0,
            overtime_rate: 2.0,
        },
        AuthClaim::default(),
    );
    assert!(matches!(denied, Err(ServiceError::Unauthorized)));

    service
        .replace_settings(
            AttendanceSettings {
                workday_hours: 6.0,
                overtime_rate: 2.0,
            },
            AuthClaim::admin(),
        )
        .unwrap();

    // Same raw events, recomputed against the replaced settings.
    let after = service.period_summary(1, None, None).unwrap();
    assert_eq!(after.worked_hours, 8.0);
    assert_eq!(after.overtime_hours, 2.0);
}
