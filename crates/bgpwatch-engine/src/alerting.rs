//! 세션 상태 전이 알림 상태 머신.
//!
//! 세션별 추적 행(`StatusTracking`)을 기준으로 전이를 감지한다.
//! - 추적 행 없음: 현재 상태로 초기화 (알림 없음)
//! - 상태 동일: 아무것도 하지 않음
//! - 상태 변경: 추적 행 갱신 후 웹훅 전송
//!
//! 전송 실패는 추적 행에 영향을 주지 않는다. 같은 전이는 다시 알리지 않는다.

use std::sync::Arc;

use bgpwatch_core::error::CoreError;
use bgpwatch_core::models::history::StatusTracking;
use bgpwatch_core::models::notification::{Notification, NotificationField, Severity};
use bgpwatch_core::models::pop::{Pop, PopTarget};
use bgpwatch_core::models::report::AlertReport;
use bgpwatch_core::models::session::{BgpSession, SessionStatus};
use bgpwatch_core::ports::notifier::AlertNotifier;
use bgpwatch_core::ports::store::SessionStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// 세션 하나의 평가 결과
enum Evaluation {
    Initialized,
    Unchanged,
    Transition { delivered: Option<bool> },
}

/// 상태 전이 알림 상태 머신
pub struct AlertStateMachine {
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn AlertNotifier>,
    /// 웹훅 전송 여부 (비활성이어도 추적 행은 갱신)
    delivery_enabled: bool,
}

impl AlertStateMachine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn AlertNotifier>,
        delivery_enabled: bool,
    ) -> Self {
        Self {
            store,
            notifier,
            delivery_enabled,
        }
    }

    /// PoP의 모든 세션을 평가
    ///
    /// 세션 목록 조회 실패만 에러로 반환한다. 세션 단위 실패는 로그 후 건너뛴다.
    pub async fn evaluate(
        &self,
        target: &PopTarget,
        now: DateTime<Utc>,
    ) -> Result<AlertReport, CoreError> {
        let sessions = self.store.list_sessions(target.pop.id).await?;
        let webhook = if self.delivery_enabled {
            target.webhook_url.as_deref()
        } else {
            None
        };

        let mut report = AlertReport::default();
        for session in &sessions {
            match self.evaluate_session(session, &target.pop, webhook, now).await {
                Ok(Evaluation::Initialized) => report.initialized += 1,
                Ok(Evaluation::Unchanged) => {}
                Ok(Evaluation::Transition { delivered }) => {
                    report.transitions += 1;
                    match delivered {
                        Some(true) => report.delivered += 1,
                        Some(false) => report.delivery_failed += 1,
                        None => {}
                    }
                }
                Err(e) => {
                    warn!(
                        pop_id = target.pop.id,
                        session_id = session.id,
                        "알림 상태 평가 실패: {e}"
                    );
                }
            }
        }

        debug!(
            pop_id = target.pop.id,
            initialized = report.initialized,
            transitions = report.transitions,
            "알림 상태 평가 완료"
        );
        Ok(report)
    }

    async fn evaluate_session(
        &self,
        session: &BgpSession,
        pop: &Pop,
        webhook: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, CoreError> {
        let Some(tracking) = self.store.get_tracking(session.id).await? else {
            self.store
                .upsert_tracking(&StatusTracking {
                    session_id: session.id,
                    last_known_status: session.last_status,
                    last_notification_sent: None,
                })
                .await?;
            return Ok(Evaluation::Initialized);
        };

        if tracking.last_known_status == session.last_status {
            return Ok(Evaluation::Unchanged);
        }

        // 추적 행을 먼저 기록해야 같은 전이를 두 번 알리지 않는다
        self.store
            .upsert_tracking(&StatusTracking {
                session_id: session.id,
                last_known_status: session.last_status,
                last_notification_sent: Some(now),
            })
            .await?;

        info!(
            pop = %pop.name,
            peer = %session.peer_name,
            from = %tracking.last_known_status,
            to = %session.last_status,
            "세션 상태 전이"
        );

        let Some(url) = webhook else {
            return Ok(Evaluation::Transition { delivered: None });
        };

        let notification = render_notification(session, pop, now);
        let delivered = match self.notifier.notify(url, &notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(peer = %session.peer_name, "상태 전이 알림 전송 실패: {e}");
                false
            }
        };
        Ok(Evaluation::Transition {
            delivered: Some(delivered),
        })
    }
}

/// 전이 알림 생성
///
/// 현재 상태가 offline이면 다운 알림, 그 외(online/unknown)는 복구 알림.
pub fn render_notification(session: &BgpSession, pop: &Pop, now: DateTime<Utc>) -> Notification {
    let (title, description, severity) = if session.last_status == SessionStatus::Offline {
        (
            "🔴 BGP Session DOWN",
            format!(
                "Session **{}** (AS{}) went offline",
                session.peer_name, session.peer_asn
            ),
            Severity::Down,
        )
    } else {
        (
            "🟢 BGP Session UP",
            format!(
                "Session **{}** (AS{}) is back online",
                session.peer_name, session.peer_asn
            ),
            Severity::Up,
        )
    };

    Notification {
        title: title.to_string(),
        description,
        severity,
        fields: vec![
            NotificationField::inline("PoP", format!("{} ({})", pop.name, pop.location)),
            NotificationField::inline("Type", session.session_type.display_name()),
            NotificationField::inline("ASN", format!("AS{}", session.peer_asn)),
        ],
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, RecordingNotifier};
    use bgpwatch_core::models::session::{SessionSnapshot, SessionType};

    const WEBHOOK: &str = "https://discord.example/api/webhooks/1/abc";

    fn pop() -> Pop {
        Pop {
            id: 1,
            name: "FRA1".to_string(),
            location: "Frankfurt, DE".to_string(),
            exporter_url: "http://fra1.example:9324/metrics".to_string(),
            is_active: true,
        }
    }

    fn target(webhook: Option<&str>) -> PopTarget {
        PopTarget {
            pop: pop(),
            webhook_url: webhook.map(str::to_string),
        }
    }

    async fn seed(store: &MemoryStore, status: SessionStatus) -> i64 {
        let snapshot = SessionSnapshot {
            protocol_name: "AS174_UP_v4".to_string(),
            ip_version: "4".to_string(),
            peer_ip: "192.0.2.1".to_string(),
            peer_asn: 174,
            status,
            prefixes_in: 10,
            prefixes_out: 1,
            exporter_state: "Established".to_string(),
        };
        let session = BgpSession::discovered(1, SessionType::Upstream, &snapshot, Utc::now());
        store.upsert_session(&session).await.unwrap()
    }

    fn machine(
        store: &Arc<MemoryStore>,
        notifier: &Arc<RecordingNotifier>,
        enabled: bool,
    ) -> AlertStateMachine {
        AlertStateMachine::new(store.clone(), notifier.clone(), enabled)
    }

    #[tokio::test]
    async fn first_observation_initializes_without_notifying() {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let id = seed(&store, SessionStatus::Online).await;

        let report = machine(&store, &notifier, true)
            .evaluate(&target(Some(WEBHOOK)), Utc::now())
            .await
            .unwrap();

        assert_eq!(report.initialized, 1);
        assert_eq!(report.transitions, 0);
        assert!(notifier.sent().is_empty());
        let tracking = store.tracking(id).unwrap();
        assert_eq!(tracking.last_known_status, SessionStatus::Online);
        assert!(tracking.last_notification_sent.is_none());
    }

    #[tokio::test]
    async fn down_then_up_sends_exactly_two_notifications() {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let machine = machine(&store, &notifier, true);
        let id = seed(&store, SessionStatus::Online).await;
        let target = target(Some(WEBHOOK));

        machine.evaluate(&target, Utc::now()).await.unwrap();

        store.set_status(id, SessionStatus::Offline);
        machine.evaluate(&target, Utc::now()).await.unwrap();
        // 같은 상태 반복은 무시
        machine.evaluate(&target, Utc::now()).await.unwrap();

        store.set_status(id, SessionStatus::Online);
        let report = machine.evaluate(&target, Utc::now()).await.unwrap();
        assert_eq!(report.transitions, 1);
        assert_eq!(report.delivered, 1);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, WEBHOOK);
        assert_eq!(sent[0].1.severity, Severity::Down);
        assert_eq!(sent[1].1.severity, Severity::Up);
        assert_eq!(
            store.tracking(id).unwrap().last_known_status,
            SessionStatus::Online
        );
    }

    #[tokio::test]
    async fn delivery_failure_still_advances_tracking() {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::failing());
        let machine = machine(&store, &notifier, true);
        let id = seed(&store, SessionStatus::Online).await;
        let target = target(Some(WEBHOOK));
        machine.evaluate(&target, Utc::now()).await.unwrap();

        store.set_status(id, SessionStatus::Offline);
        let report = machine.evaluate(&target, Utc::now()).await.unwrap();
        assert_eq!(report.delivery_failed, 1);

        let tracking = store.tracking(id).unwrap();
        assert_eq!(tracking.last_known_status, SessionStatus::Offline);
        assert!(tracking.last_notification_sent.is_some());

        // 재시도하지 않는다
        machine.evaluate(&target, Utc::now()).await.unwrap();
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn missing_webhook_advances_tracking_silently() {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let machine = machine(&store, &notifier, true);
        let id = seed(&store, SessionStatus::Online).await;
        machine.evaluate(&target(None), Utc::now()).await.unwrap();

        store.set_status(id, SessionStatus::Offline);
        let report = machine.evaluate(&target(None), Utc::now()).await.unwrap();

        assert_eq!(report.transitions, 1);
        assert_eq!(report.delivered + report.delivery_failed, 0);
        assert!(notifier.sent().is_empty());
        assert_eq!(
            store.tracking(id).unwrap().last_known_status,
            SessionStatus::Offline
        );
    }

    #[tokio::test]
    async fn disabled_delivery_ignores_configured_webhook() {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let machine = machine(&store, &notifier, false);
        let id = seed(&store, SessionStatus::Online).await;
        machine.evaluate(&target(Some(WEBHOOK)), Utc::now()).await.unwrap();

        store.set_status(id, SessionStatus::Offline);
        machine.evaluate(&target(Some(WEBHOOK)), Utc::now()).await.unwrap();

        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn tracking_write_failure_suppresses_delivery() {
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let machine = machine(&store, &notifier, true);
        let id = seed(&store, SessionStatus::Online).await;
        machine.evaluate(&target(Some(WEBHOOK)), Utc::now()).await.unwrap();

        store.set_status(id, SessionStatus::Offline);
        store.fail_tracking_writes(true);
        let report = machine
            .evaluate(&target(Some(WEBHOOK)), Utc::now())
            .await
            .unwrap();

        assert_eq!(report.transitions, 0);
        assert!(notifier.sent().is_empty());
        assert_eq!(
            store.tracking(id).unwrap().last_known_status,
            SessionStatus::Online
        );
    }

    #[test]
    fn unknown_status_renders_as_recovery() {
        let snapshot = SessionSnapshot {
            protocol_name: "DECIX_RS1".to_string(),
            ip_version: "6".to_string(),
            peer_ip: "2001:db8::1".to_string(),
            peer_asn: 6695,
            status: SessionStatus::Unknown,
            prefixes_in: 0,
            prefixes_out: 0,
            exporter_state: String::new(),
        };
        let session = BgpSession::discovered(1, SessionType::Peering, &snapshot, Utc::now());
        let notification = render_notification(&session, &pop(), Utc::now());

        assert_eq!(notification.severity, Severity::Up);
        assert_eq!(notification.title, "🟢 BGP Session UP");
        assert_eq!(
            notification.description,
            "Session **DECIX_RS1** (AS6695) is back online"
        );
        let fields: Vec<_> = notification
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("PoP", "FRA1 (Frankfurt, DE)"),
                ("Type", "Peering"),
                ("ASN", "AS6695"),
            ]
        );
    }
}
