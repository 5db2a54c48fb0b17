//! 엔진 단위 테스트용 인메모리 저장소와 기록용 알림기.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bgpwatch_core::error::CoreError;
use bgpwatch_core::models::history::{HistoryPoint, StatusTracking};
use bgpwatch_core::models::notification::Notification;
use bgpwatch_core::models::session::{BgpSession, SessionStatus};
use bgpwatch_core::ports::exporter::MetricsSource;
use bgpwatch_core::ports::notifier::AlertNotifier;
use bgpwatch_core::ports::store::SessionStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[derive(Default)]
struct MemoryState {
    sessions: Vec<BgpSession>,
    history: Vec<HistoryPoint>,
    tracking: HashMap<i64, StatusTracking>,
}

/// `SessionStore` 인메모리 구현 (실패 주입 지원)
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    /// upsert가 실패할 피어 이름
    failing_peers: Mutex<HashSet<String>>,
    /// 추적 행 쓰기 실패 여부
    fail_tracking_writes: Mutex<bool>,
    pub upsert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn fail_upserts_for(&self, peer_name: &str) {
        self.failing_peers.lock().insert(peer_name.to_string());
    }

    pub fn fail_tracking_writes(&self, fail: bool) {
        *self.fail_tracking_writes.lock() = fail;
    }

    pub fn sessions(&self) -> Vec<BgpSession> {
        self.state.lock().sessions.clone()
    }

    pub fn history(&self) -> Vec<HistoryPoint> {
        self.state.lock().history.clone()
    }

    pub fn tracking(&self, session_id: i64) -> Option<StatusTracking> {
        self.state.lock().tracking.get(&session_id).cloned()
    }

    pub fn set_status(&self, session_id: i64, status: SessionStatus) {
        let mut state = self.state.lock();
        if let Some(s) = state.sessions.iter_mut().find(|s| s.id == session_id) {
            s.last_status = status;
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find_session(
        &self,
        pop_id: i64,
        peer_name: &str,
        peer_asn: u32,
    ) -> Result<Option<BgpSession>, CoreError> {
        Ok(self
            .state
            .lock()
            .sessions
            .iter()
            .find(|s| s.pop_id == pop_id && s.peer_name == peer_name && s.peer_asn == peer_asn)
            .cloned())
    }

    async fn upsert_session(&self, session: &BgpSession) -> Result<i64, CoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_peers.lock().contains(&session.peer_name) {
            return Err(CoreError::Storage(format!("주입된 실패: {}", session.peer_name)));
        }

        let mut state = self.state.lock();
        if let Some(existing) = state.sessions.iter_mut().find(|s| {
            s.pop_id == session.pop_id
                && s.peer_name == session.peer_name
                && s.peer_asn == session.peer_asn
        }) {
            let last_check = existing.last_check.max(session.last_check);
            let id = existing.id;
            *existing = BgpSession {
                id,
                last_check,
                ..session.clone()
            };
            return Ok(id);
        }

        let id = state.sessions.len() as i64 + 1;
        state.sessions.push(BgpSession {
            id,
            ..session.clone()
        });
        Ok(id)
    }

    async fn list_sessions(&self, pop_id: i64) -> Result<Vec<BgpSession>, CoreError> {
        Ok(self
            .state
            .lock()
            .sessions
            .iter()
            .filter(|s| s.pop_id == pop_id)
            .cloned()
            .collect())
    }

    async fn last_history_timestamp(
        &self,
        session_id: i64,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        Ok(self
            .state
            .lock()
            .history
            .iter()
            .filter(|p| p.session_id == session_id)
            .map(|p| p.recorded_at)
            .max())
    }

    async fn append_history(&self, point: &HistoryPoint) -> Result<(), CoreError> {
        self.state.lock().history.push(point.clone());
        Ok(())
    }

    async fn prune_history_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CoreError> {
        let mut state = self.state.lock();
        let before = state.history.len();
        state.history.retain(|p| p.recorded_at >= cutoff);
        Ok(before - state.history.len())
    }

    async fn history_since(
        &self,
        session_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, CoreError> {
        Ok(self
            .state
            .lock()
            .history
            .iter()
            .filter(|p| p.session_id == session_id && p.recorded_at >= since)
            .cloned()
            .collect())
    }

    async fn get_tracking(&self, session_id: i64) -> Result<Option<StatusTracking>, CoreError> {
        Ok(self.state.lock().tracking.get(&session_id).cloned())
    }

    async fn upsert_tracking(&self, tracking: &StatusTracking) -> Result<(), CoreError> {
        if *self.fail_tracking_writes.lock() {
            return Err(CoreError::Storage("주입된 추적 쓰기 실패".to_string()));
        }
        self.state
            .lock()
            .tracking
            .insert(tracking.session_id, tracking.clone());
        Ok(())
    }
}

/// 전송된 알림을 기록하는 알림기
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, Notification)>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: Mutex::new(true),
        }
    }

    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn notify(&self, webhook_url: &str, notification: &Notification) -> Result<(), CoreError> {
        self.sent
            .lock()
            .push((webhook_url.to_string(), notification.clone()));
        if *self.fail.lock() {
            return Err(CoreError::Network("웹훅 503".to_string()));
        }
        Ok(())
    }
}

/// 고정 응답 익스포터
pub struct StaticSource {
    pub body: Mutex<Result<String, u16>>,
    pub calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(body: &str) -> Self {
        Self {
            body: Mutex::new(Ok(body.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            body: Mutex::new(Err(status)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_body(&self, body: &str) {
        *self.body.lock() = Ok(body.to_string());
    }
}

#[async_trait]
impl MetricsSource for StaticSource {
    async fn fetch(&self, _url: &str) -> Result<String, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.body.lock() {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(CoreError::Fetch {
                status: Some(*status),
                message: "익스포터 응답 오류".to_string(),
            }),
        }
    }
}
