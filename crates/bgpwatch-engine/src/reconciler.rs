//! 세션 조정기.
//!
//! 집계된 스냅샷을 저장소의 세션 인벤토리에 반영한다.
//! 처음 보는 세션은 분류 후 자동 등록하고, 히스토리는 최소 간격을 두고 기록한다.
//! 스냅샷 하나의 실패가 나머지 스냅샷 처리에 영향을 주지 않는다.

use std::collections::BTreeMap;
use std::sync::Arc;

use bgpwatch_core::error::CoreError;
use bgpwatch_core::models::history::HistoryPoint;
use bgpwatch_core::models::report::ReconcileReport;
use bgpwatch_core::models::session::{BgpSession, SessionSnapshot};
use bgpwatch_core::ports::store::SessionStore;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::classifier::classify;

/// 히스토리 기록 간격 및 보존 기간
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    /// 같은 세션의 연속 기록 최소 간격
    pub min_interval: Duration,
    /// 보존 기간
    pub retention: Duration,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::seconds(300),
            retention: Duration::hours(5),
        }
    }
}

impl HistoryPolicy {
    /// 설정값(std Duration)으로부터 생성
    pub fn from_std(min_interval: std::time::Duration, retention: std::time::Duration) -> Self {
        let defaults = Self::default();
        Self {
            min_interval: Duration::from_std(min_interval).unwrap_or(defaults.min_interval),
            retention: Duration::from_std(retention).unwrap_or(defaults.retention),
        }
    }
}

/// 스냅샷 하나의 반영 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Updated,
    Discovered,
}

/// 세션 조정기
pub struct Reconciler {
    store: Arc<dyn SessionStore>,
    policy: HistoryPolicy,
}

impl Reconciler {
    pub fn new(store: Arc<dyn SessionStore>, policy: HistoryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// 보존 기간을 넘긴 히스토리 삭제 (모든 세션 대상)
    pub async fn prune(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let cutoff = now - self.policy.retention;
        let removed = self.store.prune_history_older_than(cutoff).await?;
        if removed > 0 {
            info!(removed, "오래된 세션 히스토리 삭제");
        }
        Ok(removed)
    }

    /// 현재 시각 기준 조정
    pub async fn reconcile(
        &self,
        pop_id: i64,
        snapshots: &BTreeMap<String, SessionSnapshot>,
    ) -> ReconcileReport {
        self.reconcile_at(pop_id, snapshots, Utc::now()).await
    }

    /// 지정 시각 기준 조정
    pub async fn reconcile_at(
        &self,
        pop_id: i64,
        snapshots: &BTreeMap<String, SessionSnapshot>,
        now: DateTime<Utc>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for (key, snapshot) in snapshots {
            match self.reconcile_one(pop_id, snapshot, now).await {
                Ok(Outcome::Updated) => report.updated += 1,
                Ok(Outcome::Discovered) => {
                    report.updated += 1;
                    report.discovered += 1;
                }
                Err(e) => {
                    warn!(pop_id, key = %key, "세션 반영 실패: {e}");
                    report.failed += 1;
                }
            }
        }

        debug!(
            pop_id,
            updated = report.updated,
            discovered = report.discovered,
            failed = report.failed,
            "세션 조정 완료"
        );
        report
    }

    async fn reconcile_one(
        &self,
        pop_id: i64,
        snapshot: &SessionSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Outcome, CoreError> {
        let existing = self
            .store
            .find_session(pop_id, &snapshot.protocol_name, snapshot.peer_asn)
            .await?;

        let (session, outcome) = match existing {
            Some(mut session) => {
                session.apply_snapshot(snapshot, now);
                (session, Outcome::Updated)
            }
            None => {
                let session_type = classify(&snapshot.protocol_name, snapshot.peer_asn);
                info!(
                    pop_id,
                    peer = %snapshot.protocol_name,
                    asn = snapshot.peer_asn,
                    session_type = %session_type,
                    "새 세션 발견"
                );
                (
                    BgpSession::discovered(pop_id, session_type, snapshot, now),
                    Outcome::Discovered,
                )
            }
        };

        let session_id = self.store.upsert_session(&session).await?;

        // 히스토리는 기존 세션 갱신에서만 기록한다
        if outcome == Outcome::Updated {
            if let Err(e) = self.record_history(session_id, &session, now).await {
                warn!(session_id, "세션 히스토리 기록 실패: {e}");
            }
        }

        Ok(outcome)
    }

    async fn record_history(
        &self,
        session_id: i64,
        session: &BgpSession,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if let Some(last) = self.store.last_history_timestamp(session_id).await? {
            if now - last < self.policy.min_interval {
                return Ok(());
            }
        }

        self.store
            .append_history(&HistoryPoint {
                session_id,
                status: session.last_status,
                prefixes_imported: session.prefixes_imported,
                prefixes_exported: session.prefixes_exported,
                recorded_at: now,
            })
            .await
    }
}
