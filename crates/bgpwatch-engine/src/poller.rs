//! PoP 폴링 파이프라인.
//!
//! 가져오기 → 파싱 → 집계 → (히스토리 정리 → 조정 → 알림 평가).
//! 같은 PoP의 폴링은 직렬화되고, 서로 다른 PoP는 동시에 진행된다.
//!
//! 가져오기가 실패하면 저장소는 건드리지 않는다.
//! 저장소 반영 단계는 별도 태스크에서 실행되어, 호출자가 취소되어도
//! 정리만 되고 조정/알림이 빠지는 일이 없다.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use bgpwatch_core::error::CoreError;
use bgpwatch_core::models::pop::PopTarget;
use bgpwatch_core::models::report::{AlertReport, PollReport, ReconcileReport};
use bgpwatch_core::models::session::SessionSnapshot;
use bgpwatch_core::ports::exporter::MetricsSource;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::aggregator::aggregate;
use crate::alerting::AlertStateMachine;
use crate::parser::parse_exposition;
use crate::reconciler::Reconciler;

/// 폴러 타임아웃 설정
#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    /// 익스포터 요청 타임아웃
    pub fetch_timeout: Duration,
    /// 저장소 반영 + 알림 단계 타임아웃
    pub reconcile_timeout: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            reconcile_timeout: Duration::from_secs(30),
        }
    }
}

/// PoP별 직렬화 락
#[derive(Default)]
pub struct PopLocks {
    locks: parking_lot::Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl PopLocks {
    /// PoP 락 획득 (소유 가드 반환)
    pub async fn acquire(&self, pop_id: i64) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .entry(pop_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

/// PoP 폴러
pub struct Poller {
    source: Arc<dyn MetricsSource>,
    reconciler: Arc<Reconciler>,
    alerting: Arc<AlertStateMachine>,
    settings: PollerSettings,
    locks: PopLocks,
}

impl Poller {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        reconciler: Arc<Reconciler>,
        alerting: Arc<AlertStateMachine>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            source,
            reconciler,
            alerting,
            settings,
            locks: PopLocks::default(),
        }
    }

    /// PoP 한 번 폴링
    pub async fn poll(&self, target: &PopTarget) -> Result<PollReport, CoreError> {
        let pop_id = target.pop.id;
        let guard = self.locks.acquire(pop_id).await;
        debug!(pop = %target.pop.name, "PoP 폴링 시작");

        let fetched = match tokio::time::timeout(
            self.settings.fetch_timeout,
            self.source.fetch(&target.pop.exporter_url),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CoreError::Fetch {
                status: None,
                message: format!(
                    "익스포터 응답 시간 초과 ({}초)",
                    self.settings.fetch_timeout.as_secs()
                ),
            }),
        };
        let body = fetched.map_err(|e| {
            warn!(pop = %target.pop.name, "익스포터 수집 실패: {e}");
            e
        })?;

        let records = parse_exposition(&body);
        let snapshots = aggregate(&records);
        debug!(
            pop_id,
            records = records.len(),
            snapshots = snapshots.len(),
            "메트릭 집계 완료"
        );

        let mut report = PollReport {
            pop_id,
            records: records.len(),
            snapshots: snapshots.len(),
            ..Default::default()
        };

        let phase = tokio::spawn(mutation_phase(
            self.reconciler.clone(),
            self.alerting.clone(),
            target.clone(),
            snapshots,
            guard,
        ));

        let (pruned, reconcile, alerts) =
            match tokio::time::timeout(self.settings.reconcile_timeout, phase).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    return Err(CoreError::Internal(format!("저장소 반영 태스크 실패: {e}")))
                }
                Err(_) => {
                    return Err(CoreError::Internal(format!(
                        "저장소 반영 시간 초과 ({}초), 백그라운드에서 계속 진행",
                        self.settings.reconcile_timeout.as_secs()
                    )))
                }
            };

        report.pruned = pruned;
        report.reconcile = reconcile;
        report.alerts = alerts;

        info!(
            pop = %target.pop.name,
            snapshots = report.snapshots,
            updated = reconcile.updated,
            discovered = reconcile.discovered,
            transitions = alerts.transitions,
            "PoP 폴링 완료"
        );
        Ok(report)
    }
}

/// 정리 → 조정 → 알림 평가
///
/// PoP 락 가드를 끝까지 들고 있는다.
async fn mutation_phase(
    reconciler: Arc<Reconciler>,
    alerting: Arc<AlertStateMachine>,
    target: PopTarget,
    snapshots: BTreeMap<String, SessionSnapshot>,
    _guard: OwnedMutexGuard<()>,
) -> (usize, ReconcileReport, AlertReport) {
    let now = Utc::now();

    let pruned = match reconciler.prune(now).await {
        Ok(n) => n,
        Err(e) => {
            warn!(pop_id = target.pop.id, "히스토리 정리 실패: {e}");
            0
        }
    };

    let reconcile = reconciler.reconcile_at(target.pop.id, &snapshots, now).await;

    let alerts = match alerting.evaluate(&target, now).await {
        Ok(report) => report,
        Err(e) => {
            warn!(pop_id = target.pop.id, "알림 상태 평가 실패: {e}");
            AlertReport::default()
        }
    };

    (pruned, reconcile, alerts)
}
