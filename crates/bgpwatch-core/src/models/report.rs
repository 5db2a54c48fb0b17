//! 폴링 결과 리포트.

use serde::{Deserialize, Serialize};

/// 조정(reconciliation) 결과
///
/// `discovered`는 `updated`에도 포함된다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// 갱신 또는 신규 등록된 세션 수
    pub updated: usize,
    /// 신규 등록된 세션 수
    pub discovered: usize,
    /// 저장소 오류로 건너뛴 스냅샷 수
    pub failed: usize,
}

/// 알림 상태 머신 실행 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertReport {
    /// 추적 행을 새로 만든 세션 수
    pub initialized: usize,
    /// 상태 전이 감지 수
    pub transitions: usize,
    /// 전송 성공 수
    pub delivered: usize,
    /// 전송 실패 수
    pub delivery_failed: usize,
}

/// PoP 한 번의 폴링 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollReport {
    pub pop_id: i64,
    /// 파싱된 메트릭 레코드 수
    pub records: usize,
    /// 집계된 스냅샷 수
    pub snapshots: usize,
    /// 보존 기간 초과로 삭제된 히스토리 수
    pub pruned: usize,
    pub reconcile: ReconcileReport,
    pub alerts: AlertReport,
}
