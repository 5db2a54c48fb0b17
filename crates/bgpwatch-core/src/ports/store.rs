//! 영속 저장소 포트.
//!
//! 구현: `bgpwatch-storage` crate (rusqlite)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::history::{HistoryPoint, StatusTracking};
use crate::models::pop::{Pop, PopStatus};
use crate::models::session::BgpSession;

/// 세션 인벤토리 + 히스토리 + 알림 추적 저장소
#[async_trait]
pub trait SessionStore: Send + Sync {
    // ============================================================
    // 세션
    // ============================================================

    /// `(pop_id, peer_name, peer_asn)`로 세션 조회
    async fn find_session(
        &self,
        pop_id: i64,
        peer_name: &str,
        peer_asn: u32,
    ) -> Result<Option<BgpSession>, CoreError>;

    /// 세션 삽입 또는 갱신 (식별 삼중쌍 기준), 행 ID 반환
    ///
    /// `session.id`는 무시된다. `last_check`는 뒤로 가지 않는다.
    async fn upsert_session(&self, session: &BgpSession) -> Result<i64, CoreError>;

    /// PoP의 모든 세션
    async fn list_sessions(&self, pop_id: i64) -> Result<Vec<BgpSession>, CoreError>;

    // ============================================================
    // 히스토리
    // ============================================================

    /// 세션의 가장 최근 히스토리 시각
    async fn last_history_timestamp(
        &self,
        session_id: i64,
    ) -> Result<Option<DateTime<Utc>>, CoreError>;

    /// 히스토리 포인트 추가
    async fn append_history(&self, point: &HistoryPoint) -> Result<(), CoreError>;

    /// `cutoff` 이전 히스토리 전체 삭제, 삭제 건수 반환
    async fn prune_history_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CoreError>;

    /// `since` 이후 히스토리 (시간 오름차순)
    async fn history_since(
        &self,
        session_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, CoreError>;

    // ============================================================
    // 알림 상태 추적
    // ============================================================

    /// 세션의 추적 행 조회
    async fn get_tracking(&self, session_id: i64) -> Result<Option<StatusTracking>, CoreError>;

    /// 추적 행 삽입 또는 갱신
    async fn upsert_tracking(&self, tracking: &StatusTracking) -> Result<(), CoreError>;
}

/// PoP 인벤토리 + 알림 설정 저장소
#[async_trait]
pub trait PopRepository: Send + Sync {
    /// PoP 삽입 또는 갱신 (ID 기준)
    async fn upsert_pop(&self, pop: &Pop) -> Result<(), CoreError>;

    /// PoP 조회
    async fn get_pop(&self, pop_id: i64) -> Result<Option<Pop>, CoreError>;

    /// 활성 PoP 목록 (이름 순)
    async fn list_active_pops(&self) -> Result<Vec<Pop>, CoreError>;

    /// 웹훅 URL 설정 (None이면 해제)
    async fn set_webhook(&self, pop_id: i64, webhook_url: Option<&str>) -> Result<(), CoreError>;

    /// 웹훅 URL 조회
    async fn get_webhook(&self, pop_id: i64) -> Result<Option<String>, CoreError>;

    /// PoP 상태 요약 (분류별 집계 + 세션 목록)
    async fn pop_status(&self, pop_id: i64) -> Result<PopStatus, CoreError>;
}
