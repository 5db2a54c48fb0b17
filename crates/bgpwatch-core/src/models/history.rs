//! 세션 히스토리 및 알림 상태 추적 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionStatus;

/// 세션 시계열 포인트 (추가 전용)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// 대상 세션
    pub session_id: i64,
    /// 기록 시점 상태
    pub status: SessionStatus,
    /// 수신 프리픽스 수
    pub prefixes_imported: i64,
    /// 송신 프리픽스 수
    pub prefixes_exported: i64,
    /// 기록 시각
    pub recorded_at: DateTime<Utc>,
}

/// 세션별 마지막 알림 상태
///
/// 최초 관측 시 생성되고, 전이 알림마다 갱신된다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTracking {
    /// 대상 세션
    pub session_id: i64,
    /// 마지막으로 알린(또는 최초 관측한) 상태
    pub last_known_status: SessionStatus,
    /// 마지막 알림 시각
    pub last_notification_sent: Option<DateTime<Utc>>,
}
