//! PoP(관측 지점) 모델.

use serde::{Deserialize, Serialize};

use super::session::{BgpSession, SessionType};

/// 모니터링 대상 사이트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pop {
    /// PoP ID
    pub id: i64,
    /// 표시 이름 (예: "FRA1")
    pub name: String,
    /// 위치 (예: "Frankfurt, DE")
    pub location: String,
    /// BIRD 익스포터 URL
    pub exporter_url: String,
    /// 폴링 대상 여부
    pub is_active: bool,
}

/// 한 번의 폴링에 넘겨지는 PoP 컨텍스트
///
/// 익스포터 URL과 웹훅 URL은 호출자가 읽어 전달한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopTarget {
    /// 대상 PoP
    pub pop: Pop,
    /// 알림 웹훅 (없으면 전송 생략)
    pub webhook_url: Option<String>,
}

/// 세션 분류별 집계
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTypeStats {
    pub session_type: SessionType,
    pub total: u64,
    pub online: u64,
    pub offline: u64,
    pub prefixes_in: i64,
    pub prefixes_out: i64,
}

/// PoP 상태 요약
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopStatus {
    /// 대상 PoP
    pub pop: Pop,
    /// 분류별 집계 (분류 순)
    pub stats: Vec<SessionTypeStats>,
    /// 세션 목록 (분류, 피어 이름 순)
    pub sessions: Vec<BgpSession>,
}
