//! BGP 세션 모델.
//!
//! 폴링마다 집계되는 [`SessionSnapshot`]과 저장소에 남는 [`BgpSession`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// 세션 수립됨 (`bird_protocol_up == 1`)
    Online,
    /// 세션 다운
    Offline,
    /// 상태 메트릭 미수신
    Unknown,
}

impl SessionStatus {
    /// 저장소/로그용 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Online => "online",
            SessionStatus::Offline => "offline",
            SessionStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(SessionStatus::Online),
            "offline" => Ok(SessionStatus::Offline),
            "unknown" => Ok(SessionStatus::Unknown),
            other => Err(CoreError::Validation {
                field: "status".to_string(),
                message: format!("알 수 없는 세션 상태: {other}"),
            }),
        }
    }
}

/// 세션 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    /// 트랜짓/업스트림
    Upstream,
    /// 고객/다운스트림
    Downstream,
    /// IX/프라이빗 피어링
    Peering,
}

impl SessionType {
    /// 저장소/로그용 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Upstream => "upstream",
            SessionType::Downstream => "downstream",
            SessionType::Peering => "peering",
        }
    }

    /// 알림 표시용 이름 (첫 글자 대문자)
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionType::Upstream => "Upstream",
            SessionType::Downstream => "Downstream",
            SessionType::Peering => "Peering",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upstream" => Ok(SessionType::Upstream),
            "downstream" => Ok(SessionType::Downstream),
            "peering" => Ok(SessionType::Peering),
            other => Err(CoreError::Validation {
                field: "session_type".to_string(),
                message: format!("알 수 없는 세션 분류: {other}"),
            }),
        }
    }
}

/// `ip_version` 레이블이 없을 때의 주소 체계
pub const DEFAULT_IP_VERSION: &str = "4";

/// `peer_ip`/`neighbor` 레이블이 없을 때의 피어 주소
pub const UNKNOWN_PEER_IP: &str = "N/A";

/// 한 번의 폴링에서 집계된 세션 뷰 (저장되지 않음)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// BIRD 프로토콜 이름 (예: `AS214757_UP_AS214757_v6`)
    pub protocol_name: String,
    /// 주소 체계 레이블 값 ("4" 또는 "6")
    pub ip_version: String,
    /// 피어 주소
    pub peer_ip: String,
    /// 프로토콜 이름에서 추출한 ASN (없으면 0)
    pub peer_asn: u32,
    /// 세션 상태
    pub status: SessionStatus,
    /// 수신 프리픽스 수
    pub prefixes_in: i64,
    /// 송신 프리픽스 수
    pub prefixes_out: i64,
    /// 익스포터가 보고한 BIRD 상태 문자열 (예: "Established")
    pub exporter_state: String,
}

impl SessionSnapshot {
    /// 집계 키 (`이름_ipver버전`)
    pub fn key(&self) -> String {
        snapshot_key(&self.protocol_name, &self.ip_version)
    }
}

/// 집계 키 생성
///
/// 같은 프로토콜 이름이 주소 체계별로 두 번 노출되는 경우를 구분한다.
pub fn snapshot_key(protocol_name: &str, ip_version: &str) -> String {
    format!("{protocol_name}_ipver{ip_version}")
}

/// 저장소에 영속되는 BGP 세션
///
/// 식별자는 `(pop_id, peer_name, peer_asn)` 삼중쌍이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgpSession {
    /// 행 ID (저장 전에는 0)
    pub id: i64,
    /// 소속 PoP
    pub pop_id: i64,
    /// 세션 분류
    pub session_type: SessionType,
    /// 피어 이름 (= BIRD 프로토콜 이름)
    pub peer_name: String,
    /// 피어 주소
    pub peer_ip: String,
    /// 피어 ASN
    pub peer_asn: u32,
    /// 마지막 관측 상태
    pub last_status: SessionStatus,
    /// 수신 프리픽스 수
    pub prefixes_imported: i64,
    /// 송신 프리픽스 수
    pub prefixes_exported: i64,
    /// 마지막 갱신 시각
    pub last_check: DateTime<Utc>,
}

impl BgpSession {
    /// 스냅샷으로부터 신규 세션 생성 (자동 발견)
    pub fn discovered(
        pop_id: i64,
        session_type: SessionType,
        snapshot: &SessionSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            pop_id,
            session_type,
            peer_name: snapshot.protocol_name.clone(),
            peer_ip: snapshot.peer_ip.clone(),
            peer_asn: snapshot.peer_asn,
            last_status: snapshot.status,
            prefixes_imported: snapshot.prefixes_in,
            prefixes_exported: snapshot.prefixes_out,
            last_check: now,
        }
    }

    /// 스냅샷의 상태/프리픽스 값으로 덮어쓰기
    ///
    /// 분류와 피어 주소는 최초 발견 시 값을 유지한다.
    pub fn apply_snapshot(&mut self, snapshot: &SessionSnapshot, now: DateTime<Utc>) {
        self.last_status = snapshot.status;
        self.prefixes_imported = snapshot.prefixes_in;
        self.prefixes_exported = snapshot.prefixes_out;
        if now > self.last_check {
            self.last_check = now;
        }
    }
}
