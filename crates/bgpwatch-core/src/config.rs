//! 애플리케이션 설정 구조체.
//!
//! 저장소 경로, 폴링 주기, 히스토리 보존 정책, 알림 설정, PoP 목록을 정의한다.
//! `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::models::pop::Pop;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 로컬 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 폴링 설정
    #[serde(default)]
    pub poller: PollerConfig,
    /// 히스토리 기록/보존 설정
    #[serde(default)]
    pub history: HistoryConfig,
    /// 알림 설정
    #[serde(default)]
    pub notification: NotificationConfig,
    /// 시작 시 저장소에 반영할 PoP 목록
    #[serde(default)]
    pub pops: Vec<PopConfig>,
}

// ============================================================
// 저장소 설정
// ============================================================

/// 로컬 저장소 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite DB 파일 경로 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

// ============================================================
// 폴링 설정
// ============================================================

/// 폴링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// 전체 PoP 폴링 주기 (초)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// 익스포터 요청 타임아웃 (초)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// 최대 리다이렉트 횟수
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// 저장소 반영 + 알림 단계 타임아웃 (초)
    #[serde(default = "default_reconcile_timeout_secs")]
    pub reconcile_timeout_secs: u64,
    /// 동시에 폴링할 최대 PoP 수
    #[serde(default = "default_max_concurrent_pops")]
    pub max_concurrent_pops: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_redirects: default_max_redirects(),
            reconcile_timeout_secs: default_reconcile_timeout_secs(),
            max_concurrent_pops: default_max_concurrent_pops(),
        }
    }
}

// ============================================================
// 히스토리 설정
// ============================================================

/// 히스토리 기록 간격 및 보존 기간
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// 같은 세션의 연속 기록 최소 간격 (초)
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    /// 보존 기간 (시간)
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval_secs(),
            retention_hours: default_retention_hours(),
        }
    }
}

// ============================================================
// 알림 설정
// ============================================================

/// 웹훅 알림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// 알림 전송 활성화 (비활성이어도 상태 추적은 갱신)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 웹훅 요청 타임아웃 (초)
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
    /// 임베드 하단 문구
    #[serde(default = "default_footer_text")]
    pub footer_text: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_timeout_secs: default_webhook_timeout_secs(),
            footer_text: default_footer_text(),
        }
    }
}

// ============================================================
// PoP 설정
// ============================================================

/// 설정 파일의 PoP 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopConfig {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub exporter_url: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PopConfig {
    /// 저장소 모델로 변환
    pub fn to_pop(&self) -> Pop {
        Pop {
            id: self.id,
            name: self.name.clone(),
            location: self.location.clone(),
            exporter_url: self.exporter_url.clone(),
            is_active: self.is_active,
        }
    }
}

/// 같은 세션 히스토리 기록 간격 하한 (초)
pub const MIN_HISTORY_INTERVAL_SECS: u64 = 300;

/// 히스토리 보존 기간 상한 (시간, 1년)
pub const MAX_RETENTION_HOURS: u64 = 24 * 365;

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig::default(),
            poller: PollerConfig::default(),
            history: HistoryConfig::default(),
            notification: NotificationConfig::default(),
            pops: Vec::new(),
        }
    }

    /// 폴링 주기
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poller.interval_secs)
    }

    /// 익스포터 요청 타임아웃
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.poller.fetch_timeout_secs)
    }

    /// 저장소 반영 단계 타임아웃
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.poller.reconcile_timeout_secs)
    }

    /// 웹훅 요청 타임아웃
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.notification.webhook_timeout_secs)
    }

    /// 히스토리 최소 기록 간격
    pub fn history_min_interval(&self) -> Duration {
        Duration::from_secs(self.history.min_interval_secs)
    }

    /// 히스토리 보존 기간
    pub fn history_retention(&self) -> Duration {
        Duration::from_secs(self.history.retention_hours.saturating_mul(3600))
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poller.interval_secs == 0 {
            return Err(invalid("poller.interval_secs", "0보다 커야 합니다"));
        }
        if self.poller.fetch_timeout_secs == 0 {
            return Err(invalid("poller.fetch_timeout_secs", "0보다 커야 합니다"));
        }
        if self.poller.reconcile_timeout_secs == 0 {
            return Err(invalid("poller.reconcile_timeout_secs", "0보다 커야 합니다"));
        }
        if self.poller.max_concurrent_pops == 0 {
            return Err(invalid("poller.max_concurrent_pops", "0보다 커야 합니다"));
        }
        if self.history.min_interval_secs < MIN_HISTORY_INTERVAL_SECS {
            return Err(invalid(
                "history.min_interval_secs",
                &format!("{MIN_HISTORY_INTERVAL_SECS}초 이상이어야 합니다"),
            ));
        }
        if self.history.retention_hours == 0 || self.history.retention_hours > MAX_RETENTION_HOURS {
            return Err(invalid(
                "history.retention_hours",
                &format!("1 ~ {MAX_RETENTION_HOURS} 범위여야 합니다"),
            ));
        }

        let mut seen = HashSet::new();
        for pop in &self.pops {
            if !seen.insert(pop.id) {
                return Err(invalid("pops.id", &format!("중복된 PoP ID: {}", pop.id)));
            }
            if pop.name.trim().is_empty() {
                return Err(invalid("pops.name", &format!("PoP {} 이름이 비어 있습니다", pop.id)));
            }
            validate_http_url("pops.exporter_url", &pop.exporter_url)?;
            if let Some(ref webhook) = pop.webhook_url {
                validate_http_url("pops.webhook_url", webhook)?;
            }
        }
        Ok(())
    }
}

/// http/https URL인지 검증
pub fn validate_http_url(field: &str, raw: &str) -> Result<(), CoreError> {
    let parsed = url::Url::parse(raw).map_err(|e| invalid(field, &format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(field, &format!("지원하지 않는 스킴: {other}"))),
    }
}

fn invalid(field: &str, message: &str) -> CoreError {
    CoreError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_max_redirects() -> usize {
    10
}
fn default_reconcile_timeout_secs() -> u64 {
    30
}
fn default_max_concurrent_pops() -> usize {
    4
}
fn default_min_interval_secs() -> u64 {
    300
}
fn default_retention_hours() -> u64 {
    5
}
fn default_webhook_timeout_secs() -> u64 {
    5
}
fn default_footer_text() -> String {
    "BGP Monitoring".to_string()
}
