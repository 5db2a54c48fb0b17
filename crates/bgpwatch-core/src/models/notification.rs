//! 세션 상태 전이 알림 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 알림 심각도 (전이 방향)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 복구
    Up,
    /// 다운
    Down,
}

/// 알림 필드 (표시 순서 유지)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl NotificationField {
    /// 인라인 필드 생성
    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }
}

/// 웹훅으로 전달되는 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// 제목
    pub title: String,
    /// 본문
    pub description: String,
    /// 전이 방향
    pub severity: Severity,
    /// 부가 필드
    pub fields: Vec<NotificationField>,
    /// 전이 감지 시각
    pub timestamp: DateTime<Utc>,
}
