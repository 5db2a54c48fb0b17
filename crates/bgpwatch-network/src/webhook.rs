//! Discord 호환 웹훅 알림.
//!
//! `AlertNotifier` 포트 구현. 알림 하나를 임베드 하나로 보낸다.
//! 재시도하지 않는다.

use std::time::Duration;

use async_trait::async_trait;
use bgpwatch_core::error::CoreError;
use bgpwatch_core::models::notification::{Notification, Severity};
use bgpwatch_core::ports::notifier::AlertNotifier;
use chrono::SecondsFormat;
use serde::Serialize;
use tracing::{debug, warn};

/// 다운 알림 색상 (빨강)
pub const COLOR_DOWN: u32 = 15_158_332;
/// 복구 알림 색상 (초록)
pub const COLOR_UP: u32 = 3_066_993;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    embeds: [Embed<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    description: &'a str,
    color: u32,
    fields: Vec<EmbedField<'a>>,
    timestamp: String,
    footer: EmbedFooter<'a>,
}

#[derive(Debug, Serialize)]
struct EmbedField<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter<'a> {
    text: &'a str,
}

/// 알림 → 웹훅 본문
fn build_payload<'a>(notification: &'a Notification, footer_text: &'a str) -> WebhookPayload<'a> {
    let color = match notification.severity {
        Severity::Down => COLOR_DOWN,
        Severity::Up => COLOR_UP,
    };

    WebhookPayload {
        embeds: [Embed {
            title: &notification.title,
            description: &notification.description,
            color,
            fields: notification
                .fields
                .iter()
                .map(|f| EmbedField {
                    name: &f.name,
                    value: &f.value,
                    inline: f.inline,
                })
                .collect(),
            timestamp: notification
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            footer: EmbedFooter { text: footer_text },
        }],
    }
}

/// Discord 웹훅 알림기 — `AlertNotifier` 포트 구현
pub struct DiscordWebhookNotifier {
    client: reqwest::Client,
    footer_text: String,
}

impl DiscordWebhookNotifier {
    /// 새 웹훅 알림기 생성
    pub fn new(timeout: Duration, footer_text: impl Into<String>) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            footer_text: footer_text.into(),
        })
    }
}

#[async_trait]
impl AlertNotifier for DiscordWebhookNotifier {
    async fn notify(&self, webhook_url: &str, notification: &Notification) -> Result<(), CoreError> {
        let payload = build_payload(notification, &self.footer_text);

        let resp = self
            .client
            .post(webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("웹훅 요청 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_else(|e| {
                warn!("응답 본문 읽기 실패: {e}");
                String::new()
            });
            return Err(CoreError::Network(format!("웹훅 거부 ({status}): {text}")));
        }

        debug!("웹훅 전송 완료: {}", notification.title);
        Ok(())
    }
}
