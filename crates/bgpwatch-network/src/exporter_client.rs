//! BIRD 익스포터 HTTP 클라이언트.
//!
//! `MetricsSource` 포트 구현. 리다이렉트를 제한된 횟수만큼 따라가고,
//! 200 이외의 응답이나 빈 본문은 수집 실패로 본다.

use std::time::Duration;

use async_trait::async_trait;
use bgpwatch_core::error::CoreError;
use bgpwatch_core::ports::exporter::MetricsSource;
use tracing::{debug, warn};

/// 익스포터 클라이언트 — `MetricsSource` 포트 구현
pub struct ExporterClient {
    client: reqwest::Client,
}

impl ExporterClient {
    /// 새 익스포터 클라이언트 생성
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self { client })
    }
}

fn fetch_error(status: Option<u16>, message: String) -> CoreError {
    CoreError::Fetch { status, message }
}

#[async_trait]
impl MetricsSource for ExporterClient {
    async fn fetch(&self, url: &str) -> Result<String, CoreError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            warn!("익스포터 요청 실패 {url}: {e}");
            let reason = if e.is_timeout() {
                "응답 시간 초과"
            } else if e.is_redirect() {
                "리다이렉트 한도 초과"
            } else {
                "연결 실패"
            };
            fetch_error(e.status().map(|s| s.as_u16()), format!("{reason}: {e}"))
        })?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            warn!("익스포터 응답 코드 {status}: {url}");
            return Err(fetch_error(
                Some(status.as_u16()),
                format!("예상하지 못한 응답 코드: {status}"),
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| fetch_error(Some(status.as_u16()), format!("본문 읽기 실패: {e}")))?;

        if body.trim().is_empty() {
            return Err(fetch_error(Some(status.as_u16()), "빈 응답 본문".to_string()));
        }

        debug!("익스포터 응답 수신: {url} ({} bytes)", body.len());
        Ok(body)
    }
}
