//! 메트릭 수집 포트.
//!
//! 구현: `bgpwatch-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;

/// 익스포터 텍스트 수집 인터페이스
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// 익스포터 URL에서 노출 포맷 텍스트를 가져온다.
    ///
    /// 연결 실패, 200 이외 응답, 빈 본문은 `CoreError::Fetch`.
    async fn fetch(&self, url: &str) -> Result<String, CoreError>;
}
