//! 웹훅 알림 포트.
//!
//! 구현: `bgpwatch-network` crate (Discord 호환 웹훅)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::notification::Notification;

/// 상태 전이 알림 전송 인터페이스
///
/// 재시도하지 않는다. 실패는 호출자가 로그로 남긴다.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// 웹훅 URL로 알림 1건 전송
    async fn notify(&self, webhook_url: &str, notification: &Notification)
        -> Result<(), CoreError>;
}
