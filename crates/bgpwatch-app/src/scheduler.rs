//! 주기 폴링 스케줄러.
//!
//! `poller.interval_secs`마다 활성 PoP 전체를 폴링한다.
//! 동시 폴링 수는 `poller.max_concurrent_pops`로 제한한다.

use std::sync::Arc;
use std::time::Duration;

use bgpwatch_core::ports::store::PopRepository;
use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::context::AppContext;

/// 폴링 라운드 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// 주기 폴링 스케줄러
pub struct PollScheduler {
    ctx: Arc<AppContext>,
    interval: Duration,
    max_concurrent: usize,
}

impl PollScheduler {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let interval = ctx.config.poll_interval();
        let max_concurrent = ctx.config.poller.max_concurrent_pops.max(1);
        Self {
            ctx,
            interval,
            max_concurrent,
        }
    }

    /// 종료 신호까지 폴링 루프 실행
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "폴링 루프 시작: 주기 {}초, 동시 {}개",
            self.interval.as_secs(),
            self.max_concurrent
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.poll_all().await;
                    debug!("폴링 라운드 완료: 성공 {}, 실패 {}", summary.succeeded, summary.failed);
                }
                _ = shutdown_rx.changed() => {
                    info!("폴링 루프 종료");
                    break;
                }
            }
        }
    }

    /// 활성 PoP 전체를 한 번 폴링
    pub async fn poll_all(&self) -> RoundSummary {
        let pops = match self.ctx.storage.list_active_pops().await {
            Ok(pops) => pops,
            Err(e) => {
                warn!("활성 PoP 조회 실패: {e}");
                return RoundSummary::default();
            }
        };

        let results: Vec<bool> = stream::iter(pops)
            .map(|pop| {
                let ctx = self.ctx.clone();
                async move {
                    let name = pop.name.clone();
                    let outcome = match ctx.target_for(pop).await {
                        Ok(target) => ctx.poller.poll(&target).await,
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(_) => true,
                        Err(e) => {
                            warn!("PoP {name} 폴링 실패: {e}");
                            false
                        }
                    }
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let succeeded = results.iter().filter(|ok| **ok).count();
        RoundSummary {
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}
