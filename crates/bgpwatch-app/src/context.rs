//! 어댑터 생성 및 의존성 연결.
//!
//! 설정으로부터 저장소, 익스포터 클라이언트, 웹훅 알림기, 엔진을 만들어
//! 하나의 컨텍스트로 묶는다.

use std::path::Path;
use std::sync::Arc;

use bgpwatch_core::config::AppConfig;
use bgpwatch_core::error::CoreError;
use bgpwatch_core::models::pop::{Pop, PopTarget};
use bgpwatch_core::models::report::PollReport;
use bgpwatch_core::ports::exporter::MetricsSource;
use bgpwatch_core::ports::notifier::AlertNotifier;
use bgpwatch_core::ports::store::{PopRepository, SessionStore};
use bgpwatch_engine::alerting::AlertStateMachine;
use bgpwatch_engine::poller::{Poller, PollerSettings};
use bgpwatch_engine::reconciler::{HistoryPolicy, Reconciler};
use bgpwatch_network::exporter_client::ExporterClient;
use bgpwatch_network::webhook::DiscordWebhookNotifier;
use bgpwatch_storage::sqlite::SqliteStorage;
use tracing::{debug, info};

/// 애플리케이션 컨텍스트
pub struct AppContext {
    pub config: AppConfig,
    pub storage: Arc<SqliteStorage>,
    pub poller: Arc<Poller>,
}

impl AppContext {
    /// 파일 기반 저장소로 컨텍스트 생성
    pub fn open(config: AppConfig, db_path: &Path) -> Result<Self, CoreError> {
        let storage = Arc::new(SqliteStorage::open(db_path)?);
        let source: Arc<dyn MetricsSource> = Arc::new(ExporterClient::new(
            config.fetch_timeout(),
            config.poller.max_redirects,
        )?);
        let notifier: Arc<dyn AlertNotifier> = Arc::new(DiscordWebhookNotifier::new(
            config.webhook_timeout(),
            config.notification.footer_text.clone(),
        )?);
        Ok(Self::assemble(config, storage, source, notifier))
    }

    /// 주어진 어댑터로 엔진 조립
    pub fn assemble(
        config: AppConfig,
        storage: Arc<SqliteStorage>,
        source: Arc<dyn MetricsSource>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        let store: Arc<dyn SessionStore> = storage.clone();

        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            HistoryPolicy::from_std(config.history_min_interval(), config.history_retention()),
        ));
        let alerting = Arc::new(AlertStateMachine::new(
            store,
            notifier,
            config.notification.enabled,
        ));
        let poller = Arc::new(Poller::new(
            source,
            reconciler,
            alerting,
            PollerSettings {
                fetch_timeout: config.fetch_timeout(),
                reconcile_timeout: config.reconcile_timeout(),
            },
        ));

        Self {
            config,
            storage,
            poller,
        }
    }

    /// 설정 파일의 PoP 목록을 저장소에 반영
    ///
    /// 웹훅은 저장소에 값이 없을 때만 설정 파일 값으로 채운다.
    pub async fn seed_pops(&self) -> Result<usize, CoreError> {
        for pop in &self.config.pops {
            self.storage.upsert_pop(&pop.to_pop()).await?;

            if let Some(ref webhook) = pop.webhook_url {
                if self.storage.get_webhook(pop.id).await?.is_none() {
                    self.storage.set_webhook(pop.id, Some(webhook.as_str())).await?;
                }
            }
        }

        if !self.config.pops.is_empty() {
            info!("PoP {}개 반영", self.config.pops.len());
        }
        Ok(self.config.pops.len())
    }

    /// 폴링 대상 구성 (웹훅은 매 폴링마다 저장소에서 읽음)
    pub async fn target_for(&self, pop: Pop) -> Result<PopTarget, CoreError> {
        let webhook_url = self.storage.get_webhook(pop.id).await?;
        Ok(PopTarget { pop, webhook_url })
    }

    /// PoP ID로 한 번 폴링
    pub async fn poll_pop(&self, pop_id: i64) -> Result<PollReport, CoreError> {
        let pop = self
            .storage
            .get_pop(pop_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                resource_type: "PoP".to_string(),
                id: pop_id.to_string(),
            })?;

        debug!("PoP 폴링 시작: {} ({})", pop.name, pop.exporter_url);
        let target = self.target_for(pop).await?;
        self.poller.poll(&target).await
    }
}
