//! 설정 및 DI 와이어링 통합 테스트.
//!
//! 설정 파일 → AppConfig → 어댑터 생성 검증.

use std::sync::Arc;

use bgpwatch_core::config::AppConfig;
use bgpwatch_core::config_manager::ConfigManager;
use bgpwatch_core::error::CoreError;
use bgpwatch_core::ports::store::SessionStore;
use bgpwatch_engine::alerting::AlertStateMachine;
use bgpwatch_engine::poller::{Poller, PollerSettings};
use bgpwatch_engine::reconciler::{HistoryPolicy, Reconciler};
use bgpwatch_network::exporter_client::ExporterClient;
use bgpwatch_network::webhook::DiscordWebhookNotifier;
use bgpwatch_storage::sqlite::SqliteStorage;
use tempfile::TempDir;

const CONFIG_JSON: &str = r#"{
  "poller": { "interval_secs": 30, "max_concurrent_pops": 2 },
  "history": { "retention_hours": 6 },
  "notification": { "footer_text": "NOC" },
  "pops": [
    {
      "id": 1,
      "name": "FRA1",
      "location": "Frankfurt, DE",
      "exporter_url": "http://10.0.0.1:9324/metrics",
      "webhook_url": "https://discord.com/api/webhooks/1/abc"
    },
    {
      "id": 2,
      "name": "AMS1",
      "exporter_url": "http://10.0.0.2:9324/metrics",
      "is_active": false
    }
  ]
}"#;

#[test]
fn config_defaults_are_valid() {
    let config = AppConfig::default_config();
    config.validate().unwrap();

    assert_eq!(config.poller.interval_secs, 60);
    assert!(config.poller.fetch_timeout_secs < config.poller.interval_secs);
    assert_eq!(config.history.min_interval_secs, 300);
    assert_eq!(config.history.retention_hours, 5);
    assert_eq!(config.notification.footer_text, "BGP Monitoring");
    assert!(config.pops.is_empty());
}

#[test]
fn config_file_loads_with_partial_sections() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, CONFIG_JSON).unwrap();

    let config = ConfigManager::with_path(path).unwrap().get();

    assert_eq!(config.poller.interval_secs, 30);
    assert_eq!(config.poller.fetch_timeout_secs, 10);
    assert_eq!(config.history.retention_hours, 6);
    assert_eq!(config.notification.footer_text, "NOC");
    assert_eq!(config.pops.len(), 2);
    assert!(config.pops[0].is_active);
    assert!(!config.pops[1].is_active);
    assert_eq!(config.pops[1].location, "");
}

#[test]
fn config_with_bad_exporter_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "pops": [ { "id": 1, "name": "FRA1", "exporter_url": "ftp://10.0.0.1/metrics" } ] }"#,
    )
    .unwrap();

    assert!(matches!(
        ConfigManager::with_path(path),
        Err(CoreError::Validation { .. })
    ));
}

#[test]
fn all_adapters_instantiate_from_config() {
    let config = AppConfig::default_config();

    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let store: Arc<dyn SessionStore> = storage;
    let source =
        Arc::new(ExporterClient::new(config.fetch_timeout(), config.poller.max_redirects).unwrap());
    let notifier = Arc::new(
        DiscordWebhookNotifier::new(
            config.webhook_timeout(),
            config.notification.footer_text.clone(),
        )
        .unwrap(),
    );

    let policy = HistoryPolicy::from_std(config.history_min_interval(), config.history_retention());
    assert_eq!(policy, HistoryPolicy::default());

    let _poller = Poller::new(
        source,
        Arc::new(Reconciler::new(store.clone(), policy)),
        Arc::new(AlertStateMachine::new(store, notifier, config.notification.enabled)),
        PollerSettings {
            fetch_timeout: config.fetch_timeout(),
            reconcile_timeout: config.reconcile_timeout(),
        },
    );
}

#[test]
fn file_backed_storage_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bgpwatch.db");

    drop(SqliteStorage::open(&path).unwrap());
    SqliteStorage::open(&path).unwrap();
}
