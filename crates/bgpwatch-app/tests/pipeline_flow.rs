//! 폴링 파이프라인 통합 테스트.
//!
//! 익스포터(mockito) → 파싱/집계 → SQLite 반영 → 상태 전이 → 웹훅(mockito).

use std::sync::Arc;
use std::time::Duration;

use bgpwatch_core::error::CoreError;
use bgpwatch_core::models::pop::{Pop, PopTarget};
use bgpwatch_core::models::session::{SessionStatus, SessionType};
use bgpwatch_core::ports::store::{PopRepository, SessionStore};
use bgpwatch_engine::alerting::AlertStateMachine;
use bgpwatch_engine::poller::{Poller, PollerSettings};
use bgpwatch_engine::reconciler::{HistoryPolicy, Reconciler};
use bgpwatch_network::exporter_client::ExporterClient;
use bgpwatch_network::webhook::DiscordWebhookNotifier;
use bgpwatch_storage::sqlite::SqliteStorage;
use chrono::Utc;

fn exposition(up: u8) -> String {
    format!(
        r#"# HELP bird_protocol_up Protocol is up
# TYPE bird_protocol_up gauge
bird_protocol_up{{name="AS214757_UP_AS214757_v6",proto="BGP",import_filter="ACCEPT",export_filter="ACCEPT",ip_version="6",neighbor="2001:db8::1"}} {up}
bird_protocol_prefix_import_count{{name="AS214757_UP_AS214757_v6",proto="BGP",ip_version="6"}} 1024
bird_protocol_prefix_export_count{{name="AS214757_UP_AS214757_v6",proto="BGP",ip_version="6"}} 3
bird_protocol_up{{name="DECIX_RS1_v4",proto="BGP",ip_version="4",neighbor="80.81.192.157"}} 1
bird_protocol_up{{name="kernel1",proto="Kernel",ip_version="4"}} 1
"#
    )
}

fn build_poller(storage: &Arc<SqliteStorage>) -> Poller {
    let store: Arc<dyn SessionStore> = storage.clone();
    let source = Arc::new(ExporterClient::new(Duration::from_secs(5), 10).unwrap());
    let notifier =
        Arc::new(DiscordWebhookNotifier::new(Duration::from_secs(5), "BGP Monitoring").unwrap());

    Poller::new(
        source,
        Arc::new(Reconciler::new(store.clone(), HistoryPolicy::default())),
        Arc::new(AlertStateMachine::new(store, notifier, true)),
        PollerSettings::default(),
    )
}

async fn seed_pop(storage: &SqliteStorage, exporter_url: String) -> Pop {
    let pop = Pop {
        id: 1,
        name: "FRA1".to_string(),
        location: "Frankfurt, DE".to_string(),
        exporter_url,
        is_active: true,
    };
    storage.upsert_pop(&pop).await.unwrap();
    pop
}

#[tokio::test]
async fn discovery_then_transition_sends_single_down_alert() {
    let mut server = mockito::Server::new_async().await;
    let exporter_up = server
        .mock("GET", "/metrics")
        .with_status(200)
        .with_body(exposition(1))
        .create_async()
        .await;
    let webhook = server
        .mock("POST", "/hook")
        .match_body(mockito::Matcher::Regex("BGP Session DOWN".to_string()))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let pop = seed_pop(&storage, format!("{}/metrics", server.url())).await;
    let hook_url = format!("{}/hook", server.url());
    storage.set_webhook(1, Some(hook_url.as_str())).await.unwrap();
    let target = PopTarget {
        pop,
        webhook_url: storage.get_webhook(1).await.unwrap(),
    };
    let poller = build_poller(&storage);

    // 1차: 자동 발견, 알림 없음
    let first = poller.poll(&target).await.unwrap();
    assert_eq!(first.snapshots, 2);
    assert_eq!(first.reconcile.discovered, 2);
    assert_eq!(first.alerts.initialized, 2);
    assert_eq!(first.alerts.transitions, 0);

    // 2차: 업스트림 세션 다운
    exporter_up.remove_async().await;
    let _exporter_down = server
        .mock("GET", "/metrics")
        .with_status(200)
        .with_body(exposition(0))
        .create_async()
        .await;

    let second = poller.poll(&target).await.unwrap();
    assert_eq!(second.reconcile.updated, 2);
    assert_eq!(second.reconcile.discovered, 0);
    assert_eq!(second.alerts.transitions, 1);
    assert_eq!(second.alerts.delivered, 1);

    // 3차: 상태 동일, 재알림 없음
    let third = poller.poll(&target).await.unwrap();
    assert_eq!(third.alerts.transitions, 0);
    webhook.assert_async().await;

    let status = storage.pop_status(1).await.unwrap();
    let upstream = status
        .sessions
        .iter()
        .find(|s| s.peer_name == "AS214757_UP_AS214757_v6")
        .unwrap();
    assert_eq!(upstream.session_type, SessionType::Upstream);
    assert_eq!(upstream.peer_asn, 214757);
    assert_eq!(upstream.peer_ip, "2001:db8::1");
    assert_eq!(upstream.last_status, SessionStatus::Offline);
    assert_eq!(upstream.prefixes_imported, 1024);

    let peering = status
        .sessions
        .iter()
        .find(|s| s.peer_name == "DECIX_RS1_v4")
        .unwrap();
    assert_eq!(peering.session_type, SessionType::Peering);

    // 발견 시에는 기록 없음, 첫 갱신에서 1건, 최소 간격 내 반복은 생략
    let history = storage
        .history_since(upstream.id, Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, SessionStatus::Offline);
}

#[tokio::test]
async fn exporter_failure_leaves_inventory_untouched() {
    let mut server = mockito::Server::new_async().await;
    let _exporter = server
        .mock("GET", "/metrics")
        .with_status(500)
        .create_async()
        .await;

    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let pop = seed_pop(&storage, format!("{}/metrics", server.url())).await;
    let poller = build_poller(&storage);

    let err = poller
        .poll(&PopTarget {
            pop,
            webhook_url: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Fetch { status: Some(500), .. }));
    assert!(storage.list_sessions(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn webhook_failure_does_not_replay_transition() {
    let mut server = mockito::Server::new_async().await;
    let exporter_up = server
        .mock("GET", "/metrics")
        .with_status(200)
        .with_body(exposition(1))
        .create_async()
        .await;
    let webhook = server
        .mock("POST", "/hook")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let pop = seed_pop(&storage, format!("{}/metrics", server.url())).await;
    let target = PopTarget {
        pop,
        webhook_url: Some(format!("{}/hook", server.url())),
    };
    let poller = build_poller(&storage);
    poller.poll(&target).await.unwrap();

    exporter_up.remove_async().await;
    let _exporter_down = server
        .mock("GET", "/metrics")
        .with_status(200)
        .with_body(exposition(0))
        .create_async()
        .await;

    let report = poller.poll(&target).await.unwrap();
    assert_eq!(report.alerts.delivery_failed, 1);

    let report = poller.poll(&target).await.unwrap();
    assert_eq!(report.alerts.transitions, 0);
    webhook.assert_async().await;
}
