//! # bgpwatch-network
//!
//! HTTP 네트워크 어댑터.
//!
//! ## 모듈
//! - `exporter_client`: BIRD 익스포터 메트릭 수집 (MetricsSource 구현)
//! - `webhook`: Discord 호환 웹훅 알림 (AlertNotifier 구현)

pub mod exporter_client;
pub mod webhook;
