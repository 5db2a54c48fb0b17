//! 세션 집계기.
//!
//! 익스포터는 논리 세션 하나에 대해 여러 메트릭 패밀리를 따로 내보낸다.
//! 어느 하나도 단독으로 완전하지 않으므로, 레코드를 순서대로 읽으며
//! 세션 키별 누산기에 마지막 값 우선(last-write-wins)으로 접어 넣는다.
//! 폴링 간 상태는 없다.

use std::collections::BTreeMap;

use bgpwatch_core::models::metric::MetricRecord;
use bgpwatch_core::models::session::{
    snapshot_key, SessionSnapshot, SessionStatus, DEFAULT_IP_VERSION, UNKNOWN_PEER_IP,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// 세션 상태 메트릭
pub const METRIC_PROTOCOL_UP: &str = "bird_protocol_up";
/// 수신 프리픽스 수 메트릭
pub const METRIC_PREFIX_IMPORT: &str = "bird_protocol_prefix_import_count";
/// 송신 프리픽스 수 메트릭
pub const METRIC_PREFIX_EXPORT: &str = "bird_protocol_prefix_export_count";

/// 집계 대상 프로토콜
const BGP_PROTO: &str = "BGP";

static ASN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AS(\d+)").expect("ASN 정규식 컴파일 실패"));

/// 프로토콜 이름에서 첫 번째 `AS<숫자>`를 추출 (없거나 범위 밖이면 0)
///
/// `AS214757_UP_AS214757_v6` → 214757
pub fn extract_asn(protocol_name: &str) -> u32 {
    ASN_RE
        .captures(protocol_name)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// 레코드 목록을 세션 키 → 스냅샷 맵으로 집계
pub fn aggregate(records: &[MetricRecord]) -> BTreeMap<String, SessionSnapshot> {
    let mut sessions = BTreeMap::new();
    for record in records {
        fold_record(&mut sessions, record);
    }
    sessions
}

/// 레코드 하나를 누산기에 반영
fn fold_record(sessions: &mut BTreeMap<String, SessionSnapshot>, record: &MetricRecord) {
    if record.label("proto") != Some(BGP_PROTO) {
        return;
    }
    let Some(protocol_name) = record.label("name") else {
        return;
    };

    let ip_version = record.label("ip_version").unwrap_or(DEFAULT_IP_VERSION);
    let key = snapshot_key(protocol_name, ip_version);

    let snapshot = sessions.entry(key).or_insert_with(|| SessionSnapshot {
        protocol_name: protocol_name.to_string(),
        ip_version: ip_version.to_string(),
        peer_ip: UNKNOWN_PEER_IP.to_string(),
        peer_asn: extract_asn(protocol_name),
        status: SessionStatus::Unknown,
        prefixes_in: 0,
        prefixes_out: 0,
        exporter_state: record.label("state").unwrap_or_default().to_string(),
    });

    // neighbor가 peer_ip보다 나중에 적용된다
    if let Some(peer_ip) = record.label("peer_ip") {
        snapshot.peer_ip = peer_ip.to_string();
    }
    if let Some(neighbor) = record.label("neighbor") {
        snapshot.peer_ip = neighbor.to_string();
    }

    // 주소 체계 레이블이 스냅샷과 다르거나 없으면 값 메트릭은 반영하지 않는다
    if record.label("ip_version") != Some(snapshot.ip_version.as_str()) {
        return;
    }

    match record.name.as_str() {
        METRIC_PROTOCOL_UP => {
            snapshot.status = if record.value == 1.0 {
                SessionStatus::Online
            } else {
                SessionStatus::Offline
            };
            if let Some(state) = record.label("state") {
                snapshot.exporter_state = state.to_string();
            }
        }
        METRIC_PREFIX_IMPORT => snapshot.prefixes_in = truncate_count(record.value),
        METRIC_PREFIX_EXPORT => snapshot.prefixes_out = truncate_count(record.value),
        _ => {}
    }
}

/// 소수점 이하 버림 (범위 밖은 포화)
fn truncate_count(value: f64) -> i64 {
    value.trunc() as i64
}
