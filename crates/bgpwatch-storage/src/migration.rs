//! 스키마 마이그레이션.
//!
//! 버전 기반 SQLite 스키마 관리.

use rusqlite::Connection;
use tracing::{debug, info};

/// 현재 스키마 버전
const CURRENT_VERSION: u32 = 3;

/// 스키마 마이그레이션 실행
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    // schema_version 테이블 생성
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = get_version(conn)?;
    info!("현재 스키마 버전: {current}, 목표: {CURRENT_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    if current < 2 {
        migrate_v2(conn)?;
    }

    if current < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// 현재 스키마 버전 조회
pub fn get_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    let result: Result<u32, _> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );
    result.or(Ok(0))
}

/// V1: pops + bgp_sessions 테이블 생성
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V1 실행: pops + bgp_sessions 테이블");

    conn.execute_batch(
        "
        -- 관측 지점
        CREATE TABLE IF NOT EXISTS pops (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT NOT NULL DEFAULT '',
            exporter_url TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 세션 인벤토리 (식별자: pop_id + peer_name + peer_asn)
        CREATE TABLE IF NOT EXISTS bgp_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pop_id INTEGER NOT NULL REFERENCES pops(id) ON DELETE CASCADE,
            session_type TEXT NOT NULL,
            peer_name TEXT NOT NULL,
            peer_ip TEXT NOT NULL,
            peer_asn INTEGER NOT NULL,
            last_status TEXT NOT NULL DEFAULT 'unknown',
            prefixes_imported INTEGER NOT NULL DEFAULT 0,
            prefixes_exported INTEGER NOT NULL DEFAULT 0,
            last_check TEXT NOT NULL,
            UNIQUE(pop_id, peer_name, peer_asn)
        );

        CREATE INDEX IF NOT EXISTS idx_bgp_sessions_pop ON bgp_sessions(pop_id, session_type, peer_name);

        -- 버전 기록
        INSERT INTO schema_version (version) VALUES (1);
        ",
    )?;

    info!("마이그레이션 V1 완료");
    Ok(())
}

/// V2: session_history 테이블 생성
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V2 실행: session_history 테이블");

    conn.execute_batch(
        "
        -- 세션 시계열 (추가 전용, 보존 기간 후 삭제)
        CREATE TABLE IF NOT EXISTS session_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL REFERENCES bgp_sessions(id) ON DELETE CASCADE,
            status TEXT NOT NULL,
            prefixes_imported INTEGER NOT NULL DEFAULT 0,
            prefixes_exported INTEGER NOT NULL DEFAULT 0,
            recorded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_session_history_session ON session_history(session_id, recorded_at);
        CREATE INDEX IF NOT EXISTS idx_session_history_recorded ON session_history(recorded_at);

        -- 버전 기록
        INSERT INTO schema_version (version) VALUES (2);
        ",
    )?;

    info!("마이그레이션 V2 완료");
    Ok(())
}

/// V3: alert_config + session_state_tracking 테이블 생성
fn migrate_v3(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V3 실행: 알림 설정 + 상태 추적 테이블");

    conn.execute_batch(
        "
        -- PoP별 웹훅 설정
        CREATE TABLE IF NOT EXISTS alert_config (
            pop_id INTEGER PRIMARY KEY REFERENCES pops(id) ON DELETE CASCADE,
            discord_webhook_url TEXT,
            alert_on_session_down INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 세션별 마지막 알림 상태
        CREATE TABLE IF NOT EXISTS session_state_tracking (
            session_id INTEGER PRIMARY KEY REFERENCES bgp_sessions(id) ON DELETE CASCADE,
            last_known_status TEXT NOT NULL,
            last_notification_sent TEXT
        );

        -- 버전 기록
        INSERT INTO schema_version (version) VALUES (3);
        ",
    )?;

    info!("마이그레이션 V3 완료");
    Ok(())
}
