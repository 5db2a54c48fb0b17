//! 세션 스토리지 (SessionStore 포트 구현).
//!
//! 세션 인벤토리, 세션 히스토리, 알림 상태 추적.

use async_trait::async_trait;
use bgpwatch_core::error::CoreError;
use bgpwatch_core::models::history::{HistoryPoint, StatusTracking};
use bgpwatch_core::models::session::BgpSession;
use bgpwatch_core::ports::store::SessionStore;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use tracing::debug;

use super::{enum_column, fmt_ts, opt_ts_column, ts_column, SqliteStorage};

const SESSION_COLUMNS: &str = "id, pop_id, session_type, peer_name, peer_ip, peer_asn, last_status, prefixes_imported, prefixes_exported, last_check";

/// `SESSION_COLUMNS` 순서의 행을 세션으로 변환
pub(super) fn session_from_row(row: &Row<'_>) -> rusqlite::Result<BgpSession> {
    Ok(BgpSession {
        id: row.get(0)?,
        pop_id: row.get(1)?,
        session_type: enum_column(row, 2)?,
        peer_name: row.get(3)?,
        peer_ip: row.get(4)?,
        peer_asn: row.get(5)?,
        last_status: enum_column(row, 6)?,
        prefixes_imported: row.get(7)?,
        prefixes_exported: row.get(8)?,
        last_check: ts_column(row, 9)?,
    })
}

/// 세션 목록 조회 쿼리 (분류, 피어 이름 순)
pub(super) fn sessions_by_pop_sql() -> String {
    format!(
        "SELECT {SESSION_COLUMNS} FROM bgp_sessions WHERE pop_id = ?1 ORDER BY session_type, peer_name"
    )
}

#[async_trait]
impl SessionStore for SqliteStorage {
    // --------------------------------------------------------
    // 세션
    // --------------------------------------------------------

    async fn find_session(
        &self,
        pop_id: i64,
        peer_name: &str,
        peer_asn: u32,
    ) -> Result<Option<BgpSession>, CoreError> {
        let conn = self.lock()?;

        conn.query_row(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM bgp_sessions
                 WHERE pop_id = ?1 AND peer_name = ?2 AND peer_asn = ?3"
            ),
            rusqlite::params![pop_id, peer_name, peer_asn],
            session_from_row,
        )
        .optional()
        .map_err(|e| CoreError::storage("세션 조회 실패", e))
    }

    async fn upsert_session(&self, session: &BgpSession) -> Result<i64, CoreError> {
        let conn = self.lock()?;

        // 분류/피어 주소는 최초 등록 값 유지, last_check는 뒤로 가지 않음
        let id: i64 = conn
            .query_row(
                "INSERT INTO bgp_sessions
                    (pop_id, session_type, peer_name, peer_ip, peer_asn, last_status, prefixes_imported, prefixes_exported, last_check)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(pop_id, peer_name, peer_asn) DO UPDATE SET
                    last_status = excluded.last_status,
                    prefixes_imported = excluded.prefixes_imported,
                    prefixes_exported = excluded.prefixes_exported,
                    last_check = MAX(bgp_sessions.last_check, excluded.last_check)
                 RETURNING id",
                rusqlite::params![
                    session.pop_id,
                    session.session_type.as_str(),
                    session.peer_name,
                    session.peer_ip,
                    session.peer_asn,
                    session.last_status.as_str(),
                    session.prefixes_imported,
                    session.prefixes_exported,
                    fmt_ts(session.last_check),
                ],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::storage("세션 저장 실패", e))?;

        debug!(
            "세션 저장: {} (AS{}) → {}",
            session.peer_name, session.peer_asn, session.last_status
        );
        Ok(id)
    }

    async fn list_sessions(&self, pop_id: i64) -> Result<Vec<BgpSession>, CoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(&sessions_by_pop_sql())
            .map_err(|e| CoreError::storage("쿼리 준비 실패", e))?;

        let sessions = stmt
            .query_map(rusqlite::params![pop_id], session_from_row)
            .map_err(|e| CoreError::storage("세션 목록 조회 실패", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::storage("세션 행 변환 실패", e))?;

        Ok(sessions)
    }

    // --------------------------------------------------------
    // 히스토리
    // --------------------------------------------------------

    async fn last_history_timestamp(
        &self,
        session_id: i64,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT recorded_at FROM session_history
             WHERE session_id = ?1
             ORDER BY recorded_at DESC
             LIMIT 1",
            rusqlite::params![session_id],
            |row| ts_column(row, 0),
        )
        .optional()
        .map_err(|e| CoreError::storage("마지막 히스토리 조회 실패", e))
    }

    async fn append_history(&self, point: &HistoryPoint) -> Result<(), CoreError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO session_history (session_id, status, prefixes_imported, prefixes_exported, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                point.session_id,
                point.status.as_str(),
                point.prefixes_imported,
                point.prefixes_exported,
                fmt_ts(point.recorded_at),
            ],
        )
        .map_err(|e| CoreError::storage("히스토리 저장 실패", e))?;

        Ok(())
    }

    async fn prune_history_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CoreError> {
        let conn = self.lock()?;

        let removed = conn
            .execute(
                "DELETE FROM session_history WHERE recorded_at < ?1",
                rusqlite::params![fmt_ts(cutoff)],
            )
            .map_err(|e| CoreError::storage("히스토리 정리 실패", e))?;

        Ok(removed)
    }

    async fn history_since(
        &self,
        session_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, CoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                "SELECT session_id, status, prefixes_imported, prefixes_exported, recorded_at
                 FROM session_history
                 WHERE session_id = ?1 AND recorded_at >= ?2
                 ORDER BY recorded_at ASC",
            )
            .map_err(|e| CoreError::storage("쿼리 준비 실패", e))?;

        let points = stmt
            .query_map(rusqlite::params![session_id, fmt_ts(since)], |row| {
                Ok(HistoryPoint {
                    session_id: row.get(0)?,
                    status: enum_column(row, 1)?,
                    prefixes_imported: row.get(2)?,
                    prefixes_exported: row.get(3)?,
                    recorded_at: ts_column(row, 4)?,
                })
            })
            .map_err(|e| CoreError::storage("히스토리 조회 실패", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::storage("히스토리 행 변환 실패", e))?;

        Ok(points)
    }

    // --------------------------------------------------------
    // 알림 상태 추적
    // --------------------------------------------------------

    async fn get_tracking(&self, session_id: i64) -> Result<Option<StatusTracking>, CoreError> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT session_id, last_known_status, last_notification_sent
             FROM session_state_tracking WHERE session_id = ?1",
            rusqlite::params![session_id],
            |row| {
                Ok(StatusTracking {
                    session_id: row.get(0)?,
                    last_known_status: enum_column(row, 1)?,
                    last_notification_sent: opt_ts_column(row, 2)?,
                })
            },
        )
        .optional()
        .map_err(|e| CoreError::storage("상태 추적 조회 실패", e))
    }

    async fn upsert_tracking(&self, tracking: &StatusTracking) -> Result<(), CoreError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO session_state_tracking (session_id, last_known_status, last_notification_sent)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET
                last_known_status = excluded.last_known_status,
                last_notification_sent = excluded.last_notification_sent",
            rusqlite::params![
                tracking.session_id,
                tracking.last_known_status.as_str(),
                tracking.last_notification_sent.map(fmt_ts),
            ],
        )
        .map_err(|e| CoreError::storage("상태 추적 저장 실패", e))?;

        Ok(())
    }
}
