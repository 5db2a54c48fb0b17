//! PoP 스토리지 (PopRepository 포트 구현).
//!
//! PoP 인벤토리, 웹훅 설정, 상태 요약.

use async_trait::async_trait;
use bgpwatch_core::error::CoreError;
use bgpwatch_core::models::pop::{Pop, PopStatus, SessionTypeStats};
use bgpwatch_core::ports::store::PopRepository;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

use super::sessions::{session_from_row, sessions_by_pop_sql};
use super::{enum_column, SqliteStorage};

fn pop_from_row(row: &Row<'_>) -> rusqlite::Result<Pop> {
    Ok(Pop {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        exporter_url: row.get(3)?,
        is_active: row.get(4)?,
    })
}

fn find_pop(conn: &Connection, pop_id: i64) -> Result<Option<Pop>, CoreError> {
    conn.query_row(
        "SELECT id, name, location, exporter_url, is_active FROM pops WHERE id = ?1",
        rusqlite::params![pop_id],
        pop_from_row,
    )
    .optional()
    .map_err(|e| CoreError::storage("PoP 조회 실패", e))
}

fn pop_not_found(pop_id: i64) -> CoreError {
    CoreError::NotFound {
        resource_type: "PoP".to_string(),
        id: pop_id.to_string(),
    }
}

#[async_trait]
impl PopRepository for SqliteStorage {
    async fn upsert_pop(&self, pop: &Pop) -> Result<(), CoreError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO pops (id, name, location, exporter_url, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                location = excluded.location,
                exporter_url = excluded.exporter_url,
                is_active = excluded.is_active",
            rusqlite::params![pop.id, pop.name, pop.location, pop.exporter_url, pop.is_active],
        )
        .map_err(|e| CoreError::storage("PoP 저장 실패", e))?;

        Ok(())
    }

    async fn get_pop(&self, pop_id: i64) -> Result<Option<Pop>, CoreError> {
        let conn = self.lock()?;
        find_pop(&conn, pop_id)
    }

    async fn list_active_pops(&self) -> Result<Vec<Pop>, CoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, name, location, exporter_url, is_active
                 FROM pops WHERE is_active = 1 ORDER BY name",
            )
            .map_err(|e| CoreError::storage("쿼리 준비 실패", e))?;

        let pops = stmt
            .query_map([], pop_from_row)
            .map_err(|e| CoreError::storage("PoP 목록 조회 실패", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::storage("PoP 행 변환 실패", e))?;

        Ok(pops)
    }

    async fn set_webhook(&self, pop_id: i64, webhook_url: Option<&str>) -> Result<(), CoreError> {
        let conn = self.lock()?;

        if find_pop(&conn, pop_id)?.is_none() {
            return Err(pop_not_found(pop_id));
        }

        conn.execute(
            "INSERT INTO alert_config (pop_id, discord_webhook_url, alert_on_session_down)
             VALUES (?1, ?2, 1)
             ON CONFLICT(pop_id) DO UPDATE SET
                discord_webhook_url = excluded.discord_webhook_url,
                updated_at = datetime('now')",
            rusqlite::params![pop_id, webhook_url],
        )
        .map_err(|e| CoreError::storage("웹훅 설정 저장 실패", e))?;

        info!(
            pop_id,
            "웹훅 설정 {}",
            if webhook_url.is_some() { "갱신" } else { "해제" }
        );
        Ok(())
    }

    async fn get_webhook(&self, pop_id: i64) -> Result<Option<String>, CoreError> {
        let conn = self.lock()?;

        let url: Option<Option<String>> = conn
            .query_row(
                "SELECT discord_webhook_url FROM alert_config WHERE pop_id = ?1",
                rusqlite::params![pop_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CoreError::storage("웹훅 설정 조회 실패", e))?;

        // 빈 문자열은 미설정과 같다
        Ok(url.flatten().filter(|u| !u.trim().is_empty()))
    }

    async fn pop_status(&self, pop_id: i64) -> Result<PopStatus, CoreError> {
        let conn = self.lock()?;

        let pop = find_pop(&conn, pop_id)?.ok_or_else(|| pop_not_found(pop_id))?;

        let mut stmt = conn
            .prepare(
                "SELECT
                    session_type,
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN last_status = 'online' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN last_status = 'offline' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(prefixes_imported), 0),
                    COALESCE(SUM(prefixes_exported), 0)
                 FROM bgp_sessions
                 WHERE pop_id = ?1
                 GROUP BY session_type
                 ORDER BY session_type",
            )
            .map_err(|e| CoreError::storage("쿼리 준비 실패", e))?;

        let stats = stmt
            .query_map(rusqlite::params![pop_id], |row| {
                Ok(SessionTypeStats {
                    session_type: enum_column(row, 0)?,
                    total: row.get::<_, i64>(1)? as u64,
                    online: row.get::<_, i64>(2)? as u64,
                    offline: row.get::<_, i64>(3)? as u64,
                    prefixes_in: row.get(4)?,
                    prefixes_out: row.get(5)?,
                })
            })
            .map_err(|e| CoreError::storage("세션 통계 조회 실패", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::storage("세션 통계 행 변환 실패", e))?;

        let mut stmt = conn
            .prepare(&sessions_by_pop_sql())
            .map_err(|e| CoreError::storage("쿼리 준비 실패", e))?;

        let sessions = stmt
            .query_map(rusqlite::params![pop_id], session_from_row)
            .map_err(|e| CoreError::storage("세션 목록 조회 실패", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::storage("세션 행 변환 실패", e))?;

        Ok(PopStatus {
            pop,
            stats,
            sessions,
        })
    }
}
