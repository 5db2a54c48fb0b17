//! bgpwatch 진입점.
//!
//! BIRD 익스포터를 주기적으로 폴링해 BGP 세션 인벤토리를 유지하고,
//! 세션 상태 전이를 웹훅으로 알린다.

mod context;
mod lifecycle;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use bgpwatch_core::config::validate_http_url;
use bgpwatch_core::config_manager::ConfigManager;
use bgpwatch_core::ports::store::{PopRepository, SessionStore};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::context::AppContext;
use crate::lifecycle::LifecycleManager;
use crate::scheduler::PollScheduler;

/// DB 파일 이름
const DB_FILE_NAME: &str = "bgpwatch.db";

#[derive(Parser, Debug)]
#[command(name = "bgpwatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// 데이터 저장 경로 (설정 파일의 storage.db_path보다 우선)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 활성 PoP 전체를 주기적으로 폴링 (SIGINT/SIGTERM까지)
    Run,
    /// PoP 한 번 폴링 후 결과 출력
    Poll {
        #[arg(long)]
        pop: i64,
    },
    /// 활성 PoP 목록
    Pops,
    /// PoP 세션 요약
    Status {
        #[arg(long)]
        pop: i64,
    },
    /// 세션 히스토리
    History {
        #[arg(long)]
        session: i64,
        /// 조회 기간 (시간)
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
    /// PoP 웹훅 조회/설정
    Webhook {
        #[arg(long)]
        pop: i64,
        /// 새 웹훅 URL
        #[arg(long, conflicts_with = "clear")]
        set: Option<String>,
        /// 웹훅 해제
        #[arg(long)]
        clear: bool,
    },
}

/// 데이터베이스 경로 결정 (CLI 인자 → 설정 파일 → 플랫폼별 기본 경로)
///
/// # 플랫폼별 기본 경로:
/// - macOS: `~/Library/Application Support/io.bgpwatch.bgpwatch/bgpwatch.db`
/// - Windows: `%APPDATA%\bgpwatch\bgpwatch\data\bgpwatch.db`
/// - Linux: `~/.local/share/bgpwatch/bgpwatch.db`
fn resolve_db_path(data_dir: Option<&PathBuf>, configured: Option<&PathBuf>) -> PathBuf {
    data_dir
        .map(|d| d.join(DB_FILE_NAME))
        .or_else(|| configured.cloned())
        .or_else(|| {
            ProjectDirs::from("io", "bgpwatch", "bgpwatch").map(|p| p.data_dir().join(DB_FILE_NAME))
        })
        .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
}

/// `--hours` 조회 구간의 시작 시각 (범위를 벗어나면 에러)
fn history_window_start(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    if hours <= 0 {
        return Err(anyhow!("--hours는 0보다 커야 합니다"));
    }
    Duration::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| anyhow!("--hours 값이 너무 큽니다: {hours}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = &args.log_level;
    let log_filter = format!(
        "bgpwatch={level},bgpwatch_app={level},bgpwatch_core={level},bgpwatch_engine={level},bgpwatch_storage={level},bgpwatch_network={level}"
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    // 설정 로드
    let config_manager = match args.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("설정 로드 실패")?;
    let config = config_manager.get();
    info!("설정 파일: {}", config_manager.config_path().display());

    let db_path = resolve_db_path(args.data_dir.as_ref(), config.storage.db_path.as_ref());
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("데이터 디렉토리 생성 실패: {}", parent.display()))?;
        }
    }

    // ── 어댑터 생성 (DI 와이어링) ──
    let ctx = Arc::new(AppContext::open(config, &db_path).context("저장소 초기화 실패")?);
    ctx.seed_pops().await.context("PoP 반영 실패")?;

    match args.command {
        Command::Run => {
            let lifecycle = LifecycleManager::new();
            let scheduler = PollScheduler::new(ctx.clone());
            let shutdown_rx = lifecycle.subscribe();

            let loop_handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
            lifecycle.wait_for_signal().await;
            loop_handle.await.context("폴링 루프 비정상 종료")?;
            info!("bgpwatch 종료");
        }
        Command::Poll { pop } => {
            let report = ctx.poll_pop(pop).await?;
            print_json(&report)?;
        }
        Command::Pops => {
            let pops = ctx.storage.list_active_pops().await?;
            print_json(&pops)?;
        }
        Command::Status { pop } => {
            let status = ctx.storage.pop_status(pop).await?;
            print_json(&status)?;
        }
        Command::History { session, hours } => {
            let since = history_window_start(Utc::now(), hours)?;
            let points = ctx.storage.history_since(session, since).await?;
            print_json(&points)?;
        }
        Command::Webhook { pop, set, clear } => {
            if let Some(ref url) = set {
                validate_http_url("webhook_url", url)?;
                ctx.storage.set_webhook(pop, Some(url.as_str())).await?;
            } else if clear {
                ctx.storage.set_webhook(pop, None).await?;
            }
            let current = ctx.storage.get_webhook(pop).await?;
            print_json(&serde_json::json!({ "pop_id": pop, "webhook_url": current }))?;
        }
    }

    Ok(())
}
