//! Standalone mention collector CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use mention_collector::{modules, scheduler, CollectorConfig, CollectorContext};
use mention_core::{init_logging, LogConfig, LogFormat};

#[derive(Parser)]
#[command(name = "mention-collector")]
#[command(about = "Social media ticker mention collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error). 없으면 RUST_LOG 사용
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact). 없으면 LOG_FORMAT 사용
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// 크롤링 사이클 1회 실행
    Crawl {
        /// 특정 서브레딧만 크롤링 (없으면 설정된 전체 소스)
        #[arg(long)]
        source: Option<String>,
    },

    /// NASDAQ 종목 디렉터리 동기화
    SyncInstruments,

    /// 전체 종목 현재가 갱신
    RefreshPrices,

    /// 주식 분할 이력 동기화
    SyncSplits,

    /// 데몬 모드: 모든 작업을 주기적으로 실행
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 로깅 초기화
    let mut log_config = LogConfig::from_env();
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("Mention Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(sources = ?config.feed.sources, "설정 로드 완료");

    // DB 연결 및 컴포넌트 구성
    let ctx = CollectorContext::connect(config)
        .await
        .context("컬렉터 초기화 실패")?;

    // 명령 실행
    match cli.command {
        Commands::Crawl { source } => match source {
            Some(source) => {
                let stats = modules::run_crawl_cycle(&ctx, &source).await?;
                stats.log_summary(&format!("r/{} 크롤링", source));
            }
            None => {
                let stats = modules::run_all_sources(&ctx).await;
                stats.log_summary("전체 소스 크롤링");
            }
        },
        Commands::SyncInstruments => {
            let stats = modules::sync_instruments(&ctx).await?;
            stats.log_summary("종목 동기화");
        }
        Commands::RefreshPrices => {
            let stats = modules::refresh_prices(&ctx).await?;
            stats.log_summary("현재가 갱신");
        }
        Commands::SyncSplits => {
            let stats = modules::sync_splits(&ctx).await?;
            stats.log_summary("분할 이력 동기화");
        }
        Commands::Daemon => {
            let shutdown = CancellationToken::new();

            let signal = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "종료 신호 대기 실패");
                }
                tracing::info!("종료 신호 수신, 데몬 종료 중...");
                signal.cancel();
            });

            scheduler::run_daemon(ctx, shutdown).await;
        }
    }

    tracing::info!("Mention Collector 종료");

    Ok(())
}
