//! 데몬 모드 작업 스케줄러.
//!
//! 작업마다 독립된 tokio 태스크를 띄워 첫 실행 지연 후 주기적으로 실행합니다.
//! 모든 태스크는 같은 `CancellationToken`으로 종료됩니다.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use mention_core::{component_span, COMPONENT_SCHEDULER};

use crate::context::CollectorContext;
use crate::modules;
use crate::{CollectionStats, Result};

/// 주기 작업 스케줄.
#[derive(Debug, Clone)]
pub struct JobSchedule {
    /// 작업 이름 (로그용)
    pub name: String,
    /// 첫 실행 지연
    pub offset: Duration,
    /// 실행 주기
    pub interval: Duration,
    /// 1회 실행 제한 시간. 작업이 자체 제한 시간을 가지면 `None`
    pub deadline: Option<Duration>,
}

impl JobSchedule {
    pub fn new(name: impl Into<String>, offset: Duration, interval: Duration) -> Self {
        Self {
            name: name.into(),
            offset,
            interval,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// 작업을 주기적으로 실행하는 태스크를 띄웁니다.
///
/// 실행 중 종료 신호를 받으면 진행 중인 작업은 버려집니다.
/// 이미 저장된 레코드는 유효하므로 다음 실행이 이어서 처리합니다.
pub fn spawn_periodic<F, Fut>(
    schedule: JobSchedule,
    shutdown: CancellationToken,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CollectionStats>> + Send + 'static,
{
    let span = component_span!(COMPONENT_SCHEDULER, job = %schedule.name);
    tokio::spawn(
        async move {
            tracing::info!(
                offset_secs = schedule.offset.as_secs(),
                interval_secs = schedule.interval.as_secs(),
                "작업 등록"
            );

            tokio::select! {
                _ = tokio::time::sleep(schedule.offset) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("첫 실행 전 종료");
                    return;
                }
            }

            let mut ticker = tokio::time::interval(schedule.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.cancelled() => break,
                }

                tokio::select! {
                    outcome = run_once(&schedule, &job) => {
                        match outcome {
                            Ok(stats) => stats.log_summary(&schedule.name),
                            Err(e) => tracing::error!(error = %e, "작업 실패"),
                        }
                    }
                    _ = shutdown.cancelled() => {
                        tracing::info!("종료 신호 수신, 진행 중인 작업 중단");
                        break;
                    }
                }
            }

            tracing::info!("작업 종료");
        }
        .instrument(span),
    )
}

async fn run_once<F, Fut>(schedule: &JobSchedule, job: &F) -> Result<CollectionStats>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<CollectionStats>>,
{
    tracing::info!("작업 시작");
    match schedule.deadline {
        Some(deadline) => tokio::time::timeout(deadline, job())
            .await
            .map_err(|_| crate::CollectorError::Timeout(schedule.name.clone()))?,
        None => job().await,
    }
}

/// 데몬 모드: 모든 작업을 엇갈린 일정으로 실행하고 종료 신호까지 대기합니다.
pub async fn run_daemon(ctx: CollectorContext, shutdown: CancellationToken) {
    let schedule = ctx.config.schedule.clone();
    let mut handles = Vec::new();

    for (index, source) in ctx.config.feed.sources.iter().enumerate() {
        let job = JobSchedule::new(
            format!("r/{} 크롤링", source),
            schedule.crawl_offset(index),
            schedule.crawl_interval(),
        );
        let ctx = ctx.clone();
        let source = source.clone();
        handles.push(spawn_periodic(job, shutdown.clone(), move || {
            let ctx = ctx.clone();
            let source = source.clone();
            async move { modules::run_crawl_cycle(&ctx, &source).await }
        }));
    }

    let job = JobSchedule::new(
        "종목 동기화",
        schedule.instrument_sync_offset(),
        schedule.instrument_sync_interval(),
    )
    .with_deadline(schedule.instrument_sync_deadline());
    handles.push(spawn_periodic(job, shutdown.clone(), {
        let ctx = ctx.clone();
        move || {
            let ctx = ctx.clone();
            async move { modules::sync_instruments(&ctx).await }
        }
    }));

    let job = JobSchedule::new(
        "현재가 갱신",
        schedule.price_refresh_offset(),
        schedule.price_refresh_interval(),
    )
    .with_deadline(schedule.market_job_deadline());
    handles.push(spawn_periodic(job, shutdown.clone(), {
        let ctx = ctx.clone();
        move || {
            let ctx = ctx.clone();
            async move { modules::refresh_prices(&ctx).await }
        }
    }));

    let job = JobSchedule::new(
        "분할 이력 동기화",
        schedule.split_sync_offset(),
        schedule.split_sync_interval(),
    )
    .with_deadline(schedule.market_job_deadline());
    handles.push(spawn_periodic(job, shutdown.clone(), {
        let ctx = ctx.clone();
        move || {
            let ctx = ctx.clone();
            async move { modules::sync_splits(&ctx).await }
        }
    }));

    tracing::info!(jobs = handles.len(), "=== 데몬 모드 시작 ===");

    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            tracing::error!(error = %e, "작업 태스크 비정상 종료");
        }
    }

    tracing::info!("=== 데몬 모드 종료 ===");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_job(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Result<CollectionStats>> + Send>>
           + Send
           + Sync
           + 'static {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(CollectionStats::new())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_offset_then_every_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();
        let schedule = JobSchedule::new(
            "test",
            Duration::from_secs(10),
            Duration::from_secs(60),
        );
        let handle = spawn_periodic(schedule, shutdown.clone(), counting_job(counter.clone()));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        // 10s, 70s, 130s, 190s
        tokio::time::sleep(Duration::from_secs(195)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 4);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_offset_never_runs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();
        let schedule = JobSchedule::new(
            "test",
            Duration::from_secs(3600),
            Duration::from_secs(60),
        );
        let handle = spawn_periodic(schedule, shutdown.clone(), counting_job(counter.clone()));

        shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_does_not_block_next_run() {
        let started = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();
        let schedule = JobSchedule::new("stuck", Duration::ZERO, Duration::from_secs(60))
            .with_deadline(Duration::from_secs(5));

        let job_started = started.clone();
        let handle = spawn_periodic(schedule, shutdown.clone(), move || {
            let started = job_started.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<()>().await;
                Ok(CollectionStats::new())
            }
        });

        // 0s, 60s, 120s
        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(started.load(Ordering::SeqCst), 3);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
