//! 파이프라인 오케스트레이션 -- 추적/분류/상관의 전체 흐름을 관리합니다.
//!
//! [`ActivityPipeline`]은 core의 [`Pipeline`](xlxmon_core::pipeline::Pipeline) trait을
//! 구현하여 `xlxmon-daemon`에서 생명주기(start/stop/health_check)로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! LogTailer -> mpsc -> Worker (Classifier -> ResumeFilter -> SessionCorrelator -> RecordStore)
//! ```
//!
//! 워커는 단일 태스크로 라인을 순서대로 처리합니다. 한 라인의 저장소
//! 반영이 끝난 뒤에야 다음 라인을 읽으므로 이벤트 순서가 보존됩니다.
//!
//! 저장소 에러는 워커 태스크의 반환값으로 표면화됩니다. 데몬은
//! [`join`](ActivityPipeline::join)으로 이를 관찰하고 0이 아닌 코드로
//! 종료합니다 (supervisor가 재시작).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use xlxmon_core::error::{MonitorError, XlxmonError};
use xlxmon_core::metrics as m;
use xlxmon_core::pipeline::{HealthStatus, Pipeline};
use xlxmon_core::store::RecordStore;

use crate::classifier::{Classification, Classifier};
use crate::config::ActivityConfig;
use crate::correlator::{Applied, SessionCorrelator};
use crate::error::ActivityError;
use crate::resume::ResumeFilter;
use crate::tailer::{LogTailer, RawLine};

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 액티비티 파이프라인 -- 추적/분류/상관의 전체 흐름을 관리합니다.
///
/// # 사용 예시
/// ```ignore
/// use std::sync::Arc;
/// use xlxmon_activity::{ActivityPipeline, ActivityPipelineBuilder};
///
/// let mut pipeline = ActivityPipelineBuilder::new()
///     .config(config)
///     .store(Arc::new(store))
///     .build()?;
///
/// // Pipeline trait으로 시작
/// pipeline.start().await?;
/// ```
pub struct ActivityPipeline<S> {
    /// 파이프라인 설정
    config: ActivityConfig,
    /// 현재 상태
    state: PipelineState,
    /// 레코드 저장소
    store: Arc<S>,
    /// 백그라운드 태스크 취소 토큰
    cancel: CancellationToken,
    /// 추적기 태스크 핸들
    tailer_task: Option<JoinHandle<Result<(), ActivityError>>>,
    /// 워커 태스크 핸들
    worker_task: Option<JoinHandle<Result<(), ActivityError>>>,
    /// 처리된 이벤트 카운터
    processed_count: Arc<AtomicU64>,
    /// 드롭된 닫힘 이벤트 카운터
    unmatched_count: Arc<AtomicU64>,
}

impl<S: RecordStore + 'static> ActivityPipeline<S> {
    /// 현재 상태를 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 처리된 이벤트 수를 반환합니다.
    pub fn processed_count(&self) -> u64 {
        self.processed_count.load(Ordering::Relaxed)
    }

    /// 드롭된 닫힘 이벤트 수를 반환합니다.
    pub fn unmatched_close_count(&self) -> u64 {
        self.unmatched_count.load(Ordering::Relaxed)
    }

    /// 백그라운드 태스크의 종료를 기다립니다.
    ///
    /// 워커가 치명적 에러(저장소 실패 등)로 종료하면 그 에러를
    /// 반환합니다. 정상 동작 중에는 완료되지 않으므로 데몬은 종료
    /// 시그널과 함께 `tokio::select!`로 기다립니다.
    pub async fn join(&mut self) -> Result<(), XlxmonError> {
        if let Some(task) = self.worker_task.take() {
            match task.await {
                Ok(result) => result.map_err(XlxmonError::from)?,
                Err(e) => {
                    return Err(
                        MonitorError::InitFailed(format!("worker task failed: {e}")).into(),
                    );
                }
            }
        }
        if let Some(task) = self.tailer_task.take() {
            match task.await {
                Ok(result) => result.map_err(XlxmonError::from)?,
                Err(e) => {
                    return Err(
                        MonitorError::InitFailed(format!("tailer task failed: {e}")).into(),
                    );
                }
            }
        }
        Ok(())
    }
}

impl<S: RecordStore + 'static> Pipeline for ActivityPipeline<S> {
    async fn start(&mut self) -> Result<(), XlxmonError> {
        if self.state == PipelineState::Running {
            return Err(MonitorError::AlreadyRunning.into());
        }

        info!("starting activity pipeline");

        // 1. 재개 커서 조회 (저장소 실패는 치명적)
        let cursor = self
            .store
            .find_last_start_ts(&self.config.system)
            .await
            .map_err(XlxmonError::Store)?;
        let resume = ResumeFilter::new(cursor.unwrap_or(0));
        info!(cursor_ms = resume.cursor_ms(), "resume cursor loaded");

        // 2. 분류기/상관기 준비
        let classifier =
            Classifier::new(self.config.source_tag.clone()).map_err(XlxmonError::from)?;
        let mut correlator = SessionCorrelator::new(self.config.system.clone());
        if self.config.recover_open_sessions {
            correlator
                .recover(self.store.as_ref())
                .await
                .map_err(XlxmonError::from)?;
        }

        // 3. 추적기/워커 태스크 스폰
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        self.cancel = CancellationToken::new();

        let tailer = LogTailer::new(self.config.clone(), tx);
        self.tailer_task = Some(tokio::spawn(tailer.run(self.cancel.clone())));
        self.worker_task = Some(tokio::spawn(run_worker(
            Arc::clone(&self.store),
            classifier,
            resume,
            correlator,
            rx,
            Arc::clone(&self.processed_count),
            Arc::clone(&self.unmatched_count),
        )));

        self.state = PipelineState::Running;
        info!("activity pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), XlxmonError> {
        if self.state != PipelineState::Running {
            return Err(MonitorError::NotRunning.into());
        }

        info!("stopping activity pipeline");

        // 추적기를 먼저 멈추면 채널이 닫히고 워커가 잔여 라인을
        // 소진한 뒤 종료함
        self.cancel.cancel();

        if let Some(task) = self.tailer_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "tailer exited with error during shutdown"),
                Err(e) => warn!(error = %e, "tailer task panicked"),
            }
        }

        let mut worker_result = Ok(());
        if let Some(task) = self.worker_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => worker_result = Err(XlxmonError::from(e)),
                Err(e) => {
                    worker_result =
                        Err(MonitorError::InitFailed(format!("worker task failed: {e}")).into());
                }
            }
        }

        self.state = PipelineState::Stopped;
        info!("activity pipeline stopped");
        worker_result
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                let worker_exited = self
                    .worker_task
                    .as_ref()
                    .is_none_or(|task| task.is_finished());
                if worker_exited {
                    HealthStatus::Unhealthy("worker task exited".to_owned())
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 워커 루프 — 라인을 순서대로 분류하고 저장소에 반영합니다.
///
/// 채널이 닫히면 (추적기 종료) 잔여 라인을 소진하고 정상 반환합니다.
/// 저장소 에러는 즉시 반환됩니다 (치명적).
async fn run_worker<S: RecordStore>(
    store: Arc<S>,
    classifier: Classifier,
    resume: ResumeFilter,
    mut correlator: SessionCorrelator,
    mut rx: mpsc::Receiver<RawLine>,
    processed: Arc<AtomicU64>,
    unmatched: Arc<AtomicU64>,
) -> Result<(), ActivityError> {
    while let Some(line) = rx.recv().await {
        let text = String::from_utf8_lossy(&line.data);
        let event = match classifier.classify(&text) {
            Classification::Ignore => continue,
            Classification::Event(event) => event,
        };
        counter!(m::MONITOR_EVENTS_CLASSIFIED_TOTAL).increment(1);

        if resume.should_skip(event.ts_ms) {
            debug!(
                ts_ms = event.ts_ms,
                cursor_ms = resume.cursor_ms(),
                "event at or before resume cursor, skipping"
            );
            counter!(m::MONITOR_EVENTS_SKIPPED_TOTAL).increment(1);
            continue;
        }

        match correlator.apply(store.as_ref(), &event).await? {
            Applied::Opened { .. } => {
                counter!(m::MONITOR_SESSIONS_OPENED_TOTAL).increment(1);
            }
            Applied::Closed { .. } => {
                counter!(m::MONITOR_SESSIONS_CLOSED_TOTAL).increment(1);
            }
            Applied::UnmatchedClose { .. } => {
                counter!(m::MONITOR_UNMATCHED_CLOSES_TOTAL).increment(1);
                unmatched.fetch_add(1, Ordering::Relaxed);
            }
        }

        #[allow(clippy::cast_precision_loss)]
        gauge!(m::MONITOR_OPEN_SESSIONS).set(correlator.open_count() as f64);
        processed.fetch_add(1, Ordering::Relaxed);
    }

    debug!("line channel closed, worker exiting");
    Ok(())
}

/// 액티비티 파이프라인 빌더
pub struct ActivityPipelineBuilder<S> {
    config: ActivityConfig,
    store: Option<Arc<S>>,
}

impl<S: RecordStore + 'static> ActivityPipelineBuilder<S> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ActivityConfig::default(),
            store: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: ActivityConfig) -> Self {
        self.config = config;
        self
    }

    /// 레코드 저장소를 지정합니다 (필수).
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// 파이프라인을 빌드합니다.
    pub fn build(self) -> Result<ActivityPipeline<S>, ActivityError> {
        self.config.validate()?;
        let store = self.store.ok_or_else(|| ActivityError::Config {
            field: "store".to_owned(),
            reason: "record store is required".to_owned(),
        })?;

        Ok(ActivityPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            store,
            cancel: CancellationToken::new(),
            tailer_task: None,
            worker_task: None,
            processed_count: Arc::new(AtomicU64::new(0)),
            unmatched_count: Arc::new(AtomicU64::new(0)),
        })
    }
}

impl<S: RecordStore + 'static> Default for ActivityPipelineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
