// Job scheduler
//
// One supervising task per submitted job. Attack tasks queue on a single-permit semaphore so
// hashcat never runs twice at the same time; the supervisor reconciles the outcome into the
// task store once the attack task is finished, whatever way it finished.

use crate::models::{AttackRequest, MAX_CONCURRENT_ATTACKS, Settings, TaskUpdate, status};
use crate::services::attack::{AttackContext, AttackOutcome, StrategyPipeline};
use crate::services::benchmark::run_benchmark;
use crate::services::command::CommandBuilder;
use crate::services::monitor::EngineError;
use crate::state::{ProgressHandle, ProgressState};
use crate::store::TaskStore;
use anyhow::{Result, anyhow};
use camino::Utf8PathBuf;
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::{AbortHandle, JoinError};

/// Identity of a submitted job
pub type JobId = u64;

/// Counts one background task as pending until dropped, however the task ends.
struct PendingGuard(Arc<watch::Sender<usize>>);

impl PendingGuard {
    fn new(pending: &Arc<watch::Sender<usize>>) -> Self {
        pending.send_modify(|n| *n += 1);
        Self(Arc::clone(pending))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

struct JobEntry {
    task_id: u64,
    progress: ProgressHandle,
    attack: AbortHandle,
}

/// Benchmark parameters used at startup
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub builder: CommandBuilder,
    pub mode: u32,
    pub file: Utf8PathBuf,
}

impl BenchmarkConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            builder: CommandBuilder::from_settings(settings),
            mode: settings.benchmark_mode(),
            file: settings.benchmark_file.clone(),
        }
    }
}

/// Runs cracking jobs one at a time and records their results.
///
/// Must be used from within a tokio runtime.
pub struct HashcatWorker {
    pipeline: Arc<StrategyPipeline>,
    store: Arc<dyn TaskStore>,
    benchmark: BenchmarkConfig,
    semaphore: Arc<Semaphore>,
    jobs: Arc<Mutex<IndexMap<JobId, JobEntry>>>,
    benchmarks: Mutex<Vec<AbortHandle>>,
    pending: Arc<watch::Sender<usize>>,
    next_job: AtomicU64,
}

impl HashcatWorker {
    pub fn new(pipeline: StrategyPipeline, store: Arc<dyn TaskStore>, benchmark: BenchmarkConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store,
            benchmark,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_ATTACKS)),
            jobs: Arc::new(Mutex::new(IndexMap::new())),
            benchmarks: Mutex::new(Vec::new()),
            pending: Arc::new(watch::Sender::new(0)),
            next_job: AtomicU64::new(1),
        }
    }

    /// Worker configured from settings; queues the startup benchmark.
    pub fn from_settings(settings: &Settings, store: Arc<dyn TaskStore>) -> Self {
        let worker = Self::new(
            StrategyPipeline::from_settings(settings),
            store,
            BenchmarkConfig::from_settings(settings),
        );
        worker.benchmark();
        worker
    }

    fn jobs(&self) -> MutexGuard<'_, IndexMap<JobId, JobEntry>> {
        lock(&self.jobs)
    }

    /// Queue a cracking job for `request`. `timeout_minutes` bounds the user wordlist step.
    pub fn submit_crack(&self, request: AttackRequest, timeout_minutes: Option<u64>) -> JobId {
        let job_id = self.next_job.fetch_add(1, Ordering::Relaxed);
        let progress = ProgressHandle::new();
        let timeout = timeout_budget(timeout_minutes);

        tracing::info!(
            "Job {} queued for task {}: {} (timeout {:?})",
            job_id,
            request.task_id,
            request.capture,
            timeout
        );

        let attack = tokio::spawn(crack_async(
            Arc::clone(&self.pipeline),
            Arc::clone(&self.semaphore),
            AttackContext::from_request(&request),
            progress.clone(),
            timeout,
        ));

        self.jobs().insert(
            job_id,
            JobEntry {
                task_id: request.task_id,
                progress: progress.clone(),
                attack: attack.abort_handle(),
            },
        );

        let store = Arc::clone(&self.store);
        let jobs = Arc::clone(&self.jobs);
        let task_id = request.task_id;
        let uploaded_time = request.uploaded_time;
        let guard = PendingGuard::new(&self.pending);
        tokio::spawn(async move {
            let _guard = guard;
            let result = attack.await;
            callback_attack(store.as_ref(), task_id, uploaded_time, &progress, result);
            lock(&jobs).shift_remove(&job_id);
        });

        job_id
    }

    /// Request cooperative cancellation of one job. Returns false for unknown/finished jobs.
    pub fn cancel(&self, job_id: JobId) -> bool {
        match self.jobs().get(&job_id) {
            Some(entry) => {
                tracing::info!("Cancelling job {} (task {})", job_id, entry.task_id);
                entry.progress.request_cancel();
                true
            }
            None => false,
        }
    }

    /// Current progress of a running or queued job
    pub fn status(&self, job_id: JobId) -> Option<ProgressState> {
        self.jobs().get(&job_id).map(|entry| entry.progress.snapshot())
    }

    /// Job ids not yet reconciled
    pub fn active_jobs(&self) -> Vec<JobId> {
        self.jobs().keys().copied().collect()
    }

    /// Cancel every unfinished job and kill its hashcat processes. Does not wait.
    pub fn terminate(&self) {
        for benchmark in lock(&self.benchmarks).drain(..) {
            benchmark.abort();
        }

        let jobs = self.jobs();
        tracing::warn!("Terminating {} unfinished job(s)", jobs.len());
        for entry in jobs.values() {
            entry.progress.request_cancel();
            // dropping the aborted future drops its Child handles, which kills them
            entry.attack.abort();
        }
    }

    /// Queue a benchmark run on the job pool; failures only leave no sample behind.
    pub fn benchmark(&self) {
        let config = self.benchmark.clone();
        let semaphore = Arc::clone(&self.semaphore);
        let guard = PendingGuard::new(&self.pending);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            run_benchmark(&config.builder, config.mode, &config.file).await;
        });
        lock(&self.benchmarks).push(handle.abort_handle());
    }

    /// Wait until every submitted job has been reconciled and every benchmark has finished.
    ///
    /// Cancel-safe: dropping the future leaves the jobs running.
    pub async fn wait_idle(&self) {
        let mut pending = self.pending.subscribe();
        if pending.wait_for(|n| *n == 0).await.is_err() {
            tracing::error!("Pending job counter closed");
        }
    }
}

/// Minutes to a wall-clock budget, saturating instead of overflowing.
fn timeout_budget(minutes: Option<u64>) -> Option<Duration> {
    minutes.map(|m| Duration::from_secs(m.saturating_mul(60)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Body of one attack task: wait for the pool slot, then run the strategies.
async fn crack_async(
    pipeline: Arc<StrategyPipeline>,
    semaphore: Arc<Semaphore>,
    mut ctx: AttackContext,
    progress: ProgressHandle,
    timeout: Option<Duration>,
) -> Result<AttackOutcome> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|_| anyhow!("job pool closed"))?;

    if progress.is_cancelled() {
        tracing::warn!("Cancelled before starting: {}", ctx.capture_path);
        return Err(EngineError::Cancelled.into());
    }

    pipeline.crack(&mut ctx, &progress, timeout).await
}

/// Completion handler, run exactly once per job after its attack task has finished.
///
/// Errors become the status text, cancellation becomes `Cancelled`; the final state is then
/// copied into the task record together with the time elapsed since upload.
pub fn callback_attack(
    store: &dyn TaskStore,
    task_id: u64,
    uploaded_time: DateTime<Local>,
    progress: &ProgressHandle,
    result: Result<Result<AttackOutcome>, JoinError>,
) {
    progress.update(|state| {
        match &result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if state.cancelled || is_cancellation(e) => {
                state.status = status::CANCELLED.to_string();
            }
            Ok(Err(e)) => {
                tracing::error!("Task {} failed: {:#}", task_id, e);
                state.status = format!("{:#}", e);
            }
            Err(join) if join.is_cancelled() => {
                state.status = status::CANCELLED.to_string();
            }
            Err(join) => {
                tracing::error!("Task {} panicked: {}", task_id, join);
                state.status = format!("Internal error: {}", join);
            }
        }
        state.completed = true;
    });

    let snapshot = progress.snapshot();
    let duration = (Local::now() - uploaded_time).to_std().unwrap_or_default();
    let update = TaskUpdate {
        status: snapshot.status.clone(),
        progress: snapshot.progress,
        found_key: snapshot.key.clone(),
        duration,
    };

    let saved = store.update(task_id, &update).and_then(|_| store.commit());
    match saved {
        Ok(()) => tracing::info!(
            "Task {} finished: {} (key found: {}, {:.1}s)",
            task_id,
            update.status,
            update.found_key.is_some(),
            duration.as_secs_f64()
        ),
        Err(e) => tracing::error!("Failed to save task {}: {}", task_id, e),
    }
}

fn is_cancellation(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<EngineError>(), Some(EngineError::Cancelled))
}
