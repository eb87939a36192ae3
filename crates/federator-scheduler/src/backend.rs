//! Pluggable execution backends for recurring jobs, the same
//! trait-per-backend shape `replicante_tasks::worker::backend` uses
//! for its Kafka/mock task sources, applied here to job scheduling
//! instead of task consumption.

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use federator_types::{JobSchedule, RecurringJob};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// The unit of recurring work: given the job's current parameters,
/// run one iteration to completion.
pub type WorkerFn = Arc<dyn Fn(RecurringJob) -> BoxFuture<'static, ()> + Send + Sync>;

/// A live, running job; dropping this without calling [`stop`] leaks
/// the backing task, so the scheduler always calls `stop` explicitly
/// before discarding one.
///
/// [`stop`]: JobHandle::stop
pub struct JobHandle {
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl JobHandle {
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

pub trait SchedulerBackend: Send + Sync {
    /// Starts driving `job` on its configured schedule, invoking
    /// `worker` on each fire.
    fn spawn(&self, job: RecurringJob, worker: WorkerFn) -> JobHandle;
}

/// Production backend: `tokio::time::interval` for fixed-interval
/// jobs, `cron::Schedule` for cron expressions.
pub struct TokioSchedulerBackend;

impl SchedulerBackend for TokioSchedulerBackend {
    fn spawn(&self, job: RecurringJob, worker: WorkerFn) -> JobHandle {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            match &job.schedule {
                JobSchedule::Interval { seconds } => {
                    let period = Duration::from_secs((*seconds).max(1));
                    let mut ticker =
                        tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                    loop {
                        tokio::select! {
                            _ = task_cancel.cancelled() => break,
                            _ = ticker.tick() => worker(job.clone()).await,
                        }
                    }
                }
                JobSchedule::Cron { expression } => {
                    let schedule = match cron::Schedule::from_str(expression) {
                        Ok(schedule) => schedule,
                        Err(e) => {
                            error!(job_id = %job.job_id, error = %e, "invalid cron expression, job will not run");
                            return;
                        }
                    };
                    loop {
                        let now = chrono::Utc::now();
                        let Some(next) = schedule.after(&now).next() else {
                            break;
                        };
                        let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
                        tokio::select! {
                            _ = task_cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => worker(job.clone()).await,
                        }
                    }
                }
            }
        });
        JobHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Test backend: records the job ids it was asked to spawn but never
/// actually runs a timer, so reconciliation tests stay deterministic
/// and fast.
#[derive(Default)]
pub struct MockSchedulerBackend {
    pub spawned: Arc<Mutex<Vec<String>>>,
}

impl SchedulerBackend for MockSchedulerBackend {
    fn spawn(&self, job: RecurringJob, _worker: WorkerFn) -> JobHandle {
        self.spawned.lock().unwrap().push(job.job_id.clone());
        JobHandle {
            cancel: CancellationToken::new(),
            task: None,
        }
    }
}
