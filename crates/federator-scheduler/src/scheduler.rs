//! The durable recurring-job registry and its reconciliation
//! algorithm.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use federator_types::RecurringJob;
use tokio::sync::RwLock;
use tracing::warn;

use crate::backend::{JobHandle, SchedulerBackend, WorkerFn};
use crate::error::SchedulerError;

struct RegisteredJob {
    params: RecurringJob,
    handle: JobHandle,
}

/// Owns one backend's worth of live jobs, keyed by `job_id`.
/// `register_job`/`remove_recurring_job` are the primitives;
/// `reload_recurrent_jobs` is the declarative
/// enumerate/diff/delete/modify/add reconciler built on top of them.
pub struct Scheduler<B: SchedulerBackend> {
    backend: B,
    worker: WorkerFn,
    jobs: RwLock<HashMap<String, RegisteredJob>>,
    started: AtomicBool,
}

impl<B: SchedulerBackend> Scheduler<B> {
    pub fn new(backend: B, worker: WorkerFn) -> Self {
        Scheduler {
            backend,
            worker,
            jobs: RwLock::new(HashMap::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Idempotent lifecycle start.
    pub fn ensure_started(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    /// Idempotent lifecycle stop: every registered job is stopped and
    /// the registry is cleared.
    pub async fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
        let mut jobs = self.jobs.write().await;
        for (_, job) in jobs.drain() {
            job.handle.stop().await;
        }
    }

    fn require_started(&self) -> Result<(), SchedulerError> {
        if self.started.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SchedulerError::NotStarted)
        }
    }

    /// Creates or replaces the job with id `params.job_id`.
    /// `require_immediate_trigger` fires the worker once immediately,
    /// in addition to scheduling it on the recurring cadence.
    pub async fn register_job(&self, params: RecurringJob) -> Result<(), SchedulerError> {
        self.require_started()?;
        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.remove(&params.job_id) {
            existing.handle.stop().await;
        }
        let handle = self.backend.spawn(params.clone(), self.worker.clone());
        if params.require_immediate_trigger {
            (self.worker)(params.clone()).await;
        }
        jobs.insert(
            params.job_id.clone(),
            RegisteredJob { params, handle },
        );
        Ok(())
    }

    pub async fn remove_recurring_job(&self, job_id: &str) -> Result<(), SchedulerError> {
        self.require_started()?;
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.remove(job_id) {
            job.handle.stop().await;
        }
        Ok(())
    }

    /// Returns the job ids currently registered for `management_node_id`.
    pub async fn job_ids_for_node(&self, management_node_id: &str) -> Vec<String> {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| job.params.management_node_id == management_node_id)
            .map(|job| job.params.job_id.clone())
            .collect()
    }

    /// The reconciliation algorithm: diffs `requests` against the jobs
    /// already registered for `management_node_id`, leaving jobs owned
    /// by other nodes untouched. A failure on one job id is logged and
    /// does not halt reconciliation of the rest.
    pub async fn reload_recurrent_jobs(
        &self,
        management_node_id: &str,
        requests: Vec<RecurringJob>,
    ) -> Result<(), SchedulerError> {
        self.require_started()?;

        let desired: HashMap<String, RecurringJob> = requests
            .into_iter()
            .map(|r| (r.job_id.clone(), r))
            .collect();

        let existing_for_node: HashMap<String, RecurringJob> = {
            let jobs = self.jobs.read().await;
            jobs.values()
                .filter(|job| job.params.management_node_id == management_node_id)
                .map(|job| (job.params.job_id.clone(), job.params.clone()))
                .collect()
        };

        for id in existing_for_node.keys() {
            if !desired.contains_key(id) {
                if let Err(e) = self.remove_recurring_job(id).await {
                    warn!(job_id = %id, error = %e, "failed to delete job during reconciliation");
                }
            }
        }

        for (id, desired_job) in &desired {
            match existing_for_node.get(id) {
                Some(current) if current.structurally_eq(desired_job) => {}
                Some(_) => {
                    if let Err(e) = self.remove_recurring_job(id).await {
                        warn!(job_id = %id, error = %e, "failed to remove stale job during reconciliation");
                    }
                    if let Err(e) = self.register_job(desired_job.clone()).await {
                        warn!(job_id = %id, error = %e, "failed to re-register modified job during reconciliation");
                    }
                }
                None => {
                    if let Err(e) = self.register_job(desired_job.clone()).await {
                        warn!(job_id = %id, error = %e, "failed to add job during reconciliation");
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockSchedulerBackend;
    use federator_types::JobSchedule;
    use std::sync::{Arc, Mutex};

    fn job(job_id: &str, node: &str, retries: u32) -> RecurringJob {
        RecurringJob {
            job_id: job_id.into(),
            job_name: "events".into(),
            management_node_id: node.into(),
            topic: "orders.v1".into(),
            producer_name: "acme".into(),
            producer_host: "acme.example".into(),
            producer_port: 443,
            schedule: JobSchedule::Interval { seconds: 30 },
            retries,
            require_immediate_trigger: false,
        }
    }

    fn no_op_worker() -> WorkerFn {
        Arc::new(|_job| Box::pin(async {}))
    }

    #[tokio::test]
    async fn register_job_requires_started() {
        let scheduler = Scheduler::new(MockSchedulerBackend::default(), no_op_worker());
        let err = scheduler.register_job(job("j1", "n1", 1)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::NotStarted));
    }

    #[tokio::test]
    async fn reload_adds_modifies_and_deletes() {
        let backend = MockSchedulerBackend::default();
        let spawned = Arc::clone(&backend.spawned);
        let scheduler = Scheduler::new(backend, no_op_worker());
        scheduler.ensure_started();

        scheduler
            .reload_recurrent_jobs("n1", vec![job("keep", "n1", 1), job("drop-me", "n1", 1)])
            .await
            .unwrap();
        assert_eq!(scheduler.job_ids_for_node("n1").await.len(), 2);

        // "keep" unchanged, "drop-me" removed, "new" added, and a job
        // belonging to another node is left untouched.
        scheduler.register_job(job("other-node-job", "n2", 1)).await.unwrap();

        scheduler
            .reload_recurrent_jobs("n1", vec![job("keep", "n1", 1), job("new", "n1", 1)])
            .await
            .unwrap();

        let mut ids = scheduler.job_ids_for_node("n1").await;
        ids.sort();
        assert_eq!(ids, vec!["keep".to_string(), "new".to_string()]);
        assert_eq!(scheduler.job_ids_for_node("n2").await, vec!["other-node-job".to_string()]);

        let spawned_ids = spawned.lock().unwrap();
        assert!(spawned_ids.contains(&"new".to_string()));
    }

    #[tokio::test]
    async fn reload_re_registers_structurally_changed_jobs() {
        let backend = MockSchedulerBackend::default();
        let spawned = Arc::clone(&backend.spawned);
        let scheduler = Scheduler::new(backend, no_op_worker());
        scheduler.ensure_started();

        scheduler
            .reload_recurrent_jobs("n1", vec![job("j1", "n1", 1)])
            .await
            .unwrap();
        spawned.lock().unwrap().clear();

        scheduler
            .reload_recurrent_jobs("n1", vec![job("j1", "n1", 5)])
            .await
            .unwrap();

        // A structural change must remove-then-re-register, so the
        // backend sees a fresh spawn for the same job id.
        assert_eq!(spawned.lock().unwrap().as_slice(), &["j1".to_string()]);
    }

    #[tokio::test]
    async fn stop_releases_all_jobs() {
        let scheduler = Scheduler::new(MockSchedulerBackend::default(), no_op_worker());
        scheduler.ensure_started();
        scheduler.register_job(job("j1", "n1", 1)).await.unwrap();
        scheduler.stop().await;
        assert!(scheduler.register_job(job("j2", "n1", 1)).await.is_err());
    }

    #[tokio::test]
    async fn require_immediate_trigger_fires_the_worker_once_eagerly() {
        let calls = Arc::new(Mutex::new(0u32));
        let calls_clone = Arc::clone(&calls);
        let worker: WorkerFn = Arc::new(move |_job| {
            let calls = Arc::clone(&calls_clone);
            Box::pin(async move {
                *calls.lock().unwrap() += 1;
            })
        });
        let scheduler = Scheduler::new(MockSchedulerBackend::default(), worker);
        scheduler.ensure_started();
        let mut eager = job("eager", "n1", 1);
        eager.require_immediate_trigger = true;
        scheduler.register_job(eager).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
