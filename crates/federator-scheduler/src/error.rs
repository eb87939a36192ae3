//! Error taxonomy for the job scheduler.

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler is not started")]
    NotStarted,
}
