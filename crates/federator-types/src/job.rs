//! Recurring job descriptors for the client-side scheduler.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobSchedule {
    /// Fixed polling interval, in seconds.
    Interval { seconds: u64 },
    /// A standard five-field cron expression.
    Cron { expression: String },
}

/// Parameters a single recurring job is registered with. `job_id` is
/// deterministic in `(job_name, topic)` so reconciliation can diff by
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringJob {
    pub job_id: String,
    pub job_name: String,
    pub management_node_id: String,
    pub topic: String,
    pub producer_name: String,
    pub producer_host: String,
    pub producer_port: u16,
    pub schedule: JobSchedule,
    pub retries: u32,
    /// Launch the worker once immediately, in addition to the
    /// recurring schedule.
    pub require_immediate_trigger: bool,
}

impl RecurringJob {
    /// Deterministic job id derived from `(job_name, topic)`.
    pub fn derive_job_id(job_name: &str, topic: &str) -> String {
        format!("{job_name}::{topic}")
    }

    /// Whether `other` is structurally equivalent for reconciliation
    /// purposes: same schedule, retries, connection endpoint, and
    /// immediate-trigger flag.
    pub fn structurally_eq(&self, other: &RecurringJob) -> bool {
        self.schedule == other.schedule
            && self.retries == other.retries
            && self.producer_host == other.producer_host
            && self.producer_port == other.producer_port
            && self.require_immediate_trigger == other.require_immediate_trigger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_is_deterministic() {
        assert_eq!(
            RecurringJob::derive_job_id("events", "orders.v1"),
            RecurringJob::derive_job_id("events", "orders.v1")
        );
        assert_ne!(
            RecurringJob::derive_job_id("events", "orders.v1"),
            RecurringJob::derive_job_id("events", "orders.v2")
        );
    }

    fn job(retries: u32) -> RecurringJob {
        RecurringJob {
            job_id: "events::orders.v1".into(),
            job_name: "events".into(),
            management_node_id: "default".into(),
            topic: "orders.v1".into(),
            producer_name: "acme".into(),
            producer_host: "acme.example".into(),
            producer_port: 443,
            schedule: JobSchedule::Interval { seconds: 30 },
            retries,
            require_immediate_trigger: false,
        }
    }

    #[test]
    fn structural_eq_ignores_job_id_and_node() {
        let mut a = job(3);
        let mut b = job(3);
        a.job_id = "x".into();
        b.management_node_id = "other".into();
        assert!(a.structurally_eq(&b));
    }

    #[test]
    fn structural_eq_detects_retry_change() {
        assert!(!job(3).structurally_eq(&job(5)));
    }
}
