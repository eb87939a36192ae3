//! A thin client for the management node's declared producer/consumer
//! graph. The management-plane HTTP API itself is an external
//! collaborator; only the typed shape the scheduler reconciles against
//! is defined here. Modeled the way `federator-auth::token` wraps a
//! bare `reqwest::Client` in a small typed surface.

use federator_types::{JobSchedule, RecurringJob};
use serde::Deserialize;

/// One entry of the management node's declared job graph: a
/// `(producer, topic)` pair this tenant is entitled to consume, plus
/// its recurring-job parameters. `is_file_topic` distinguishes a
/// `StreamFiles` subscription from a `StreamEvents` one — the shared
/// `RecurringJob` type has no field for this distinction, so it is
/// threaded through the job id via the `files:` prefix convention in
/// [`RecurringJobRequest::into_job`] instead (DESIGN.md).
#[derive(Debug, Clone, Deserialize)]
pub struct RecurringJobRequest {
    pub job_name: String,
    pub topic: String,
    pub producer_name: String,
    pub producer_host: String,
    pub producer_port: u16,
    pub schedule: JobSchedule,
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub require_immediate_trigger: bool,
    #[serde(default)]
    pub is_file_topic: bool,
}

impl RecurringJobRequest {
    pub fn into_job(self, management_node_id: &str) -> RecurringJob {
        let job_name = if self.is_file_topic {
            format!("files:{}", self.job_name)
        } else {
            self.job_name
        };
        RecurringJob {
            job_id: RecurringJob::derive_job_id(&job_name, &self.topic),
            job_name,
            management_node_id: management_node_id.to_string(),
            topic: self.topic,
            producer_name: self.producer_name,
            producer_host: self.producer_host,
            producer_port: self.producer_port,
            schedule: self.schedule,
            retries: self.retries,
            require_immediate_trigger: self.require_immediate_trigger,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManagementNodeError {
    #[error("management node request failed: {0}")]
    Request(#[from] reqwest::Error),
}

pub struct ManagementNodeClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
}

impl ManagementNodeClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        ManagementNodeClient {
            http,
            base_url: base_url.into(),
            client_id: client_id.into(),
        }
    }

    /// Fetches the currently declared set of recurring jobs for this
    /// tenant, reconciled from the management node's declared
    /// producer/consumer graph.
    pub async fn declared_jobs(&self) -> Result<Vec<RecurringJobRequest>, ManagementNodeError> {
        let url = format!("{}/tenants/{}/jobs", self.base_url.trim_end_matches('/'), self.client_id);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}
