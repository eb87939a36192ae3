//! The per-job worker invoked by the scheduler: a recurring job opens
//! an RPC stream, receives frames, republishes them, and persists the
//! next-sequence offset on success. One invocation opens one stream,
//! drains it to completion (the server ends the call on its own
//! inactivity timeout), and returns; the scheduler's backend fires the
//! next invocation on the job's configured cadence.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use federator_auth::TokenService;
use federator_files::FileChunkAssembler;
use federator_kv::KvStore;
use federator_proto::federator_client::FederatorClient;
use federator_proto::{file_stream_item, TopicRequest};
use federator_storage::ReceivedFileStorage;
use federator_transport::{classify, BearerTokenInterceptor, Retryability};
use federator_types::RecurringJob;
use tonic::transport::Channel;
use tracing::{debug, error, warn};

use crate::kafka_sink::LocalKafkaSink;

/// Shared collaborators every job worker invocation needs. Built once
/// in `main` and cloned (cheaply, behind `Arc`) into each worker
/// closure instance.
pub struct WorkerContext {
    pub client_id: String,
    pub kv: Arc<dyn KvStore>,
    pub token_service: Arc<TokenService>,
    pub kafka_sink: Arc<LocalKafkaSink>,
    pub file_storage: Arc<dyn ReceivedFileStorage>,
    pub temp_dir: std::path::PathBuf,
    pub inactivity_timeout: Duration,
}

/// `job.job_name`'s `files:` prefix is this client's convention for
/// distinguishing a `StreamFiles` job from a `StreamEvents` one, since
/// `RecurringJob` carries no field for it (see
/// `management::RecurringJobRequest::into_job`).
fn is_file_job(job: &RecurringJob) -> bool {
    job.job_name.starts_with("files:")
}

async fn connect(
    job: &RecurringJob,
    token_service: &TokenService,
    management_node_id: &str,
) -> anyhow::Result<FederatorClient<tonic::service::interceptor::InterceptedService<Channel, BearerTokenInterceptor>>> {
    let token = token_service.fetch_token(management_node_id).await?;
    let endpoint = format!("http://{}:{}", job.producer_host, job.producer_port);
    let channel = Channel::from_shared(endpoint)?.connect().await?;
    let interceptor = BearerTokenInterceptor::new(Arc::new(RwLock::new(token)));
    Ok(FederatorClient::with_interceptor(channel, interceptor))
}

pub async fn run_job(context: Arc<WorkerContext>, job: RecurringJob) {
    if let Err(e) = run_job_fallible(&context, &job).await {
        error!(job_id = %job.job_id, topic = %job.topic, error = %e, "recurring job invocation failed");
    }
}

async fn run_job_fallible(context: &WorkerContext, job: &RecurringJob) -> anyhow::Result<()> {
    let mut client = connect(job, &context.token_service, &job.management_node_id).await?;
    let start_offset = context
        .kv
        .get_offset(&context.client_id, &job.topic)
        .await
        .unwrap_or(0);

    let request = TopicRequest {
        client_id: context.client_id.clone(),
        topic: job.topic.clone(),
        offset: start_offset,
    };

    if is_file_job(job) {
        run_file_job(context, job, &mut client, request).await
    } else {
        run_event_job(context, job, &mut client, request).await
    }
}

async fn run_event_job(
    context: &WorkerContext,
    job: &RecurringJob,
    client: &mut FederatorClient<tonic::service::interceptor::InterceptedService<Channel, BearerTokenInterceptor>>,
    request: TopicRequest,
) -> anyhow::Result<()> {
    let mut stream = match client.stream_events(request).await {
        Ok(response) => response.into_inner(),
        Err(status) => return Err(classify_and_report(job, status)),
    };

    loop {
        let item = tokio::time::timeout(context.inactivity_timeout.max(Duration::from_secs(1)), stream.message())
            .await
            .unwrap_or(Ok(None));
        let frame = match item {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(status) => return Err(classify_and_report(job, status)),
        };
        let offset = frame.offset;
        if let Err(e) = context.kafka_sink.publish(&frame).await {
            warn!(job_id = %job.job_id, topic = %job.topic, offset, error = %e, "local republish failed, offset not advanced");
            continue;
        }
        if let Err(e) = context.kv.set_offset(&context.client_id, &job.topic, offset + 1).await {
            error!(job_id = %job.job_id, topic = %job.topic, offset, error = %e, "offset write failed after durable republish");
        }
    }
    Ok(())
}

async fn run_file_job(
    context: &WorkerContext,
    job: &RecurringJob,
    client: &mut FederatorClient<tonic::service::interceptor::InterceptedService<Channel, BearerTokenInterceptor>>,
    request: TopicRequest,
) -> anyhow::Result<()> {
    let mut stream = match client.stream_files(request).await {
        Ok(response) => response.into_inner(),
        Err(status) => return Err(classify_and_report(job, status)),
    };
    let assembler = FileChunkAssembler::new(
        context.temp_dir.clone(),
        Arc::clone(&context.file_storage),
        format!("{}/", job.topic),
    );

    loop {
        let item = tokio::time::timeout(context.inactivity_timeout.max(Duration::from_secs(1)), stream.message())
            .await
            .unwrap_or(Ok(None));
        let item = match item {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(status) => return Err(classify_and_report(job, status)),
        };

        let sequence_id = match &item.item {
            Some(file_stream_item::Item::Chunk(chunk)) => chunk.file_sequence_id,
            Some(file_stream_item::Item::Warning(w)) => {
                warn!(job_id = %job.job_id, topic = %job.topic, reason = %w.reason, skipped = w.skipped_sequence_id, "producer reported a skipped file transfer request");
                continue;
            }
            None => {
                warn!(job_id = %job.job_id, topic = %job.topic, "received an empty file stream item, skipping");
                continue;
            }
        };

        let frame = match FileChunkAssembler::chunk_from_item(item) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                warn!(job_id = %job.job_id, topic = %job.topic, sequence_id, error = %e, "malformed file chunk frame, skipping");
                continue;
            }
        };

        match assembler.handle_chunk(frame).await {
            Ok(Some(stored)) => {
                debug!(job_id = %job.job_id, topic = %job.topic, sequence_id, local_path = ?stored.local_path, remote_uri = ?stored.remote_uri, "file published");
                if let Err(e) = context.kv.set_offset(&context.client_id, &job.topic, sequence_id + 1).await {
                    error!(job_id = %job.job_id, topic = %job.topic, sequence_id, error = %e, "offset write failed after durable file publish");
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(job_id = %job.job_id, topic = %job.topic, sequence_id, error = %e, "file assembly failed, offset not advanced");
            }
        }
    }
    Ok(())
}

fn classify_and_report(job: &RecurringJob, status: tonic::Status) -> anyhow::Error {
    match classify(&status) {
        Retryability::Retryable => {
            debug!(job_id = %job.job_id, topic = %job.topic, status = %status, "retryable transport failure, will retry on next schedule tick");
        }
        Retryability::Terminal => {
            error!(job_id = %job.job_id, topic = %job.topic, status = %status, "terminal transport failure");
        }
    }
    anyhow::anyhow!(status)
}
