//! Drives one `StreamFiles` call: polls a Kafka topic of file-transfer
//! requests at the requested offset, and for each request produces a
//! chunk sequence through [`produce_chunks`], using the polled
//! message's own offset as `file_sequence_id`.
//!
//! Structurally this is [`federator_conductor::MessageConductor`]'s
//! poll/cancel/inactivity loop, specialised to file requests instead
//! of direct event pass-through; kept local to the server binary
//! since file-transfer-request polling has no attribute filter and a
//! different per-message action.

use std::time::{Duration, Instant};

use federator_files::produce_chunks;
use federator_proto::FileStreamItem;
use federator_storage::{FileProvider, FileTransferRequest};
use federator_transport::FlowControlledSender;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::message::Message;
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// The payload of a file-transfer-request Kafka record, minus the
/// `file_sequence_id` which is taken from the record's own offset.
#[derive(Debug, Deserialize)]
struct FileTransferRequestPayload {
    storage_container: String,
    path: String,
}

pub struct FileConductorConfig {
    pub bootstrap_servers: String,
    pub group_id: String,
    pub topic: String,
    pub partition: i32,
    pub start_offset: i64,
    pub chunk_size: usize,
    pub inactivity_timeout: Duration,
}

pub async fn run_file_conductor(
    config: FileConductorConfig,
    storage: &dyn FileProvider,
    sender: &FlowControlledSender<FileStreamItem>,
    cancel: CancellationToken,
) -> Result<i64, anyhow::Error> {
    let consumer: BaseConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("group.id", &config.group_id)
        .set("enable.auto.commit", "false")
        .create()?;
    let mut assignment = TopicPartitionList::new();
    assignment.add_partition_offset(
        &config.topic,
        config.partition,
        Offset::Offset(config.start_offset),
    )?;
    consumer.assign(&assignment)?;

    let mut next_offset = config.start_offset;
    let mut idle_since: Option<Instant> = None;

    loop {
        if cancel.is_cancelled() || sender.is_terminated().await {
            break;
        }

        let polled = {
            let consumer = &consumer;
            tokio::task::block_in_place(|| consumer.poll(POLL_TIMEOUT))
        };

        let message = match polled {
            None => {
                let now = Instant::now();
                let idle_start = *idle_since.get_or_insert(now);
                let idle_for = now.duration_since(idle_start);
                if config.inactivity_timeout.is_zero() || idle_for >= config.inactivity_timeout {
                    debug!(topic = %config.topic, "file conductor inactivity timeout reached, ending call");
                    break;
                }
                continue;
            }
            Some(Err(e)) => {
                return Err(anyhow::anyhow!("file request poll failed: {e}"));
            }
            Some(Ok(message)) => {
                idle_since = None;
                message
            }
        };

        let offset = message.offset();
        let payload = match message.payload() {
            Some(bytes) => bytes,
            None => {
                warn!(offset, "file transfer request record had no payload, skipping");
                next_offset = offset + 1;
                continue;
            }
        };
        let request: FileTransferRequestPayload = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(offset, error = %e, "malformed file transfer request, skipping");
                next_offset = offset + 1;
                continue;
            }
        };

        let transfer = FileTransferRequest {
            storage_container: request.storage_container,
            path: request.path,
        };
        let sender_ref = sender;
        produce_chunks(storage, &transfer, offset, config.chunk_size, |item| async move {
            sender_ref.send(item).await
        })
        .await
        .map_err(|status| anyhow::anyhow!("file chunk send failed: {status}"))?;
        next_offset = offset + 1;
    }

    Ok(next_offset)
}
