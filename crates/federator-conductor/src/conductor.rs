//! The Message Conductor: drives one topic's event flow for one
//! `StreamEvents` call through the state machine
//! `INIT -> RUNNING -> DRAINING -> TERMINATED`.
//!
//! Polling drives a `BaseConsumer` with a bounded poll and a
//! hand-rolled idle/liveness check rather than `StreamConsumer`'s
//! `recv().await`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use federator_filter::AttributeFilter;
use federator_proto::EventFrame;
use federator_transport::sender::FlowControlledSender;
use federator_types::AttributesDTO;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::message::{BorrowedMessage, Headers, Message};
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ConductorError;
use crate::transform::{process_message, Decision, RawHeader};

/// Bounded poll timeout per iteration; short enough that cancellation
/// and inactivity are noticed promptly.
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConductorState {
    Init = 0,
    Running = 1,
    Draining = 2,
    Terminated = 3,
}

/// Per-call configuration: which topic/partition to bind, which
/// consumer entitlements apply, and which record headers may be
/// forwarded verbatim.
pub struct ConductorConfig {
    pub bootstrap_servers: String,
    pub group_id: String,
    pub topic: String,
    pub partition: i32,
    pub start_offset: i64,
    pub attributes: Vec<AttributesDTO>,
    pub shared_header_allowlist: Vec<String>,
    pub inactivity_timeout: Duration,
}

pub struct MessageConductor {
    consumer: BaseConsumer,
    filter: std::sync::Arc<dyn AttributeFilter>,
    config: ConductorConfig,
    state: AtomicU8,
}

impl MessageConductor {
    /// INIT: binds to Kafka at `(topic, offset, client_id)`. The
    /// consumer group id should already encode the calling client so
    /// each client gets an independent partition assignment.
    pub fn init(
        config: ConductorConfig,
        filter: std::sync::Arc<dyn AttributeFilter>,
    ) -> Result<Self, ConductorError> {
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

        Ok(MessageConductor {
            consumer,
            filter,
            config,
            state: AtomicU8::new(ConductorState::Init as u8),
        })
    }

    pub fn state(&self) -> ConductorState {
        match self.state.load(Ordering::Acquire) {
            0 => ConductorState::Init,
            1 => ConductorState::Running,
            2 => ConductorState::Draining,
            _ => ConductorState::Terminated,
        }
    }

    fn set_state(&self, state: ConductorState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// RUNNING/DRAINING/TERMINATED: polls, filters and forwards events
    /// until the call completes, is cancelled, or goes idle past the
    /// inactivity timeout. Returns the next offset the caller should
    /// persist.
    pub async fn run(
        &self,
        sender: &FlowControlledSender<EventFrame>,
        cancel: CancellationToken,
    ) -> Result<i64, ConductorError> {
        self.set_state(ConductorState::Running);
        let mut next_offset = self.config.start_offset;
        let mut idle_since: Option<Instant> = None;

        loop {
            if cancel.is_cancelled() || sender.is_terminated().await {
                break;
            }

            let polled = {
                let consumer = &self.consumer;
                tokio::task::block_in_place(|| consumer.poll(POLL_TIMEOUT))
            };

            let message = match polled {
                None => {
                    let now = Instant::now();
                    let idle_start = *idle_since.get_or_insert(now);
                    let idle_for = now.duration_since(idle_start);
                    if self.config.inactivity_timeout.is_zero() || idle_for >= self.config.inactivity_timeout {
                        debug!(topic = %self.config.topic, "inactivity timeout reached, ending call");
                        break;
                    }
                    continue;
                }
                Some(Err(e)) => {
                    self.set_state(ConductorState::Draining);
                    return Err(ConductorError::MessageProcessing(e));
                }
                Some(Ok(message)) => {
                    idle_since = None;
                    message
                }
            };

            match self.handle_message(&message)? {
                Some(Decision::Send(frame)) => {
                    sender.send(frame).await?;
                    next_offset = message.offset() + 1;
                }
                Some(Decision::FilteredOut) => {
                    next_offset = message.offset() + 1;
                }
                None => {
                    // Transformer error: logged already, offset held back so
                    // the message is retried on the next call.
                }
            }
        }

        self.set_state(ConductorState::Draining);
        self.set_state(ConductorState::Terminated);
        Ok(next_offset)
    }

    fn handle_message(&self, message: &BorrowedMessage<'_>) -> Result<Option<Decision>, ConductorError> {
        let raw_headers = match message.headers() {
            Some(headers) => headers
                .iter()
                .map(|h| RawHeader {
                    name: h.key.to_string(),
                    value: h.value.map(|v| v.to_vec()),
                })
                .collect(),
            None => Vec::new(),
        };

        match process_message(
            message.topic(),
            message.offset(),
            message.key().map(|k| k.to_vec()),
            message.payload().map(|p| p.to_vec()),
            raw_headers,
            self.filter.as_ref(),
            &self.config.attributes,
            &self.config.shared_header_allowlist,
        ) {
            Ok(decision) => Ok(Some(decision)),
            Err(e) => {
                warn!(error = %e, offset = message.offset(), "skipping message with undecodable header");
                Ok(None)
            }
        }
    }
}

impl Drop for MessageConductor {
    fn drop(&mut self) {
        info!(topic = %self.config.topic, "message conductor resources released");
    }
}
