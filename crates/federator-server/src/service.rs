//! The `Federator` gRPC service implementation: wires an authenticated
//! call into either a [`MessageConductor`] or the file-request
//! conductor, each driven through a [`FlowControlledSender`] to the
//! call's outbound half.

use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use federator_conductor::{ConductorConfig, MessageConductor};
use federator_filter::FilterRegistry;
use federator_proto::federator_server::Federator;
use federator_proto::{EventFrame, FileStreamItem, TopicRequest};
use federator_storage::FileProvider;
use federator_transport::{AuthenticatedClient, FlowControlledSender};
use federator_types::ProducerConfig;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::{error, info, warn};

use crate::file_conductor::{run_file_conductor, FileConductorConfig};

/// Channel depth for the outbound stream; small on purpose so
/// backpressure from a slow consumer is felt quickly by the
/// flow-controlled sender.
const OUTBOUND_CHANNEL_DEPTH: usize = 16;

pub struct FederatorService {
    pub producer_config: Arc<RwLock<Arc<ProducerConfig>>>,
    pub kafka_bootstrap_servers: String,
    pub kafka_group_id_prefix: String,
    pub shared_header_allowlist: Vec<String>,
    pub inactivity_timeout: Duration,
    pub storage: Arc<dyn FileProvider>,
    pub file_chunk_size: usize,
    /// Parent shutdown token; each call gets a child so a process-wide
    /// shutdown cancels every in-flight call.
    pub shutdown: CancellationToken,
}

impl FederatorService {
    fn authenticated_client_id(request: &Request<TopicRequest>) -> Result<String, Status> {
        request
            .extensions()
            .get::<AuthenticatedClient>()
            .map(|authed| authed.client_id.clone())
            .ok_or_else(|| Status::unauthenticated("call context is missing an authenticated client id"))
    }
}

#[tonic::async_trait]
impl Federator for FederatorService {
    type StreamEventsStream = Pin<Box<dyn tokio_stream::Stream<Item = Result<EventFrame, Status>> + Send + 'static>>;
    type StreamFilesStream = Pin<Box<dyn tokio_stream::Stream<Item = Result<FileStreamItem, Status>> + Send + 'static>>;

    async fn stream_events(
        &self,
        request: Request<TopicRequest>,
    ) -> Result<Response<Self::StreamEventsStream>, Status> {
        let client_id = Self::authenticated_client_id(&request)?;
        let topic_request = request.into_inner();

        let config = Arc::clone(&*self.producer_config.read().unwrap());
        let (_producer, _product, consumer) = config
            .find_by_topic_and_client(&topic_request.topic, &client_id)
            .ok_or_else(|| Status::permission_denied("client is not entitled to this topic"))?;
        let attributes = consumer.attributes.clone();

        let conductor_config = ConductorConfig {
            bootstrap_servers: self.kafka_bootstrap_servers.clone(),
            group_id: format!("{}-{}", self.kafka_group_id_prefix, client_id),
            topic: topic_request.topic.clone(),
            partition: 0,
            start_offset: topic_request.offset,
            attributes,
            shared_header_allowlist: self.shared_header_allowlist.clone(),
            inactivity_timeout: self.inactivity_timeout,
        };
        let filter = FilterRegistry::HeaderAttribute.build();
        let conductor = MessageConductor::init(conductor_config, filter)
            .map_err(|e| Status::internal(format!("failed to bind to topic: {e}")))?;

        let (tx, rx) = mpsc::channel(OUTBOUND_CHANNEL_DEPTH);
        let cancel = self.shutdown.child_token();
        let sender = Arc::new(FlowControlledSender::new(tx, cancel.clone()));
        let topic = topic_request.topic.clone();

        tokio::spawn(async move {
            match conductor.run(&sender, cancel).await {
                Ok(next_offset) => {
                    info!(topic, client_id, next_offset, "stream_events call completed");
                }
                Err(e) => {
                    warn!(topic, client_id, error = %e, "stream_events call aborted");
                    sender.error(Status::internal(e.to_string())).await;
                }
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    async fn stream_files(
        &self,
        request: Request<TopicRequest>,
    ) -> Result<Response<Self::StreamFilesStream>, Status> {
        let client_id = Self::authenticated_client_id(&request)?;
        let topic_request = request.into_inner();

        let config = Arc::clone(&*self.producer_config.read().unwrap());
        if config
            .find_by_topic_and_client(&topic_request.topic, &client_id)
            .is_none()
        {
            return Err(Status::permission_denied("client is not entitled to this topic"));
        }

        let file_conductor_config = FileConductorConfig {
            bootstrap_servers: self.kafka_bootstrap_servers.clone(),
            group_id: format!("{}-files-{}", self.kafka_group_id_prefix, client_id),
            topic: topic_request.topic.clone(),
            partition: 0,
            start_offset: topic_request.offset,
            chunk_size: self.file_chunk_size,
            inactivity_timeout: self.inactivity_timeout,
        };

        let (tx, rx) = mpsc::channel(OUTBOUND_CHANNEL_DEPTH);
        let cancel = self.shutdown.child_token();
        let sender = Arc::new(FlowControlledSender::new(tx, cancel.clone()));
        let storage = Arc::clone(&self.storage);
        let topic = topic_request.topic.clone();

        tokio::spawn(async move {
            match run_file_conductor(file_conductor_config, storage.as_ref(), &sender, cancel).await {
                Ok(next_offset) => {
                    info!(topic, client_id, next_offset, "stream_files call completed");
                }
                Err(e) => {
                    error!(topic, client_id, error = %e, "stream_files call aborted");
                    sender.error(Status::internal(e.to_string())).await;
                }
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}
