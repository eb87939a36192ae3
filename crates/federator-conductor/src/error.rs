//! Error taxonomy for the message conductor.

#[derive(Debug, thiserror::Error)]
pub enum ConductorError {
    #[error("failed to configure kafka consumer: {0}")]
    KafkaConfig(#[from] rdkafka::error::KafkaError),
    #[error("consumer poll failed: {0}")]
    MessageProcessing(#[source] rdkafka::error::KafkaError),
    #[error("send to transport failed: {0}")]
    Send(#[from] tonic::Status),
}
