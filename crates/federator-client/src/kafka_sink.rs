//! Republishes consumed [`EventFrame`]s to a local Kafka topic, using
//! the same `FutureProducer`/`FutureRecord` pairing used across the
//! retrieved pack's own Kafka sinks.

use federator_proto::EventFrame;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::time::Duration;

pub struct LocalKafkaSink {
    producer: FutureProducer,
}

impl LocalKafkaSink {
    pub fn new(bootstrap_servers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("queue.buffering.max.ms", "0")
            .create()?;
        Ok(LocalKafkaSink { producer })
    }

    /// Republishes one frame to its own topic, preserving `key` and
    /// forwarding `shared_headers` as native Kafka record headers.
    pub async fn publish(&self, frame: &EventFrame) -> Result<(), rdkafka::error::KafkaError> {
        let mut headers = rdkafka::message::OwnedHeaders::new();
        for header in &frame.shared_headers {
            headers = headers.insert(rdkafka::message::Header {
                key: &header.name,
                value: Some(header.value.as_bytes()),
            });
        }
        let record = FutureRecord::to(&frame.topic)
            .key(frame.key.as_slice())
            .payload(frame.value.as_slice())
            .headers(headers);
        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| e)?;
        Ok(())
    }
}
