//! Producer configuration: the immutable snapshot describing which
//! producers expose which topics to which consumers, and under what
//! attribute entitlements.
//!
//! This is the single canonical shape, replacing the several
//! near-identical `ProducerConfigDTO` definitions scattered across the
//! original management-node/producer/client split.

use serde::{Deserialize, Serialize};

/// A single `name=value` (or `name:value`) entitlement attribute
/// attached to a consumer for a given product/topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributesDTO {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub idp_client_id: String,
    #[serde(default)]
    pub attributes: Vec<AttributesDTO>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub topic: String,
    #[serde(default)]
    pub consumers: Vec<Consumer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
    pub idp_client_id: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Immutable snapshot of the full producer/consumer graph, refreshed
/// wholesale from the management node; mutated only by a refresh
/// against that collaborator, never in place by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConfig {
    #[serde(default)]
    pub producers: Vec<Producer>,
}

impl ProducerConfig {
    /// Finds the product/consumer tuple authorising `idp_client_id` to
    /// read `topic` from `producer_name`. Used by the server-side auth
    /// interceptor.
    pub fn authorize(
        &self,
        producer_name: &str,
        topic: &str,
        idp_client_id: &str,
    ) -> Option<&Consumer> {
        self.producers
            .iter()
            .find(|p| p.name == producer_name)?
            .products
            .iter()
            .find(|p| p.topic == topic)?
            .consumers
            .iter()
            .find(|c| c.idp_client_id.eq_ignore_ascii_case(idp_client_id))
    }

    /// Finds any product/consumer tuple (across all producers) that
    /// authorises `idp_client_id`, regardless of topic. This is the
    /// check the transport-layer interceptor runs, since the topic is
    /// only known once the call body is read.
    pub fn is_known_client(&self, idp_client_id: &str) -> bool {
        self.producers.iter().any(|p| {
            p.products
                .iter()
                .any(|prod| prod.consumers.iter().any(|c| c.idp_client_id.eq_ignore_ascii_case(idp_client_id)))
        })
    }

    /// Resolves the `(producer, product, consumer)` tuple serving
    /// `topic` to `idp_client_id`, regardless of which producer owns
    /// it. `TopicRequest` only carries `client_id` and `topic`, not a
    /// producer name, so the server's call handler needs this
    /// topic-first lookup to find the owning producer (for its Kafka
    /// bootstrap identity) and the consumer's entitlement attributes
    /// in one step.
    pub fn find_by_topic_and_client(
        &self,
        topic: &str,
        idp_client_id: &str,
    ) -> Option<(&Producer, &Product, &Consumer)> {
        self.producers.iter().find_map(|producer| {
            let product = producer.products.iter().find(|p| p.topic == topic)?;
            let consumer = product
                .consumers
                .iter()
                .find(|c| c.idp_client_id.eq_ignore_ascii_case(idp_client_id))?;
            Some((producer, product, consumer))
        })
    }

    /// Every `(producer, topic)` pair that `consumer_idp_client_id` may
    /// read, used by the client-side scheduler to reconcile recurring
    /// jobs.
    pub fn topics_for_consumer<'a>(
        &'a self,
        consumer_idp_client_id: &'a str,
    ) -> impl Iterator<Item = (&'a Producer, &'a Product)> + 'a {
        self.producers.iter().flat_map(move |producer| {
            producer.products.iter().filter_map(move |product| {
                product
                    .consumers
                    .iter()
                    .any(|c| c.idp_client_id.eq_ignore_ascii_case(consumer_idp_client_id))
                    .then_some((producer, product))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProducerConfig {
        ProducerConfig {
            producers: vec![Producer {
                name: "acme".into(),
                host: "acme.example".into(),
                port: 443,
                tls: true,
                idp_client_id: "acme-producer".into(),
                products: vec![Product {
                    name: "orders".into(),
                    topic: "orders.v1".into(),
                    consumers: vec![Consumer {
                        idp_client_id: "Consumer-A".into(),
                        attributes: vec![AttributesDTO {
                            name: "nationality".into(),
                            value: "UK".into(),
                        }],
                    }],
                }],
            }],
        }
    }

    #[test]
    fn authorize_matches_case_insensitively() {
        let cfg = sample();
        let consumer = cfg.authorize("acme", "orders.v1", "consumer-a").unwrap();
        assert_eq!(consumer.idp_client_id, "Consumer-A");
    }

    #[test]
    fn authorize_rejects_unknown_client() {
        let cfg = sample();
        assert!(cfg.authorize("acme", "orders.v1", "someone-else").is_none());
    }

    #[test]
    fn find_by_topic_and_client_resolves_owning_producer() {
        let cfg = sample();
        let (producer, product, consumer) = cfg
            .find_by_topic_and_client("orders.v1", "consumer-a")
            .unwrap();
        assert_eq!(producer.name, "acme");
        assert_eq!(product.topic, "orders.v1");
        assert_eq!(consumer.idp_client_id, "Consumer-A");
    }

    #[test]
    fn find_by_topic_and_client_misses_on_wrong_client() {
        let cfg = sample();
        assert!(cfg.find_by_topic_and_client("orders.v1", "someone-else").is_none());
    }

    #[test]
    fn topics_for_consumer_lists_all_producers() {
        let cfg = sample();
        let topics: Vec<_> = cfg
            .topics_for_consumer("consumer-a")
            .map(|(p, prod)| (p.name.clone(), prod.topic.clone()))
            .collect();
        assert_eq!(topics, vec![("acme".to_string(), "orders.v1".to_string())]);
    }
}
