//! CLI/env configuration surface for the consumer-side client:
//! management-node, IDP, redis, storage and polling configuration. As
//! with the server binary, the properties-file loader that ultimately
//! supplies these values is an external collaborator; this struct is
//! the already-parsed typed shape the core consumes.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "federator-client", version)]
pub struct ClientArgs {
    /// This tenant's own idp client id, used both for the bearer
    /// token `azp` claim and as the `client_id` on every `TopicRequest`.
    #[arg(long = "idp.client.id", env = "IDP_CLIENT_ID")]
    pub idp_client_id: String,

    /// `idp.client.secret`.
    #[arg(long = "idp.client.secret", env = "IDP_CLIENT_SECRET")]
    pub idp_client_secret: Option<String>,

    /// `idp.token.url`.
    #[arg(long = "idp.token.url", env = "IDP_TOKEN_URL")]
    pub idp_token_url: String,

    /// `idp.jwks.url`.
    #[arg(long = "idp.jwks.url", env = "IDP_JWKS_URL")]
    pub idp_jwks_url: String,

    /// `idp.mtls.enabled`.
    #[arg(long = "idp.mtls.enabled", env = "IDP_MTLS_ENABLED", default_value_t = false)]
    pub idp_mtls_enabled: bool,

    /// `idp.keystore.path`.
    #[arg(long = "idp.keystore.path", env = "IDP_KEYSTORE_PATH")]
    pub idp_keystore_path: Option<String>,

    /// `idp.keystore.password`.
    #[arg(long = "idp.keystore.password", env = "IDP_KEYSTORE_PASSWORD")]
    pub idp_keystore_password: Option<String>,

    /// `management.node.base.url`: where this tenant's producer/
    /// consumer graph and recurring-job declarations are fetched from.
    #[arg(long = "management.node.base.url", env = "MANAGEMENT_NODE_BASE_URL")]
    pub management_node_base_url: String,

    /// `management.node.request.timeout`, in seconds.
    #[arg(long = "management.node.request-timeout-secs", env = "MANAGEMENT_NODE_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub management_node_request_timeout_secs: u64,

    /// Stable id this client identifies its management node by, for
    /// scheduler reconciliation and KV token-cache namespacing.
    #[arg(long = "management.node.id", env = "MANAGEMENT_NODE_ID", default_value_t = federator_types::DEFAULT_MANAGEMENT_NODE_ID.to_string())]
    pub management_node_id: String,

    /// `poll.duration`, in seconds: how often the management node's
    /// declared job graph is re-fetched and reconciled.
    #[arg(long = "poll.duration-secs", env = "POLL_DURATION_SECS", default_value_t = 30)]
    pub poll_duration_secs: u64,

    /// `inactivity.timeout`, in seconds, passed through on every
    /// `TopicRequest` as this client's desired idle cutoff. Inactivity
    /// shutdown is decided server-side, but the client reports its own
    /// preference so a shared deployment can tune it per tenant.
    #[arg(long = "inactivity.timeout-secs", env = "INACTIVITY_TIMEOUT_SECS", default_value_t = 300)]
    pub inactivity_timeout_secs: u64,

    /// `cache.ttl.seconds`: fallback TTL for KV entries that don't
    /// carry their own (tokens always use `expires_in`; this applies
    /// to the best-effort `KvStore::set` path only).
    #[arg(long = "cache.ttl.seconds", env = "CACHE_TTL_SECONDS", default_value_t = 300)]
    pub cache_ttl_seconds: u64,

    /// `redis.url`. When unset, an in-process KV is used instead (fine
    /// for a single-node deployment, not durable across restarts).
    #[arg(long = "redis.url", env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Local Kafka cluster this tenant republishes consumed events to.
    #[arg(long = "kafka.bootstrap.servers", env = "KAFKA_BOOTSTRAP_SERVERS")]
    pub kafka_bootstrap_servers: String,

    /// `client.files.storage.provider`: where assembled files are
    /// published to.
    #[arg(long = "client.files.storage.provider", env = "CLIENT_FILES_STORAGE_PROVIDER", default_value = "local")]
    pub storage_provider: String,

    /// Local filesystem root, used when `storage_provider = local`.
    /// Doubles as the destination prefix handed to `ReceivedFileStorage::store`.
    #[arg(long = "client.files.local.root", env = "CLIENT_FILES_LOCAL_ROOT", default_value = "./received")]
    pub local_storage_root: PathBuf,

    /// `files.s3.bucket`.
    #[arg(long = "files.s3.bucket", env = "FILES_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// `files.azure.container`.
    #[arg(long = "files.azure.container", env = "FILES_AZURE_CONTAINER")]
    pub azure_container: Option<String>,

    /// `gcp.storage.bucket`.
    #[arg(long = "gcp.storage.bucket", env = "GCP_STORAGE_BUCKET")]
    pub gcs_bucket: Option<String>,

    /// Scratch directory for in-flight `.part` files during assembly.
    #[arg(long = "client.files.temp-dir", env = "CLIENT_FILES_TEMP_DIR", default_value = "./received/.tmp")]
    pub temp_dir: PathBuf,

    /// Port for the internal `/healthz` and `/metrics` endpoints.
    #[arg(long = "metrics-port", env = "METRICS_PORT", default_value_t = 9071)]
    pub metrics_port: u16,
}

impl ClientArgs {
    pub fn management_node_request_timeout(&self) -> Duration {
        Duration::from_secs(self.management_node_request_timeout_secs)
    }

    pub fn poll_duration(&self) -> Duration {
        Duration::from_secs(self.poll_duration_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}
