//! CLI/env configuration surface for the producer-side server:
//! `server.*`, the file storage provider, and the Kafka cluster this
//! producer reads its topics from. The properties-file loader that
//! ultimately supplies these values is an external collaborator; this
//! struct is only the already-parsed typed shape the core consumes.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "federator-server", version)]
pub struct ServerArgs {
    /// `server.port`: TCP port the `Federator` gRPC service listens on.
    #[arg(long = "server.port", env = "SERVER_PORT", default_value_t = 7070)]
    pub port: u16,

    /// `server.keepAliveTime`, in seconds.
    #[arg(long = "server.keep-alive-time-secs", env = "SERVER_KEEP_ALIVE_TIME_SECS", default_value_t = 5)]
    pub keep_alive_time_secs: u64,

    /// `server.keepAliveTimeout`, in seconds.
    #[arg(long = "server.keep-alive-timeout-secs", env = "SERVER_KEEP_ALIVE_TIMEOUT_SECS", default_value_t = 1)]
    pub keep_alive_timeout_secs: u64,

    /// `server.mtlsEnabled`.
    #[arg(long = "server.mtls-enabled", env = "SERVER_MTLS_ENABLED", default_value_t = false)]
    pub mtls_enabled: bool,

    /// `server.certChainFile`.
    #[arg(long = "server.cert-chain-file", env = "SERVER_CERT_CHAIN_FILE")]
    pub cert_chain_file: Option<PathBuf>,

    /// `server.privateKeyFile`.
    #[arg(long = "server.private-key-file", env = "SERVER_PRIVATE_KEY_FILE")]
    pub private_key_file: Option<PathBuf>,

    /// The IDP client id this server identifies as in token audiences.
    #[arg(long = "idp.client.id", env = "IDP_CLIENT_ID")]
    pub idp_client_id: String,

    /// Path to the already-refreshed `ProducerConfig` snapshot (JSON),
    /// materialized by the out-of-scope management-node refresh
    /// collaborator.
    #[arg(long = "producer-config-path", env = "PRODUCER_CONFIG_PATH")]
    pub producer_config_path: PathBuf,

    /// Kafka bootstrap servers for the topics this producer exposes.
    #[arg(long = "kafka.bootstrap.servers", env = "KAFKA_BOOTSTRAP_SERVERS")]
    pub kafka_bootstrap_servers: String,

    /// Consumer-group id prefix this server uses per call (one group
    /// per calling client, so independent clients get independent
    /// partition assignments).
    #[arg(long = "kafka.group-id-prefix", env = "KAFKA_GROUP_ID_PREFIX", default_value = "federator-server")]
    pub kafka_group_id_prefix: String,

    /// Record header names forwarded verbatim as
    /// `EventFrame.shared_headers`, comma separated.
    #[arg(long = "shared-header-allowlist", env = "SHARED_HEADER_ALLOWLIST", value_delimiter = ',', default_value = "Security-Label")]
    pub shared_header_allowlist: Vec<String>,

    /// `inactivity.timeout`, in seconds. `0` means "signal unavailable
    /// on the first idle tick".
    #[arg(long = "inactivity.timeout-secs", env = "INACTIVITY_TIMEOUT_SECS", default_value_t = 300)]
    pub inactivity_timeout_secs: u64,

    /// `client.files.storage.provider` read side: which backend this
    /// producer reads source files from for `StreamFiles`.
    #[arg(long = "files.storage.provider", env = "FILES_STORAGE_PROVIDER", default_value = "local")]
    pub storage_provider: String,

    /// Local filesystem root, used when `storage_provider = local`.
    #[arg(long = "files.local.root", env = "FILES_LOCAL_ROOT", default_value = ".")]
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

    /// Port for the internal `/healthz` and `/metrics` endpoints.
    #[arg(long = "metrics-port", env = "METRICS_PORT", default_value_t = 9070)]
    pub metrics_port: u16,
}

impl ServerArgs {
    pub fn keep_alive_time(&self) -> Duration {
        Duration::from_secs(self.keep_alive_time_secs)
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_secs(self.keep_alive_timeout_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}
