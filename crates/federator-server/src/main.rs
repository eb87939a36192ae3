//! Producer-side server binary: serves `Federator` over gRPC and an
//! internal HTTP server exposing `/healthz` and `/metrics`: spawn an
//! axum internal server alongside the main gRPC server, run forever,
//! fail loudly on startup errors.

mod config;
mod file_conductor;
mod service;
mod storage;

use std::net::SocketAddr;
use std::process;
use std::sync::{Arc, RwLock};

use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use federator_storage::FileProvider;
use federator_transport::auth::ServerAuthInterceptor;
use federator_types::ProducerConfig;
use prometheus::{Encoder, TextEncoder};
use tokio_util::sync::CancellationToken;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::info;

use crate::config::ServerArgs;
use crate::service::FederatorService;

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();
    tracing_subscriber::fmt::init();

    if let Err(err) = run(args).await {
        tracing::error!(error = format!("{err:#}"), "federator-server: fatal startup error");
        process::exit(1);
    }
}

async fn run(args: ServerArgs) -> anyhow::Result<()> {
    let producer_config = load_producer_config(&args.producer_config_path)
        .with_context(|| format!("loading {}", args.producer_config_path.display()))?;
    let producer_config = Arc::new(RwLock::new(Arc::new(producer_config)));

    let storage = storage::build_storage(&args)
        .await
        .context("building the configured file storage backend")?;
    let storage: Arc<dyn FileProvider> = Arc::new(storage);

    let shutdown = CancellationToken::new();

    let service = FederatorService {
        producer_config: Arc::clone(&producer_config),
        kafka_bootstrap_servers: args.kafka_bootstrap_servers.clone(),
        kafka_group_id_prefix: args.kafka_group_id_prefix.clone(),
        shared_header_allowlist: args.shared_header_allowlist.clone(),
        inactivity_timeout: args.inactivity_timeout(),
        storage,
        file_chunk_size: 64 * 1024,
        shutdown: shutdown.clone(),
    };

    let interceptor = ServerAuthInterceptor::new(args.idp_client_id.clone(), Arc::clone(&producer_config));
    let federator_service =
        federator_proto::federator_server::FederatorServer::with_interceptor(service, interceptor);

    let mut server = Server::builder()
        .tcp_keepalive(Some(args.keep_alive_time()))
        .timeout(args.keep_alive_timeout());
    if args.mtls_enabled {
        let cert_chain_file = args
            .cert_chain_file
            .as_ref()
            .context("server.mtlsEnabled but no server.certChainFile configured")?;
        let private_key_file = args
            .private_key_file
            .as_ref()
            .context("server.mtlsEnabled but no server.privateKeyFile configured")?;
        let cert = std::fs::read(cert_chain_file)
            .with_context(|| format!("reading {}", cert_chain_file.display()))?;
        let key = std::fs::read(private_key_file)
            .with_context(|| format!("reading {}", private_key_file.display()))?;
        server = server
            .tls_config(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
            .context("configuring server TLS identity")?;
    }

    let grpc_addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse().unwrap();
    let metrics_addr: SocketAddr = format!("0.0.0.0:{}", args.metrics_port).parse().unwrap();

    let metrics_shutdown = shutdown.clone();
    let metrics_server = tokio::spawn(async move {
        info!(%metrics_addr, "serving internal health/metrics endpoint");
        let app = Router::new()
            .route("/healthz", get(|| async { "ok" }))
            .route("/metrics", get(metrics_handler));
        axum::Server::bind(&metrics_addr)
            .serve(app.into_make_service())
            .with_graceful_shutdown(async move { metrics_shutdown.cancelled().await })
            .await
    });

    let grpc_shutdown = shutdown.clone();
    info!(%grpc_addr, "serving Federator gRPC service");
    let grpc_server = server
        .add_service(federator_service)
        .serve_with_shutdown(grpc_addr, async move { grpc_shutdown.cancelled().await });

    tokio::select! {
        result = grpc_server => result.context("gRPC server exited")?,
        result = metrics_server => result.context("metrics server task panicked")?.context("metrics server exited")?,
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, cancelling in-flight calls");
            shutdown.cancel();
        }
    }

    Ok(())
}

fn load_producer_config(path: &std::path::Path) -> anyhow::Result<ProducerConfig> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn metrics_handler() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .expect("encoding prometheus metrics");
    String::from_utf8(buffer).expect("prometheus metrics are valid utf-8")
}
