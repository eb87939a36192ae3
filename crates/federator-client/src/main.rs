//! Consumer-side tenant agent binary: reconciles the local scheduler
//! against the management node's declared job graph on a fixed poll
//! interval, and serves an internal `/healthz`/`/metrics` endpoint
//! alongside it.

mod config;
mod kafka_sink;
mod management;
mod storage;
mod worker;

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use federator_auth::{build_http_client, IdpConfig, TokenService};
use federator_kv::{InMemoryKv, KvStore, RedisKv};
use federator_scheduler::{Scheduler, TokioSchedulerBackend};
use federator_storage::ReceivedFileStorage;
use prometheus::{Encoder, TextEncoder};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ClientArgs;
use crate::kafka_sink::LocalKafkaSink;
use crate::management::ManagementNodeClient;
use crate::worker::WorkerContext;

#[tokio::main]
async fn main() {
    let args = ClientArgs::parse();
    tracing_subscriber::fmt::init();

    if let Err(err) = run(args).await {
        tracing::error!(error = format!("{err:#}"), "federator-client: fatal startup error");
        process::exit(1);
    }
}

async fn run(args: ClientArgs) -> anyhow::Result<()> {
    let kv: Arc<dyn KvStore> = match &args.redis_url {
        Some(url) => Arc::new(RedisKv::connect(url).await.context("connecting to redis")?),
        None => {
            warn!("redis.url not configured, falling back to an in-process (non-durable) KV store");
            Arc::new(InMemoryKv::new())
        }
    };

    let idp_config = IdpConfig {
        token_url: args.idp_token_url.clone(),
        jwks_url: args.idp_jwks_url.clone(),
        client_id: args.idp_client_id.clone(),
        client_secret: args.idp_client_secret.clone(),
        mtls_enabled: args.idp_mtls_enabled,
        keystore_path: args.idp_keystore_path.clone(),
        keystore_password: args.idp_keystore_password.clone(),
        truststore_path: None,
    };
    let idp_http = build_http_client(&idp_config).context("building IDP HTTP client")?;
    let token_service = Arc::new(TokenService::new(idp_config, idp_http.clone(), Arc::clone(&kv)));

    let management_http = reqwest::Client::builder()
        .timeout(args.management_node_request_timeout())
        .build()
        .context("building management node HTTP client")?;
    let management_client = ManagementNodeClient::new(
        management_http,
        args.management_node_base_url.clone(),
        args.idp_client_id.clone(),
    );

    let storage = storage::build_storage(&args)
        .await
        .context("building the configured file storage backend")?;
    let file_storage: Arc<dyn ReceivedFileStorage> = Arc::new(storage);

    let kafka_sink = Arc::new(
        LocalKafkaSink::new(&args.kafka_bootstrap_servers).context("constructing local Kafka producer")?,
    );

    let worker_context = Arc::new(WorkerContext {
        client_id: args.idp_client_id.clone(),
        kv: Arc::clone(&kv),
        token_service: Arc::clone(&token_service),
        kafka_sink,
        file_storage,
        temp_dir: args.temp_dir.clone(),
        inactivity_timeout: args.inactivity_timeout(),
    });

    let worker_fn: federator_scheduler::WorkerFn = Arc::new(move |job| {
        let context = Arc::clone(&worker_context);
        Box::pin(worker::run_job(context, job))
    });
    let scheduler = Arc::new(Scheduler::new(TokioSchedulerBackend, worker_fn));
    scheduler.ensure_started();

    let shutdown = CancellationToken::new();

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

    let reconcile_management_node_id = args.management_node_id.clone();
    let reconcile_scheduler = Arc::clone(&scheduler);
    let reconcile_shutdown = shutdown.clone();
    let poll_duration = args.poll_duration();
    let reconcile_loop = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_duration);
        loop {
            tokio::select! {
                _ = reconcile_shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match management_client.declared_jobs().await {
                        Ok(requests) => {
                            let jobs = requests
                                .into_iter()
                                .map(|r| r.into_job(&reconcile_management_node_id))
                                .collect();
                            if let Err(e) = reconcile_scheduler
                                .reload_recurrent_jobs(&reconcile_management_node_id, jobs)
                                .await
                            {
                                error!(error = %e, "scheduler reconciliation failed");
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to fetch the declared job graph from the management node, keeping current jobs");
                        }
                    }
                }
            }
        }
    });

    tokio::select! {
        result = metrics_server => { result.context("metrics server task panicked")?.context("metrics server exited")?; }
        result = reconcile_loop => { result.context("reconciliation loop task panicked")?; }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, draining in-flight jobs");
            shutdown.cancel();
        }
    }

    scheduler.stop().await;
    Ok(())
}

async fn metrics_handler() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .expect("encoding prometheus metrics");
    String::from_utf8(buffer).expect("prometheus metrics are valid utf-8")
}
