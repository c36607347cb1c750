//! Plagwatch service entrypoint.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use plagwatch::config::Config;
use plagwatch::detection::{Consumer, Detector, DetectorConfig};
use plagwatch::embedding::{HttpEmbedder, HttpEmbedderConfig};
use plagwatch::events::{ChannelSource, channel};
use plagwatch::gateway::{HandlerState, create_router_with_state};
use plagwatch::lifecycle::LifecycleManager;
use plagwatch::submissions::PgSubmissionStore;
use plagwatch::threshold::ThresholdResolver;
use plagwatch::vectordb::{EmbeddingStore, QdrantEmbeddingStore};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

type Lifecycle = LifecycleManager<ChannelSource, PgSubmissionStore>;

#[tokio::main]
async fn main() -> ExitCode {
    if std::env::args().any(|arg| arg == "--health-check") {
        return ExitCode::from(run_health_check().await);
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fatal: invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_json);

    match run(config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(fatal = true, error = ?e, "fatal: startup failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let builder =
        tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env());
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Returns `Ok(false)` when the consumer ended on a fatal error.
async fn run(config: Config) -> anyhow::Result<bool> {
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        embedding_dim = config.embedding_dim,
        collection = %config.collection_name,
        "Plagwatch starting"
    );

    let submissions = Arc::new(
        PgSubmissionStore::connect(&config.database_url, config.db_max_connections)
            .await
            .context("connecting to Postgres")?,
    );

    let store = Arc::new(
        QdrantEmbeddingStore::new(&config.qdrant_url, &config.collection_name)
            .context("building Qdrant client")?,
    );
    store
        .health_check()
        .await
        .context("connecting to Qdrant")?;
    store
        .ensure_collection(config.dim_config().vector_size())
        .await
        .context("preparing embedding collection")?;

    let embedder = Arc::new(HttpEmbedder::new(HttpEmbedderConfig {
        url: config.embedding_url.clone(),
        model: config.embedding_model.clone(),
        api_key: config.embedding_api_key.clone(),
        timeout: config.embed_timeout,
    })?);

    let thresholds = ThresholdResolver::new(
        Arc::clone(&submissions),
        config.default_threshold,
        config.threshold_cache_ttl,
    );
    let detector = Arc::new(Detector::new(
        embedder,
        store,
        Arc::clone(&submissions),
        thresholds,
        DetectorConfig::from(&config),
    ));

    let (publisher, source) = channel(config.channel_capacity);
    let source = Arc::new(source);
    let lifecycle = Arc::new(LifecycleManager::new(Arc::clone(&source), submissions));
    lifecycle.start_consumer(Consumer::new(Arc::clone(&detector), source))?;

    let state = HandlerState::new(detector.search().clone(), publisher);
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&lifecycle)))
        .await?;

    let healthy = match lifecycle.shutdown().await {
        Some(exit) if exit.is_failure() => {
            tracing::error!(fatal = true, exit = ?exit, "fatal: consumer terminated");
            false
        }
        Some(exit) => {
            tracing::info!(exit = ?exit, "Consumer finished");
            true
        }
        None => true,
    };

    tracing::info!("Plagwatch shutdown complete");
    Ok(healthy)
}

async fn run_health_check() -> u8 {
    let port = std::env::var("PLAGWATCH_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);
    let url = format!("http://127.0.0.1:{port}/healthz");

    let Ok(client) = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    else {
        return 1;
    };

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal(lifecycle: Arc<Lifecycle>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = lifecycle.consumer_finished() => {
            tracing::warn!("Consumer stopped, initiating graceful shutdown");
        }
    }
}
