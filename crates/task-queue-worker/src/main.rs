use clap::Parser;
use std::sync::Arc;
use task_queue_core::TaskRepository;
use task_queue_persistence::RedisStore;
use task_queue_worker::server::{create_router, ServerState};
use task_queue_worker::{Consumer, PayloadLengthProcessor, WorkerConfig, WorkerMetrics};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tq-worker")]
#[command(about = "Task consumer", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Redis address
    #[arg(long, env = "REDIS_ADDR")]
    redis_addr: Option<String>,

    /// Port for health and metrics endpoints
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => WorkerConfig::from_file(path)?,
        None => WorkerConfig::default(),
    };

    // Override with CLI args / environment
    if let Some(redis_addr) = args.redis_addr {
        config.redis_addr = redis_addr;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!("Starting worker with config: {:?}", config);

    let store = Arc::new(RedisStore::connect(&config.redis_addr).await?);
    let metrics = Arc::new(WorkerMetrics::new()?);

    // Health and metrics server
    let app = create_router(ServerState {
        store: store.clone(),
        metrics: metrics.clone(),
    });
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Worker metrics server listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    let consumer = Consumer::new(
        TaskRepository::new(store),
        Arc::new(PayloadLengthProcessor::default()),
        metrics,
    );

    // An in-flight task is abandoned at whatever state was last written
    tokio::select! {
        _ = consumer.run() => {}
        _ = shutdown_signal() => {
            tracing::info!("Shutting down worker...");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
