use clap::Parser;
use std::sync::Arc;
use task_queue_api::{create_router, ApiConfig, ApiMetrics, AppState, Producer};
use task_queue_core::TaskRepository;
use task_queue_persistence::RedisStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tq-api")]
#[command(about = "Task producer API", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Redis address
    #[arg(long, env = "REDIS_ADDR")]
    redis_addr: Option<String>,

    /// HTTP port
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => ApiConfig::from_file(path)?,
        None => ApiConfig::default(),
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

    tracing::info!("Starting API with config: {:?}", config);

    let store = Arc::new(RedisStore::connect(&config.redis_addr).await?);
    let metrics = Arc::new(ApiMetrics::new()?);
    let producer = Producer::new(TaskRepository::new(store), metrics.clone());
    let app = create_router(AppState::new(producer, metrics));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server exited");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down server...");
}
