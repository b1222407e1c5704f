use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mongodb::options::ClientOptions;

use quickpoll::app::{router, with_cors, AppState};
use quickpoll::config::{AppConfig, Cli};
use quickpoll::db::repository::{MongoPollRepository, PollRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickpoll=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli).context("Failed to load configuration")?;

    tracing::info!("Starting quickpoll server...");

    // Connect to MongoDB
    let mut client_options = ClientOptions::parse(&config.database.uri)
        .await
        .context("Failed to parse MongoDB URI")?;
    client_options.app_name = Some(config.database.app_name.clone());

    let mongo_client =
        mongodb::Client::with_options(client_options).context("Failed to create MongoDB client")?;
    let mongo_db = mongo_client.database(&config.database.name);

    let mongo_repo = MongoPollRepository::new(&mongo_db);
    mongo_repo
        .ensure_indexes()
        .await
        .context("Failed to create poll indexes")?;
    let poll_repo: Arc<dyn PollRepository> = Arc::new(mongo_repo);

    tracing::info!(database = %config.database.name, "Connected to MongoDB");

    let app = with_cors(
        router(AppState::new(poll_repo)),
        &config.cors.allowed_origins,
    );

    // Start the server
    let listener = tokio::net::TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    tracing::info!("Listening on http://{}", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down, closing MongoDB connections");
    mongo_client.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
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
}
