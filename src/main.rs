use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use summary_catalog::{
    api,
    auth::PasswordHasher,
    catalog::Catalog,
    config::Config,
    content::ContentRoot,
    notify::{LogNotifier, Notifier, TelegramNotifier},
    storage::Database,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "summary-catalog starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize database
    let db = Database::open(&config.node.data_dir)?;
    info!("Database opened at: {}", config.node.data_dir);

    // Initialize the content root
    let content = ContentRoot::new(&config.storage.content_root)?;
    info!("Content root at: {}", content.path().display());

    // Pick the notifier
    let notifier: Arc<dyn Notifier> = match config.telegram() {
        Some((token, chat_id)) => {
            info!("Sending summary notifications to Telegram chat {}", chat_id);
            Arc::new(TelegramNotifier::new(
                token,
                chat_id,
                &config.notifier.public_url,
            )?)
        }
        None => {
            info!("Telegram not configured, notifications go to the log");
            Arc::new(LogNotifier)
        }
    };

    let hasher = PasswordHasher::new(config.password_hash_iterations());
    let catalog = Catalog::new(db, content, notifier, hasher);

    if let (Some(email), Some(password)) = (
        config.auth.bootstrap_email.as_deref(),
        config.auth.bootstrap_password.as_deref(),
    ) {
        catalog.ensure_bootstrap_author(email, password).await?;
    }

    // Create shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        catalog,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!("Listening on: {}", config.node.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
