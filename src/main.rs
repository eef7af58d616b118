use letterbox::config::AppConfig;
use letterbox::store::{MemoryStore, PgStore, Store};
use letterbox::{build_router, db, AppState};
use std::sync::Arc;

/// How often expired session rows are swept.
const SESSION_PURGE_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = AppConfig::from_env()?;

    // Postgres when configured, otherwise an in-process store
    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(db_url) => {
            tracing::info!("Connecting to PostgreSQL...");
            let pool = db::create_pool(&config, db_url).await?;
            tracing::info!("✅ Database ready");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not found. Using the in-memory store; data will not survive a restart.");
            tracing::info!("To enable persistence, set: DATABASE_URL");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_addr = config.bind_addr.clone();
    let shared_state = Arc::new(AppState::new(store, config));

    // Sweep expired sessions in the background
    let purge_state = shared_state.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(SESSION_PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match purge_state.store.purge_expired_sessions(chrono::Utc::now()).await {
                Ok(0) => tracing::debug!("No expired sessions to purge"),
                Ok(purged) => tracing::info!("🧹 Purged {} expired sessions", purged),
                Err(e) => tracing::error!("❌ Session purge failed: {}", e),
            }
        }
    });

    let app = build_router(shared_state);

    // Run the server with ConnectInfo so request logs carry the peer address
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Get log level from environment or default to INFO for production
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,letterbox=trace,sqlx=info,hyper=info,tower=info".to_string()
        } else {
            "info,letterbox=info,sqlx=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for production (easier for log aggregation)
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed()
    } else {
        // Human-readable logging for development
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("✉️ Letterbox starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);

    Ok(())
}
