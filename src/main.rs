use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use session_core::auth::{
    PgRefreshStore, PgUserDirectory, RefreshStore, RetentionSweeper, SessionManager, TokenCodec,
};
use session_core::configuration::get_configuration;
use session_core::middleware::PublicRoutes;
use session_core::startup::{run, AppState};
use session_core::telemetry::init_telemetry;

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = init_telemetry("info") {
        eprintln!("Failed to initialise telemetry: {}", e);
    }

    tracing::info!("Starting session service");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let codec = TokenCodec::new(&configuration.jwt).map_err(|e| {
        tracing::error!("Invalid JWT configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        startup_error(std::io::ErrorKind::Other, "Migration error")
    })?;

    let store: Arc<dyn RefreshStore> = Arc::new(PgRefreshStore::new(pool.clone()));
    let settings = configuration.session.clone();

    let sweeper = settings
        .validate(configuration.jwt.refresh_token_expiry)
        .and_then(|_| RetentionSweeper::new(store.clone(), settings.retention_days))
        .map_err(|e| {
            tracing::error!("Invalid session configuration: {}", e);
            startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
        })?;
    let _sweeper = sweeper.spawn(std::time::Duration::from_secs(settings.sweep_interval_seconds));
    tracing::info!(
        retention_days = settings.retention_days,
        interval_seconds = settings.sweep_interval_seconds,
        "Refresh token sweeper scheduled"
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let state = AppState {
        session: SessionManager::new(codec, store),
        directory: Arc::new(PgUserDirectory::new(pool)),
        session_settings: settings,
        public_routes: PublicRoutes::default(),
    };

    run(listener, state)?.await
}
