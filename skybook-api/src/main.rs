use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use skybook_api::{app, worker::start_reconciliation_worker, AppState, AuthConfig};
use skybook_core::Store;
use skybook_store::app_config::{Config, StoreBackend};
use skybook_store::{DbClient, MemoryStore, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skybook_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Skybook API on port {}", config.server.port);

    let store: Arc<dyn Store> = match config.store.backend {
        StoreBackend::Postgres => {
            let db = DbClient::new(&config.database)
                .await
                .expect("Failed to connect to Postgres");
            if config.database.run_migrations {
                db.migrate().await.expect("Failed to run migrations");
            }
            Arc::new(PgStore::from_client(&db))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let auth = AuthConfig::new(
        config.auth.jwt_secret.clone(),
        config.auth.jwt_expiration_seconds,
        &config.auth.admin_emails,
    );
    let app_state = AppState::new(store, auth, config.store.query_timeout());

    if config.reconciliation.enabled {
        start_reconciliation_worker(
            app_state.reconciler.clone(),
            Duration::from_secs(config.reconciliation.interval_seconds.max(1)),
        );
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
