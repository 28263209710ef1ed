//! Line Bot Server - Main Entry Point

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use lb_server::{
    api,
    config::{self, DocumentStoreConfig},
    db::{self, DocumentStore, FirestoreStore, PgDocumentStore},
    line::LineClient,
    observability,
    storage::S3Client,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let _otel_guard = observability::init(&config::ObservabilityConfig::from_env())?;

    // Load configuration (aborts startup without channel credentials)
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Line Bot Server"
    );

    let line = LineClient::new(&config)?;

    let s3 = S3Client::new(&config);
    match s3.health_check().await {
        Ok(()) => info!(bucket = %config.storage_bucket, "Object storage connected"),
        Err(e) => warn!("Object storage health check failed: {}", e),
    }

    let documents: Arc<dyn DocumentStore> = match &config.document_store {
        DocumentStoreConfig::Firestore {
            project_id,
            base_url,
            access_token,
        } => {
            info!(project_id = %project_id, "Using Firestore document store");
            Arc::new(FirestoreStore::new(
                reqwest::Client::new(),
                base_url,
                project_id,
                access_token.clone(),
            ))
        }
        DocumentStoreConfig::Postgres { database_url } => {
            let pool = db::create_pool(database_url).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgDocumentStore::new(pool))
        }
    };

    // Build application state
    let state = api::AppState::new(api::AppStateConfig {
        config: config.clone(),
        chat: Arc::new(line),
        objects: Arc::new(s3),
        documents,
    });

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
