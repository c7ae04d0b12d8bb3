use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod import;
mod models;
mod repositories;
mod routes;
mod search;
mod settings;
mod state;

use common::database::{DatabaseConfig, health_check, init_pool};

use crate::{
    repositories::{InMemoryUserStore, PgUserStore, UserRepository, UserStore},
    settings::{AppConfig, StorageBackend},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting users service");

    let store = build_store(config.storage).await?;
    let app_state = AppState {
        user_repository: UserRepository::new(store),
        seed_file: Arc::new(config.seed_file.clone()),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Users service listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(backend: StorageBackend) -> Result<Arc<dyn UserStore>> {
    match backend {
        StorageBackend::Memory => {
            info!("Using in-memory user store");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            let store = PgUserStore::new(pool);
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
    }
}
