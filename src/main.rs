mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod store;
mod utils;

use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, StoreBackend};
use state::AppState;
use store::{memory::MemoryStore, postgres::SeaOrmStore, Store};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pharmia_backend=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::from_env().map_err(|e| std::io::Error::other(e.to_string()))?;

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url.as_deref().unwrap_or_default();
            tracing::info!("connecting to database");
            let db = db::establish_connection(database_url)
                .await
                .map_err(|e| std::io::Error::other(format!("Failed to connect to database: {}", e)))?;
            tracing::info!("database connected");
            Arc::new(SeaOrmStore::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let (host, port) = (config.host.clone(), config.port);
    let state = web::Data::new(AppState::new(store, config));

    tracing::info!("starting server on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure_routes)
    })
        .bind((host.as_str(), port))?
        .run()
        .await
}
