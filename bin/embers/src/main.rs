//! # Embers Binary
//!
//! The entry point that assembles the application based on compile-time
//! features: store and media plugins are selected by cargo features, the
//! cleanup scheduler is spawned next to the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use em_api::handlers::AppState;
use em_api::middleware;
use em_core::traits::{ContentStore, MediaStore};
use em_services::posts::PostService;
use em_services::rooms::RoomService;
use em_services::sweeper::{CleanupScheduler, DEFAULT_SWEEP_INTERVAL};

#[cfg(feature = "db-sqlite")]
use em_db_sqlite::SqliteContentStore;

#[cfg(feature = "media-local")]
use em_media_local::LocalMediaStore;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // 1. Initialize the content store. A store that cannot come up is fatal.
    #[cfg(feature = "db-sqlite")]
    let store: Arc<dyn ContentStore> = Arc::new(
        SqliteContentStore::new(&env_or("DATABASE_URL", "sqlite:embers.db?mode=rwc"))
            .await
            .expect("failed to initialize the SQLite content store"),
    );

    // 2. Initialize the media store.
    #[cfg(feature = "media-local")]
    let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(
        env_or("MEDIA_ROOT", "./data/media").into(),
        env_or("MEDIA_URL_PREFIX", "/media"),
    ));

    // 3. Start the cleanup scheduler (hourly unless overridden).
    let sweep_interval = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_SWEEP_INTERVAL);
    let sweeper = CleanupScheduler::new(Arc::clone(&store), sweep_interval).start();

    // 4. Wrap the services in shared app state.
    let state = web::Data::new(AppState {
        rooms: RoomService::new(Arc::clone(&store)),
        posts: PostService::new(Arc::clone(&store), media),
    });

    let bind_addr = env_or("BIND_ADDR", "127.0.0.1:8080");
    log::info!("embers starting on http://{bind_addr}");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::standard_middleware())
            .wrap(middleware::cors_policy())
            .configure(em_api::configure_routes)
    })
    .bind(&bind_addr)?
    .run()
    .await;

    sweeper.stop().await;
    server
}
