// web-server/src/main.rs
mod api;
mod error;
mod middleware;
mod session_store;
mod storage;

use actix::Actor;
use actix_web::{web, App, HttpServer};
use session_common::{setup_tracing, Config};

use crate::middleware::cors;
use crate::session_store::SessionStoreActor;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = Config::from_env();
    setup_tracing(&config.log_level);

    let server_addr = config.relay.bind_addr.clone();
    let allowed_origins = config.relay.allowed_origins.clone();

    let store = storage::from_config(&config.storage);
    let storage_ready = store.is_some();
    let store_addr = SessionStoreActor::new(store).start();

    tracing::info!("Starting session relay on {}", server_addr);
    tracing::info!("Health check: http://{}/health", server_addr);
    tracing::info!("Storage: {}", if storage_ready { "ready" } else { "not configured" });
    tracing::info!("Allowed origins: {}", allowed_origins.join(", "));

    let store_data = web::Data::new(store_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&allowed_origins))
            .app_data(store_data.clone())
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
