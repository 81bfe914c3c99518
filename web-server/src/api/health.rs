// web-server/src/api/health.rs
use actix::Addr;
use actix_web::{get, web, HttpResponse};
use session_common::models::HealthResponse;

use crate::error::StoreError;
use crate::session_store::{GetStorageStatus, SessionStoreActor};

#[get("/health")]
pub async fn health(store: web::Data<Addr<SessionStoreActor>>) -> Result<HttpResponse, StoreError> {
    let connected = store.send(GetStorageStatus).await?;
    Ok(HttpResponse::Ok().json(HealthResponse::new(connected)))
}
