// web-server/src/api/sessions.rs
use actix::Addr;
use actix_web::{error::InternalError, get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use session_common::models::{ApiError, ApiResponse, SessionRecord, MISSING_FIELDS_ERROR};

use crate::error::StoreError;
use crate::session_store::{GetChainSession, GetUserContext, SessionStoreActor, StoreSession};

/// Body of a store request. Fields are optional so a missing one yields the
/// same 400 as an empty one instead of a generic deserialization error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSessionBody {
    pub user_address: Option<String>,
    pub chain_id: Option<u64>,
    pub session_data: Option<SessionRecord>,
}

impl StoreSessionBody {
    fn into_message(self) -> Option<StoreSession> {
        let user_address = self.user_address.filter(|a| !a.trim().is_empty())?;
        let chain_id = self.chain_id.filter(|c| *c != 0)?;
        let session = self.session_data?;
        Some(StoreSession { user_address, chain_id, session })
    }
}

/// JSON extractor config for the API scope: malformed bodies are reported
/// with the missing-fields error
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        tracing::warn!("Rejected store body: {}", err);
        let body = ApiError::new(MISSING_FIELDS_ERROR).with_details(err.to_string());
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Session Relay API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// Store or overwrite the session of a user on one chain
#[post("/session/store")]
pub async fn store_session(
    body: web::Json<StoreSessionBody>,
    store: web::Data<Addr<SessionStoreActor>>,
) -> Result<HttpResponse, StoreError> {
    let msg = match body.into_inner().into_message() {
        Some(msg) => msg,
        None => return Ok(HttpResponse::BadRequest().json(ApiError::new(MISSING_FIELDS_ERROR))),
    };

    let receipt = store.send(msg).await??;
    let message = format!(
        "Session data stored successfully for user {} on chain {}",
        receipt.user_id, receipt.chain_id
    );

    Ok(HttpResponse::Ok().json(ApiResponse::ok(receipt).with_message(message)))
}

// Get the session of a user on one chain
#[get("/session/{user_address}/{chain_id}")]
pub async fn get_chain_session(
    path: web::Path<(String, String)>,
    store: web::Data<Addr<SessionStoreActor>>,
) -> Result<HttpResponse, StoreError> {
    let (user_address, chain_id) = path.into_inner();
    let session = store.send(GetChainSession { user_address, chain_id }).await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(session)))
}

// Get every session of a user
#[get("/session/{user_address}")]
pub async fn get_user_sessions(
    path: web::Path<(String,)>,
    store: web::Data<Addr<SessionStoreActor>>,
) -> Result<HttpResponse, StoreError> {
    let user_address = path.into_inner().0;
    let context = store.send(GetUserContext { user_address }).await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(context)))
}
