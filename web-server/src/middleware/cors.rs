// web-server/src/middleware/cors.rs
use actix_cors::Cors;
use actix_web::http::Method;

const PREFLIGHT_MAX_AGE_SECS: usize = 86400;

/// CORS policy for the configured origin allow-list.
///
/// Requests from other origins are passed through without CORS headers and
/// left for the browser to refuse.
pub fn cors(allowed_origins: &[String]) -> Cors {
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods([Method::GET, Method::POST])
        .allow_any_header()
        .supports_credentials()
        .block_on_origin_mismatch(false)
        .max_age(PREFLIGHT_MAX_AGE_SECS)
}
