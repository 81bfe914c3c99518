// web-server/src/api/mod.rs
pub mod health;
pub mod sessions;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(health::health).service(
        actix_web::web::scope("/api")
            .app_data(sessions::json_config())
            .service(sessions::api_index)
            .service(sessions::store_session)
            .service(sessions::get_chain_session)
            .service(sessions::get_user_sessions),
    );
}
