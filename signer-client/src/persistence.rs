// signer-client/src/persistence.rs
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use session_common::models::{
    ApiError, ApiResponse, HealthResponse, SessionRecord, StoreReceipt, StoreSessionRequest, UserContext,
};
use session_common::SessionError;
use url::Url;

/// Pushes and pulls session records keyed by (user, chain)
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Store or overwrite the record for `user` on `chain_id`
    async fn store(&self, user: &str, chain_id: u64, session: &SessionRecord) -> Result<StoreReceipt, SessionError>;

    async fn fetch(&self, user: &str, chain_id: u64) -> Result<SessionRecord, SessionError>;

    /// Every record of `user`, keyed by chain id
    async fn fetch_all(&self, user: &str) -> Result<UserContext, SessionError>;

    async fn health(&self) -> Result<HealthResponse, SessionError>;
}

/// Client of the session relay HTTP API
#[derive(Debug, Clone)]
pub struct HttpPersistenceClient {
    client: Client,
    base: Url,
}

impl HttpPersistenceClient {
    pub fn new(base_url: &str) -> Result<Self, SessionError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| SessionError::invalid(format!("invalid backend url {:?}: {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client: Client::new(), base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
        self.base
            .join(path)
            .map_err(|e| SessionError::invalid(format!("invalid relay path {:?}: {}", path, e)))
    }
}

fn transport(err: reqwest::Error) -> SessionError {
    SessionError::TransportError(err.to_string())
}

/// Map a relay response onto the error taxonomy, returning the success body
async fn read_body<T: DeserializeOwned>(response: Response) -> Result<T, SessionError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(transport);
    }

    let message = match response.json::<ApiError>().await {
        Ok(body) => body.error,
        Err(_) => format!("HTTP error! status: {}", status.as_u16()),
    };

    if status == StatusCode::NOT_FOUND {
        Err(SessionError::NotFound(message))
    } else {
        Err(SessionError::RemoteRejected { status: status.as_u16(), message })
    }
}

#[async_trait]
impl SessionPersistence for HttpPersistenceClient {
    async fn store(&self, user: &str, chain_id: u64, session: &SessionRecord) -> Result<StoreReceipt, SessionError> {
        let url = self.endpoint("api/session/store")?;
        let body = StoreSessionRequest {
            user_address: user.to_string(),
            chain_id,
            session_data: session.clone(),
        };

        tracing::debug!("POST {} for user {} on chain {}", url, user, chain_id);
        let response = self.client.post(url).json(&body).send().await.map_err(transport)?;
        let body: ApiResponse<StoreReceipt> = read_body(response).await?;
        if let Some(message) = &body.message {
            tracing::info!("{}", message);
        }
        Ok(body.data)
    }

    async fn fetch(&self, user: &str, chain_id: u64) -> Result<SessionRecord, SessionError> {
        let url = self.endpoint(&format!("api/session/{}/{}", user, chain_id))?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        let body: ApiResponse<SessionRecord> = read_body(response).await?;
        Ok(body.data)
    }

    async fn fetch_all(&self, user: &str) -> Result<UserContext, SessionError> {
        let url = self.endpoint(&format!("api/session/{}", user))?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        let body: ApiResponse<UserContext> = read_body(response).await?;
        Ok(body.data)
    }

    async fn health(&self) -> Result<HealthResponse, SessionError> {
        let url = self.endpoint("health")?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        read_body(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{dev::ServerHandle, get, post, web, App, HttpResponse, HttpServer};
    use alloy_primitives::{address, Bytes};
    use session_common::models::SELF_VALIDATION_ADDRESS;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const USER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
    const BROKEN_USER: &str = "0x000000000000000000000000000000000000dead";

    type Sessions = web::Data<Mutex<HashMap<(String, String), SessionRecord>>>;

    #[post("/api/session/store")]
    async fn fake_store(body: web::Json<StoreSessionRequest>, sessions: Sessions) -> HttpResponse {
        let body = body.into_inner();
        if body.user_address == BROKEN_USER {
            return HttpResponse::InternalServerError()
                .json(ApiError::new("Failed to store session data").with_details("bucket unavailable"));
        }

        let receipt = StoreReceipt {
            user_id: body.user_address.to_lowercase(),
            chain_id: body.chain_id.to_string(),
            session_id: body.session_data.id,
        };
        sessions
            .lock()
            .unwrap()
            .insert((receipt.user_id.clone(), receipt.chain_id.clone()), body.session_data);
        HttpResponse::Ok().json(ApiResponse::ok(receipt).with_message("stored"))
    }

    #[get("/api/session/{user}/{chain}")]
    async fn fake_fetch(path: web::Path<(String, String)>, sessions: Sessions) -> HttpResponse {
        match sessions.lock().unwrap().get(&path.into_inner()) {
            Some(session) => HttpResponse::Ok().json(ApiResponse::ok(session.clone())),
            None => HttpResponse::NotFound().json(ApiError::new("No session data found for user")),
        }
    }

    #[get("/api/session/{user}")]
    async fn fake_fetch_all(path: web::Path<(String,)>, sessions: Sessions) -> HttpResponse {
        let user = path.into_inner().0;
        let mut context = UserContext::default();
        for ((owner, chain), session) in sessions.lock().unwrap().iter() {
            if *owner == user {
                context.upsert(chain.parse().unwrap(), session).unwrap();
            }
        }
        if context.chain_count() == 0 {
            return HttpResponse::NotFound().json(ApiError::new("No session data found for user"));
        }
        HttpResponse::Ok().json(ApiResponse::ok(context))
    }

    #[get("/health")]
    async fn fake_health() -> HttpResponse {
        HttpResponse::Ok().json(HealthResponse::new(true))
    }

    /// Start a relay double on an ephemeral port
    fn start_relay() -> (String, ServerHandle) {
        let sessions: Sessions = web::Data::new(Mutex::new(HashMap::new()));
        let server = HttpServer::new(move || {
            App::new()
                .app_data(sessions.clone())
                .service(fake_store)
                .service(fake_fetch)
                .service(fake_fetch_all)
                .service(fake_health)
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        (format!("http://{}", addr), handle)
    }

    fn session(id: u64) -> SessionRecord {
        let mut session = SessionRecord::around(
            id,
            address!("1e8e3a338046913149c84002e22744780200e3be"),
            SELF_VALIDATION_ADDRESS,
            1_700_000_000,
            604_800,
        );
        session.signature = Bytes::from(vec![9u8; 65]);
        session
    }

    #[actix_web::test]
    async fn test_store_and_fetch_round_trip() {
        let (url, handle) = start_relay();
        let client = HttpPersistenceClient::new(&url).unwrap();

        let receipt = client.store(USER, 137, &session(5)).await.unwrap();
        assert_eq!(receipt, StoreReceipt { user_id: USER.into(), chain_id: "137".into(), session_id: 5 });

        assert_eq!(client.fetch(USER, 137).await.unwrap(), session(5));
        let context = client.fetch_all(USER).await.unwrap();
        assert_eq!(context.session_for("137").unwrap().unwrap(), session(5));
        assert!(client.health().await.unwrap().is_ready());

        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn test_status_mapping() {
        let (url, handle) = start_relay();
        let client = HttpPersistenceClient::new(&url).unwrap();

        let err = client.fetch(USER, 1).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
        let err = client.fetch_all(USER).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));

        let err = client.store(BROKEN_USER, 1, &session(1)).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::RemoteRejected { status: 500, message: "Failed to store session data".into() }
        );

        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn test_unreachable_relay_is_transport_error() {
        let client = HttpPersistenceClient::new("http://127.0.0.1:1").unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, SessionError::TransportError(_)));
    }

    #[test]
    fn test_base_path_is_kept() {
        let client = HttpPersistenceClient::new("https://relay.example/prefix").unwrap();
        assert_eq!(
            client.endpoint("api/session/store").unwrap().as_str(),
            "https://relay.example/prefix/api/session/store"
        );
        assert!(HttpPersistenceClient::new("not a url").is_err());
    }
}
