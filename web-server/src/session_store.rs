// web-server/src/session_store.rs
use actix::prelude::*;
use session_common::models::{normalize_user_id, SessionRecord, StoreReceipt, UserContext};
use std::sync::Arc;

use crate::error::StoreError;
use crate::storage::BlobStore;

/// Actor message: Store (or overwrite) the session of a user on one chain
#[derive(Message)]
#[rtype(result = "Result<StoreReceipt, StoreError>")]
pub struct StoreSession {
    pub user_address: String,
    pub chain_id: u64,
    pub session: SessionRecord,
}

/// Actor message: Get the session of a user on one chain
#[derive(Message)]
#[rtype(result = "Result<SessionRecord, StoreError>")]
pub struct GetChainSession {
    pub user_address: String,
    pub chain_id: String,
}

/// Actor message: Get every session of a user
#[derive(Message)]
#[rtype(result = "Result<UserContext, StoreError>")]
pub struct GetUserContext {
    pub user_address: String,
}

/// Actor message: Whether a storage backend is configured
#[derive(Message)]
#[rtype(result = "bool")]
pub struct GetStorageStatus;

/// SessionStoreActor owning the blob backend.
///
/// Stores run as atomic responses so the read-modify-write of one user blob
/// never interleaves with another store handled by this actor. Reads are
/// not serialized.
pub struct SessionStoreActor {
    store: Option<Arc<dyn BlobStore>>,
}

impl SessionStoreActor {
    pub fn new(store: Option<Arc<dyn BlobStore>>) -> Self {
        Self { store }
    }

    fn backend(&self) -> Result<Arc<dyn BlobStore>, StoreError> {
        self.store.clone().ok_or(StoreError::NotInitialized)
    }
}

impl Actor for SessionStoreActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        match &self.store {
            Some(store) => tracing::info!("SessionStoreActor started with backend {}", store.describe()),
            None => tracing::warn!("SessionStoreActor started without a storage backend"),
        }
    }
}

/// Fetch and decode a user blob; `Ok(None)` when the user has nothing stored
async fn read_context(store: &dyn BlobStore, key: &str) -> Result<Option<UserContext>, StoreError> {
    let body = store
        .get(key)
        .await
        .map_err(|e| StoreError::Read { details: e.to_string() })?;

    match body {
        Some(body) => UserContext::from_slice(&body)
            .map(Some)
            .map_err(|e| StoreError::Read { details: format!("corrupt user context {}: {}", key, e) }),
        None => Ok(None),
    }
}

async fn write_session(store: Arc<dyn BlobStore>, msg: StoreSession) -> Result<StoreReceipt, StoreError> {
    let user_id = normalize_user_id(&msg.user_address);
    let key = UserContext::storage_key(&msg.user_address);
    let session_id = msg.session.id;

    let existing = store
        .get(&key)
        .await
        .map_err(|e| StoreError::Write { details: e.to_string() })?;

    let mut context = match existing {
        Some(body) => match UserContext::from_slice(&body) {
            Ok(context) => {
                tracing::info!("Retrieved existing context for user {}", user_id);
                context
            },
            Err(e) => {
                tracing::warn!("Existing context for user {} is not a JSON object, replacing it: {}", user_id, e);
                UserContext::default()
            }
        },
        None => {
            tracing::info!("Creating new context for user {}", user_id);
            UserContext::default()
        }
    };

    let replaced = context
        .upsert(msg.chain_id, &msg.session)
        .map_err(|e| StoreError::Write { details: e.to_string() })?;
    if replaced.is_some() {
        tracing::debug!("Overwriting session for user {} on chain {}", user_id, msg.chain_id);
    }

    let body = serde_json::to_vec_pretty(&context)
        .map_err(|e| StoreError::Write { details: e.to_string() })?;
    store
        .put(&key, body)
        .await
        .map_err(|e| StoreError::Write { details: e.to_string() })?;

    tracing::info!("Session data stored successfully for user {} on chain {}", user_id, msg.chain_id);

    Ok(StoreReceipt { user_id, chain_id: msg.chain_id.to_string(), session_id })
}

// Handle session stores, one at a time
impl Handler<StoreSession> for SessionStoreActor {
    type Result = AtomicResponse<Self, Result<StoreReceipt, StoreError>>;

    fn handle(&mut self, msg: StoreSession, _ctx: &mut Self::Context) -> Self::Result {
        let backend = self.backend();
        AtomicResponse::new(Box::pin(
            async move { write_session(backend?, msg).await }.into_actor(self),
        ))
    }
}

// Handle retrieval of one chain's session
impl Handler<GetChainSession> for SessionStoreActor {
    type Result = ResponseFuture<Result<SessionRecord, StoreError>>;

    fn handle(&mut self, msg: GetChainSession, _ctx: &mut Self::Context) -> Self::Result {
        let backend = self.backend();
        Box::pin(async move {
            let store = backend?;
            let user_id = normalize_user_id(&msg.user_address);
            let key = UserContext::storage_key(&msg.user_address);

            let context = read_context(store.as_ref(), &key)
                .await?
                .ok_or_else(|| StoreError::UserNotFound { user_id: user_id.clone() })?;

            match context.session_for(&msg.chain_id) {
                Some(Ok(session)) => {
                    tracing::debug!("Retrieved session for user {} on chain {}", user_id, msg.chain_id);
                    Ok(session)
                },
                Some(Err(e)) => Err(StoreError::Read {
                    details: format!("unreadable session for chain {} in {}: {}", msg.chain_id, key, e),
                }),
                None => Err(StoreError::ChainNotFound { user_id, chain_id: msg.chain_id }),
            }
        })
    }
}

// Handle retrieval of every session of a user
impl Handler<GetUserContext> for SessionStoreActor {
    type Result = ResponseFuture<Result<UserContext, StoreError>>;

    fn handle(&mut self, msg: GetUserContext, _ctx: &mut Self::Context) -> Self::Result {
        let backend = self.backend();
        Box::pin(async move {
            let store = backend?;
            let user_id = normalize_user_id(&msg.user_address);
            let key = UserContext::storage_key(&msg.user_address);

            read_context(store.as_ref(), &key)
                .await?
                .ok_or(StoreError::UserNotFound { user_id })
        })
    }
}

impl Handler<GetStorageStatus> for SessionStoreActor {
    type Result = bool;

    fn handle(&mut self, _msg: GetStorageStatus, _ctx: &mut Self::Context) -> Self::Result {
        self.store.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBlobStore, StorageError};
    use alloy_primitives::{address, Bytes};
    use async_trait::async_trait;
    use session_common::models::SELF_VALIDATION_ADDRESS;

    const USER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn session(id: u64) -> SessionRecord {
        let mut session = SessionRecord::around(
            id,
            address!("1e8e3a338046913149c84002e22744780200e3be"),
            SELF_VALIDATION_ADDRESS,
            1_700_000_000,
            604_800,
        );
        session.signature = Bytes::from(vec![7u8; 65]);
        session
    }

    fn start(store: MemoryBlobStore) -> Addr<SessionStoreActor> {
        SessionStoreActor::new(Some(Arc::new(store))).start()
    }

    struct BrokenStore;

    #[async_trait]
    impl BlobStore for BrokenStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Err(StorageError::request(key, "connection reset"))
        }

        async fn put(&self, key: &str, _body: Vec<u8>) -> Result<(), StorageError> {
            Err(StorageError::request(key, "connection reset"))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    #[actix_web::test]
    async fn test_store_then_read_back() {
        let memory = MemoryBlobStore::new();
        let addr = start(memory.clone());

        let receipt = addr
            .send(StoreSession { user_address: USER.to_string(), chain_id: 1, session: session(42) })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.user_id, USER.to_lowercase());
        assert_eq!(receipt.chain_id, "1");
        assert_eq!(receipt.session_id, 42);

        let stored = addr
            .send(GetChainSession { user_address: USER.to_uppercase().replace("0X", "0x"), chain_id: "1".into() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, session(42));
        assert_eq!(memory.len(), 1);
    }

    #[actix_web::test]
    async fn test_stores_merge_per_chain_and_overwrite_same_chain() {
        let addr = start(MemoryBlobStore::new());
        for (chain_id, id) in [(1u64, 1u64), (10, 2), (1, 3)] {
            addr.send(StoreSession { user_address: USER.to_string(), chain_id, session: session(id) })
                .await
                .unwrap()
                .unwrap();
        }

        let context = addr.send(GetUserContext { user_address: USER.to_string() }).await.unwrap().unwrap();
        assert_eq!(context.chain_count(), 2);
        assert_eq!(context.session_for("1").unwrap().unwrap().id, 3);
        assert_eq!(context.session_for("10").unwrap().unwrap().id, 2);
    }

    #[actix_web::test]
    async fn test_concurrent_stores_keep_every_chain() {
        let addr = start(MemoryBlobStore::new());
        let sends: Vec<_> = (1u64..=8)
            .map(|chain_id| {
                addr.send(StoreSession { user_address: USER.to_string(), chain_id, session: session(chain_id) })
            })
            .collect();
        for result in futures_util::future::join_all(sends).await {
            result.unwrap().unwrap();
        }

        let context = addr.send(GetUserContext { user_address: USER.to_string() }).await.unwrap().unwrap();
        assert_eq!(context.chain_count(), 8);
    }

    #[actix_web::test]
    async fn test_missing_user_and_chain() {
        let addr = start(MemoryBlobStore::new());

        let err = addr.send(GetUserContext { user_address: USER.to_string() }).await.unwrap().unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound { .. }));

        addr.send(StoreSession { user_address: USER.to_string(), chain_id: 1, session: session(1) })
            .await
            .unwrap()
            .unwrap();
        let err = addr
            .send(GetChainSession { user_address: USER.to_string(), chain_id: "137".into() })
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, StoreError::ChainNotFound { ref chain_id, .. } if chain_id == "137"));
    }

    #[actix_web::test]
    async fn test_unreadable_blob_is_replaced_on_store() {
        let memory = MemoryBlobStore::new();
        memory.insert_raw(&UserContext::storage_key(USER), "not json");
        let addr = start(memory);

        let err = addr.send(GetUserContext { user_address: USER.to_string() }).await.unwrap().unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));

        addr.send(StoreSession { user_address: USER.to_string(), chain_id: 5, session: session(9) })
            .await
            .unwrap()
            .unwrap();
        let context = addr.send(GetUserContext { user_address: USER.to_string() }).await.unwrap().unwrap();
        assert_eq!(context.chain_count(), 1);
    }

    fn seed_legacy_blob(memory: &MemoryBlobStore) {
        let body = serde_json::json!({
            "profile": { "label": "primary", "tier": 2 },
            "sessionInfos": {
                "1": serde_json::to_value(session(11)).unwrap(),
                "5": { "id": "legacy-string-id", "executor": "0x1234" }
            }
        });
        memory.insert_raw(&UserContext::storage_key(USER), body.to_string());
    }

    #[actix_web::test]
    async fn test_store_keeps_legacy_entries_and_foreign_keys() {
        let memory = MemoryBlobStore::new();
        seed_legacy_blob(&memory);
        let addr = start(memory.clone());

        addr.send(StoreSession { user_address: USER.to_string(), chain_id: 10, session: session(12) })
            .await
            .unwrap()
            .unwrap();

        let body = memory.get(&UserContext::storage_key(USER)).await.unwrap().unwrap();
        let blob: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(blob["profile"], serde_json::json!({ "label": "primary", "tier": 2 }));
        assert_eq!(blob["sessionInfos"]["1"]["id"], 11, "chain 1 session was wiped");
        assert_eq!(blob["sessionInfos"]["5"]["id"], "legacy-string-id");
        assert_eq!(blob["sessionInfos"]["10"]["id"], 12);
    }

    #[actix_web::test]
    async fn test_reads_next_to_legacy_entry() {
        let memory = MemoryBlobStore::new();
        seed_legacy_blob(&memory);
        let addr = start(memory);

        let stored = addr
            .send(GetChainSession { user_address: USER.to_string(), chain_id: "1".into() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, session(11));

        let err = addr
            .send(GetChainSession { user_address: USER.to_string(), chain_id: "5".into() })
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, StoreError::Read { ref details } if details.contains("chain 5")));

        let context = addr.send(GetUserContext { user_address: USER.to_string() }).await.unwrap().unwrap();
        assert_eq!(context.chain_count(), 2);
    }

    #[actix_web::test]
    async fn test_backend_failure_aborts_store() {
        let addr = SessionStoreActor::new(Some(Arc::new(BrokenStore))).start();
        let err = addr
            .send(StoreSession { user_address: USER.to_string(), chain_id: 1, session: session(1) })
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, StoreError::Write { ref details } if details.contains("connection reset")));
    }

    #[actix_web::test]
    async fn test_without_backend() {
        let addr = SessionStoreActor::new(None).start();
        assert!(!addr.send(GetStorageStatus).await.unwrap());

        let err = addr.send(GetUserContext { user_address: USER.to_string() }).await.unwrap().unwrap_err();
        assert!(matches!(err, StoreError::NotInitialized));
    }
}
