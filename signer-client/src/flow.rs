// signer-client/src/flow.rs
use alloy_primitives::{Address, B256};
use rand::Rng;
use session_common::eip712::{build_payload, parse_address, SigningContext, TypedDataPayload};
use session_common::models::{normalize_user_id, SessionRecord, StoreReceipt, MAX_RANDOM_SESSION_ID};
use session_common::signature::{repack_signature, SignatureParts};
use session_common::{ClientConfig, SessionError};

use crate::invoker::SigningInvoker;
use crate::persistence::SessionPersistence;

/// What happened to the signed record on the way to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageStatus {
    Stored(StoreReceipt),
    /// Signing succeeded but the relay did not take the record
    Failed(String),
    /// No persistence client was supplied
    Skipped,
}

impl StorageStatus {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored(_))
    }
}

/// Result of one sign operation
#[derive(Debug, Clone)]
pub struct SignOutcome {
    pub payload: TypedDataPayload,
    /// The record with its signature attached
    pub session: SessionRecord,
    pub parts: SignatureParts,
    pub signing_hash: B256,
    pub storage: StorageStatus,
}

/// Fresh unsigned session from client settings, valid `validity_secs` on each side of `now`
pub fn draft_session(config: &ClientConfig, now: i64, id: Option<u64>) -> Result<SessionRecord, SessionError> {
    let executor = parse_address("executor", &config.executor)?;
    let validator = parse_address("validator", &config.validator)?;
    if config.validity_secs < 0 {
        return Err(SessionError::invalid(format!(
            "validity must be non-negative, got {}",
            config.validity_secs
        )));
    }

    let id = id.unwrap_or_else(|| rand::thread_rng().gen_range(0..MAX_RANDOM_SESSION_ID));
    Ok(SessionRecord::around(id, executor, validator, now, config.validity_secs))
}

/// Build, sign, repack and optionally store one session.
///
/// Any failure before the signature is attached aborts the flow with nothing
/// persisted. A storage failure afterwards is reported in
/// [`SignOutcome::storage`] and the signed record is still returned.
pub async fn sign_session<I>(
    invoker: &I,
    persistence: Option<&dyn SessionPersistence>,
    user: Address,
    mut session: SessionRecord,
    ctx: &SigningContext,
) -> Result<SignOutcome, SessionError>
where
    I: SigningInvoker + ?Sized,
{
    let payload = build_payload(&session, ctx)?;
    let signing_hash = payload.signing_hash();
    tracing::info!("Requesting signature for session {} ({})", session.id, signing_hash);

    let raw = invoker.sign_typed_data(user, &payload).await.map_err(|e| {
        if e.is_user_rejection() {
            tracing::info!("User rejected session {}", session.id);
        } else {
            tracing::error!("Signing session {} failed: {}", session.id, e);
        }
        e
    })?;

    let (parts, packed) = repack_signature(&raw)?;
    session.attach_signature(packed)?;
    tracing::info!("Session signed by user: {}", session.signature);

    let storage = match persistence {
        None => StorageStatus::Skipped,
        Some(client) => {
            let user_id = normalize_user_id(&user.to_string());
            match client.store(&user_id, ctx.chain_id, &session).await {
                Ok(receipt) => {
                    tracing::info!("Session data stored for user {} on chain {}", receipt.user_id, receipt.chain_id);
                    StorageStatus::Stored(receipt)
                },
                Err(e) => {
                    tracing::warn!("Failed to store session data: {}", e);
                    StorageStatus::Failed(e.to_string())
                }
            }
        }
    };

    Ok(SignOutcome { payload, session, parts, signing_hash, storage })
}
