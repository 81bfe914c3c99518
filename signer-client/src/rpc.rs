// signer-client/src/rpc.rs
//! Wallet reached over JSON-RPC (a node with unlocked accounts, a wallet
//! daemon, or anything else that answers `eth_signTypedData_v4`).

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use session_common::eip712::TypedDataPayload;
use session_common::models::SessionRecord;
use session_common::SessionError;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use url::Url;

use crate::invoker::SigningInvoker;
use crate::wallet::WalletProvider;

/// EIP-1193 "user rejected request"
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193 "unsupported method"
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// JSON-RPC "method not found"
pub const METHOD_NOT_FOUND: i64 = -32601;

const SIGN_TYPED_DATA: &str = "eth_signTypedData_v4";

sol! {
    struct OnchainSession {
        uint256 id;
        address executor;
        address validator;
        uint256 validUntil;
        uint256 validAfter;
        bytes preHook;
        bytes postHook;
        bytes signature;
    }

    interface IWalletCore {
        function getSessionTypedHash(OnchainSession session) external view returns (bytes32);
    }
}

#[derive(Debug, Error)]
enum RpcFailure {
    #[error("{0}")]
    Transport(String),

    #[error("{message} (code {code})")]
    Rpc { code: i64, message: String },
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Map a failed wallet request onto the error taxonomy.
///
/// Only the signature request yields signing errors; account, chain and code
/// queries fail as connection errors.
fn map_failure(method: &str, failure: RpcFailure) -> SessionError {
    let signing = method == SIGN_TYPED_DATA;
    match failure {
        RpcFailure::Rpc { code: USER_REJECTED, .. } => SessionError::UserRejected,
        RpcFailure::Rpc { code: METHOD_NOT_FOUND | UNSUPPORTED_METHOD, .. } => {
            SessionError::UnsupportedOperation(format!("Wallet does not support {}.", method))
        },
        RpcFailure::Transport(message) if signing => SessionError::TransportError(message),
        RpcFailure::Rpc { message, .. } if signing => SessionError::SigningFailed(message),
        failure => SessionError::ConnectionFailed(format!("{} failed: {}", method, failure)),
    }
}

#[derive(Debug)]
pub struct RpcWallet {
    client: Client,
    url: Url,
    next_id: AtomicU64,
}

impl RpcWallet {
    pub fn new(rpc_url: &str) -> Result<Self, SessionError> {
        let url = Url::parse(rpc_url)
            .map_err(|e| SessionError::invalid(format!("invalid rpc url {:?}: {}", rpc_url, e)))?;
        Ok(Self { client: Client::new(), url, next_id: AtomicU64::new(1) })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        tracing::debug!("rpc #{} {}", id, method);

        let response: RpcResponse = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RpcFailure::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| RpcFailure::Transport(e.to_string()))?;

        if let Some(err) = response.error {
            tracing::debug!("rpc #{} {} failed: {} ({})", id, method, err.message, err.code);
            return Err(RpcFailure::Rpc { code: err.code, message: err.message });
        }

        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| RpcFailure::Transport(format!("unexpected {} result: {}", method, e)))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, SessionError> {
        self.request(method, params).await.map_err(|e| map_failure(method, e))
    }

    /// Ask the wallet contract at `wallet` for the typed hash it computes for `session`
    pub async fn session_typed_hash(&self, wallet: Address, session: &SessionRecord) -> Result<B256, SessionError> {
        let timestamp = |field: &str, value: i64| {
            u64::try_from(value)
                .map(U256::from)
                .map_err(|_| SessionError::invalid(format!("{} must be non-negative, got {}", field, value)))
        };
        let call = IWalletCore::getSessionTypedHashCall {
            session: OnchainSession {
                id: U256::from(session.id),
                executor: session.executor,
                validator: session.validator,
                validUntil: timestamp("validUntil", session.valid_until)?,
                validAfter: timestamp("validAfter", session.valid_after)?,
                preHook: session.pre_hook.clone(),
                postHook: session.post_hook.clone(),
                signature: session.signature.clone(),
            },
        };
        let params = json!([{ "to": wallet, "data": Bytes::from(call.abi_encode()) }, "latest"]);

        let unsupported = || {
            SessionError::UnsupportedOperation(
                "Smart wallet contract does not support session signing. Please ensure wallet is properly upgraded."
                    .to_string(),
            )
        };

        let data: Bytes = match self.request("eth_call", params).await {
            Ok(data) => data,
            Err(RpcFailure::Transport(message)) => return Err(SessionError::TransportError(message)),
            Err(failure) => {
                tracing::warn!("getSessionTypedHash failed: {}", failure);
                return Err(unsupported());
            }
        };

        if data.len() != 32 {
            tracing::warn!("getSessionTypedHash returned {} bytes", data.len());
            return Err(unsupported());
        }
        Ok(B256::from_slice(&data))
    }
}

#[async_trait]
impl SigningInvoker for RpcWallet {
    async fn sign_typed_data(&self, signer: Address, payload: &TypedDataPayload) -> Result<Bytes, SessionError> {
        let typed_data = serde_json::to_string(&payload.to_typed_data())
            .map_err(|e| SessionError::SigningFailed(format!("failed to encode typed data: {}", e)))?;
        self.call(SIGN_TYPED_DATA, json!([signer, typed_data])).await
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, SessionError> {
        match self.call("eth_requestAccounts", json!([])).await {
            Err(SessionError::UnsupportedOperation(_)) => {
                tracing::debug!("eth_requestAccounts unsupported, falling back to eth_accounts");
                self.call("eth_accounts", json!([])).await
            },
            other => other,
        }
    }

    async fn chain_id(&self) -> Result<u64, SessionError> {
        let id: U64 = self.call("eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, SessionError> {
        self.call("eth_getCode", json!([address, "latest"])).await
    }
}
