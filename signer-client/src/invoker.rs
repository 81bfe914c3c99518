// signer-client/src/invoker.rs
use alloy_primitives::{Address, Bytes};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use session_common::eip712::TypedDataPayload;
use session_common::SessionError;

use crate::wallet::WalletProvider;

/// Capability to sign a typed-data payload on behalf of an account.
///
/// Returns the raw signature blob as the signer produced it. Callers never
/// retry a failed request.
#[async_trait]
pub trait SigningInvoker: Send + Sync {
    async fn sign_typed_data(&self, signer: Address, payload: &TypedDataPayload) -> Result<Bytes, SessionError>;
}

/// Wallet backed by a private key held in process
#[derive(Debug, Clone)]
pub struct LocalKeyWallet {
    signer: PrivateKeySigner,
    chain_id: u64,
    code: Bytes,
}

/// Prefix of the code of an EIP-7702 delegated account
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

impl LocalKeyWallet {
    pub fn new(signer: PrivateKeySigner, chain_id: u64) -> Self {
        Self { signer, chain_id, code: Bytes::new() }
    }

    /// Parse a hex private key, with or without `0x`
    pub fn from_hex(key: &str, chain_id: u64) -> Result<Self, SessionError> {
        let signer = key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| SessionError::invalid(format!("invalid private key: {}", e)))?;
        Ok(Self::new(signer, chain_id))
    }

    pub fn random(chain_id: u64) -> Self {
        Self::new(PrivateKeySigner::random(), chain_id)
    }

    /// Report the account as delegated to `implementation`
    pub fn delegated_to(mut self, implementation: Address) -> Self {
        let mut code = DELEGATION_PREFIX.to_vec();
        code.extend_from_slice(implementation.as_slice());
        self.code = Bytes::from(code);
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl SigningInvoker for LocalKeyWallet {
    async fn sign_typed_data(&self, signer: Address, payload: &TypedDataPayload) -> Result<Bytes, SessionError> {
        if signer != self.address() {
            return Err(SessionError::SigningFailed(format!("no key loaded for {}", signer)));
        }

        let signature = self
            .signer
            .sign_dynamic_typed_data(&payload.to_typed_data())
            .await
            .map_err(|e| match e {
                alloy_signer::Error::UnsupportedOperation(op) => SessionError::UnsupportedOperation(op.to_string()),
                other => SessionError::SigningFailed(other.to_string()),
            })?;

        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, SessionError> {
        Ok(vec![self.address()])
    }

    async fn chain_id(&self) -> Result<u64, SessionError> {
        Ok(self.chain_id)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, SessionError> {
        if address == self.address() {
            Ok(self.code.clone())
        } else {
            Ok(Bytes::new())
        }
    }
}
