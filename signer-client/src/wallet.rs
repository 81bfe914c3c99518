// signer-client/src/wallet.rs
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use session_common::eip712::SigningContext;
use session_common::models::SessionRecord;
use session_common::SessionError;
use std::sync::Arc;

use crate::flow::{sign_session, SignOutcome};
use crate::invoker::{SigningInvoker, DELEGATION_PREFIX};
use crate::persistence::SessionPersistence;

/// Account and network information exposed by a wallet
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for access; the first account is the active one
    async fn request_accounts(&self) -> Result<Vec<Address>, SessionError>;

    async fn chain_id(&self) -> Result<u64, SessionError>;

    /// Deployed code at `address`, empty for a plain EOA
    async fn code_at(&self, address: Address) -> Result<Bytes, SessionError>;
}

/// A wallet that can both describe its accounts and sign
pub trait Wallet: WalletProvider + SigningInvoker {}

impl<T: WalletProvider + SigningInvoker> Wallet for T {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedWallet {
    pub address: Address,
    pub chain_id: u64,
    pub code: Bytes,
}

impl ConnectedWallet {
    /// The account carries code (delegated or a contract wallet)
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// Implementation the account delegates to under EIP-7702
    pub fn delegation(&self) -> Option<Address> {
        match self.code.strip_prefix(&DELEGATION_PREFIX[..]) {
            Some(target) if target.len() == 20 => Some(Address::from_slice(target)),
            _ => None,
        }
    }

    /// Human readable delegation status
    pub fn status_line(&self) -> String {
        match (self.has_code(), self.delegation()) {
            (true, Some(target)) => format!("EIP-7702 Status: Ready (delegated to {})", target),
            (true, None) => "EIP-7702 Status: Ready (Account has code)".to_string(),
            (false, _) => "EIP-7702 Status: Standard EOA (No code detected)".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum WalletState {
    Disconnected,
    Connected(ConnectedWallet),
    Signed {
        connection: ConnectedWallet,
        outcome: Box<SignOutcome>,
    },
}

/// Domain and implementation settings applied to every signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningSettings {
    pub wallet_core: Address,
    pub domain_name: String,
    pub domain_version: String,
}

impl SigningSettings {
    /// Signing context for the connected account
    pub fn context_for(&self, connection: &ConnectedWallet) -> SigningContext {
        SigningContext::new(connection.chain_id, connection.address)
            .with_wallet(self.wallet_core)
            .with_domain(self.domain_name.clone(), self.domain_version.clone())
    }
}

/// Owns a wallet and walks it through connect and sign
pub struct WalletSession {
    wallet: Arc<dyn Wallet>,
    state: WalletState,
    require_code: bool,
}

impl WalletSession {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self { wallet, state: WalletState::Disconnected, require_code: true }
    }

    /// Allow signing from accounts without code
    pub fn allow_plain_accounts(mut self) -> Self {
        self.require_code = false;
        self
    }

    pub fn state(&self) -> &WalletState {
        &self.state
    }

    /// Active connection, in the connected or signed state
    pub fn connection(&self) -> Result<&ConnectedWallet, SessionError> {
        match &self.state {
            WalletState::Disconnected => Err(SessionError::NotConnected),
            WalletState::Connected(connection) | WalletState::Signed { connection, .. } => Ok(connection),
        }
    }

    pub async fn connect(&mut self) -> Result<&ConnectedWallet, SessionError> {
        let accounts = self.wallet.request_accounts().await?;
        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| SessionError::ConnectionFailed("wallet returned no accounts".to_string()))?;
        let chain_id = self.wallet.chain_id().await?;
        let code = self.wallet.code_at(address).await?;

        let connection = ConnectedWallet { address, chain_id, code };
        tracing::info!("Wallet connected: {} on chain {}", address, chain_id);
        tracing::info!("{}", connection.status_line());

        self.state = WalletState::Connected(connection);
        self.connection()
    }

    pub fn disconnect(&mut self) {
        if !matches!(self.state, WalletState::Disconnected) {
            tracing::info!("Wallet disconnected");
        }
        self.state = WalletState::Disconnected;
    }

    /// Sign `session` with the connected account and optionally store it.
    ///
    /// The account code is re-read first since a delegation can change
    /// between connect and sign.
    pub async fn sign(
        &mut self,
        session: SessionRecord,
        settings: &SigningSettings,
        persistence: Option<&dyn SessionPersistence>,
    ) -> Result<SignOutcome, SessionError> {
        let mut connection = self.connection()?.clone();
        connection.code = self.wallet.code_at(connection.address).await?;

        if self.require_code && !connection.has_code() {
            return Err(SessionError::UnsupportedOperation(
                "Wallet must be upgraded with EIP-7702 to use session signing.".to_string(),
            ));
        }

        let ctx = settings.context_for(&connection);
        let outcome = sign_session(self.wallet.as_ref(), persistence, connection.address, session, &ctx).await?;

        self.state = WalletState::Signed { connection, outcome: Box::new(outcome.clone()) };
        Ok(outcome)
    }
}
