//! Session signing client.
//!
//! Connects a wallet, signs the wallet core `Session` typed data and pushes
//! the signed record to the session relay.

pub mod flow;
pub mod invoker;
pub mod persistence;
pub mod rpc;
pub mod wallet;

pub use flow::{draft_session, sign_session, SignOutcome, StorageStatus};
pub use invoker::{LocalKeyWallet, SigningInvoker};
pub use persistence::{HttpPersistenceClient, SessionPersistence};
pub use rpc::RpcWallet;
pub use wallet::{ConnectedWallet, Wallet, WalletProvider, WalletSession, WalletState};
