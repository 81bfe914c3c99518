// signer-client/src/main.rs
use alloy_primitives::{Address, B256};
use clap::{Parser, Subcommand};
use serde_json::json;
use session_common::eip712::parse_address;
use session_common::{setup_tracing, unix_now, Config, SessionError};
use session_signer::wallet::SigningSettings;
use session_signer::{
    draft_session, HttpPersistenceClient, LocalKeyWallet, RpcWallet, SessionPersistence, SignOutcome,
    StorageStatus, Wallet, WalletSession,
};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "session-signer", version, about = "Sign wallet core sessions and store them through the session relay")]
struct Cli {
    /// Session relay base URL
    #[arg(long, env = "BACKEND_URL", global = true)]
    backend_url: Option<String>,

    /// Wallet JSON-RPC endpoint
    #[arg(long, env = "RPC_URL", global = true)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect the wallet, sign a new session and store it
    Sign {
        /// Sign with this private key instead of the RPC wallet
        #[arg(long, env = "SIGNER_PRIVATE_KEY", hide_env_values = true)]
        private_key: Option<String>,

        /// Chain id reported by the private-key wallet
        #[arg(long, default_value_t = 1)]
        chain_id: u64,

        /// Report the private-key account as delegated to the wallet core
        #[arg(long)]
        delegated: bool,

        /// Fixed session id instead of a random one
        #[arg(long)]
        session_id: Option<u64>,

        /// Sign even when the account has no code
        #[arg(long)]
        allow_plain_account: bool,

        /// Ask the wallet contract for its typed hash before signing
        #[arg(long)]
        contract_hash: bool,

        /// Do not send the signed session to the relay
        #[arg(long)]
        no_store: bool,
    },
    /// Print stored sessions of a user
    Show {
        user: String,
        #[arg(long)]
        chain_id: Option<u64>,
    },
    /// Check the relay
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    setup_tracing(&config.log_level);

    if let Some(url) = cli.backend_url {
        config.client.backend_url = url;
    }
    if let Some(url) = cli.rpc_url {
        config.client.rpc_url = url;
    }

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<(), SessionError> {
    let relay = HttpPersistenceClient::new(&config.client.backend_url)?;

    match command {
        Command::Sign {
            private_key,
            chain_id,
            delegated,
            session_id,
            allow_plain_account,
            contract_hash,
            no_store,
        } => {
            let settings = SigningSettings {
                wallet_core: parse_address("wallet_core_address", &config.client.wallet_core_address)?,
                domain_name: config.client.domain_name.clone(),
                domain_version: config.client.domain_version.clone(),
            };

            let (wallet, rpc): (Arc<dyn Wallet>, Option<Arc<RpcWallet>>) = match private_key {
                Some(key) => {
                    let mut local = LocalKeyWallet::from_hex(&key, chain_id)?;
                    if delegated {
                        local = local.delegated_to(settings.wallet_core);
                    }
                    let local: Arc<dyn Wallet> = Arc::new(local);
                    (local, None)
                },
                None => {
                    let rpc = Arc::new(RpcWallet::new(&config.client.rpc_url)?);
                    let shared: Arc<dyn Wallet> = rpc.clone();
                    (shared, Some(rpc))
                },
            };

            let mut session = WalletSession::new(wallet);
            if allow_plain_account {
                session = session.allow_plain_accounts();
            }
            let user = session.connect().await?.address;

            let record = draft_session(&config.client, unix_now(), session_id)?;
            tracing::info!(
                "Session parameters: id={} executor={} validator={} validAfter={} validUntil={}",
                record.id,
                record.executor,
                record.validator,
                format_time(record.valid_after),
                format_time(record.valid_until)
            );

            let onchain_hash = match (&rpc, contract_hash) {
                (Some(rpc), true) => {
                    let hash = rpc.session_typed_hash(user, &record).await?;
                    tracing::info!("EIP-712 typed hash from contract: {}", hash);
                    Some(hash)
                },
                _ => None,
            };

            let persistence: Option<&dyn SessionPersistence> = if no_store { None } else { Some(&relay) };
            let outcome = session.sign(record, &settings, persistence).await?;

            println!("{}", pretty(&summary(user, &outcome, onchain_hash)?)?);
            match &outcome.storage {
                StorageStatus::Stored(_) => println!("Session data signed successfully and stored via backend API!"),
                StorageStatus::Failed(reason) => {
                    println!("Session data signed successfully! (Backend storage failed: {})", reason)
                },
                StorageStatus::Skipped => println!("Session data signed successfully!"),
            }
        },
        Command::Show { user, chain_id } => {
            let user = parse_address("user", &user)?.to_string().to_lowercase();
            let data = match chain_id {
                Some(chain_id) => to_json(&relay.fetch(&user, chain_id).await?)?,
                None => to_json(&relay.fetch_all(&user).await?)?,
            };
            println!("{}", pretty(&data)?);
        },
        Command::Health => {
            let health = relay.health().await?;
            println!("{}", pretty(&to_json(&health)?)?);
            if !health.is_ready() {
                tracing::warn!("Relay at {} has no storage backend", relay.base_url());
            }
        },
    }

    Ok(())
}

/// Report printed after a signature. `contractSessionHash` is null unless the
/// wallet contract was asked for its typed hash.
fn summary(
    user: Address,
    outcome: &SignOutcome,
    contract_hash: Option<B256>,
) -> Result<serde_json::Value, SessionError> {
    let domain = &outcome.payload.domain;
    let schema = &outcome.payload.schema;
    let session_data = outcome.payload.message_json()?;
    Ok(json!({
        "signingMethod": "EIP-712 Typed Data",
        "user": user,
        "domain": {
            "name": domain.name,
            "version": domain.version,
            "chainId": domain.chain_id.map(|id| id.to::<u64>()),
            "verifyingContract": domain.verifying_contract,
        },
        "primaryType": schema.primary_type(),
        "types": schema.to_types_json(),
        "sessionData": session_data,
        "session": outcome.session,
        "signingHash": outcome.signing_hash,
        "contractSessionHash": contract_hash,
        "signature": outcome.session.signature,
        "stored": outcome.storage.is_stored(),
    }))
}

fn format_time(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, SessionError> {
    serde_json::to_value(value).map_err(|e| SessionError::invalid(format!("failed to encode output: {}", e)))
}

fn pretty(value: &serde_json::Value) -> Result<String, SessionError> {
    serde_json::to_string_pretty(value).map_err(|e| SessionError::invalid(format!("failed to encode output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_common::eip712::SigningContext;
    use session_signer::sign_session;

    async fn signed() -> (Address, SignOutcome) {
        let key = LocalKeyWallet::random(8453);
        let user = key.address();
        let record = draft_session(&session_common::ClientConfig::default(), 1_700_000_000, Some(5)).unwrap();
        let outcome = sign_session(&key, None, user, record, &SigningContext::new(8453, user)).await.unwrap();
        (user, outcome)
    }

    #[tokio::test]
    async fn test_summary_without_contract_hash() {
        let (user, outcome) = signed().await;
        let doc = summary(user, &outcome, None).unwrap();

        assert_eq!(doc["signingHash"], json!(outcome.signing_hash));
        assert!(doc["contractSessionHash"].is_null());
        assert_eq!(doc["primaryType"], "Session");
        assert_eq!(doc["types"]["Session"][0]["name"], "wallet");
        assert_eq!(doc["domain"]["chainId"], 8453);
        assert_eq!(doc["stored"], false);
    }

    #[tokio::test]
    async fn test_summary_keeps_contract_hash_apart() {
        let (user, outcome) = signed().await;
        let contract_hash = B256::repeat_byte(0x11);
        let doc = summary(user, &outcome, Some(contract_hash)).unwrap();

        assert_eq!(doc["contractSessionHash"], json!(contract_hash));
        assert_eq!(doc["signingHash"], json!(outcome.signing_hash));
        assert_ne!(doc["signingHash"], doc["contractSessionHash"]);
    }
}
