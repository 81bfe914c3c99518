// common/src/eip712.rs
//! Typed-data (EIP-712) payload for session authorization.
//!
//! The wallet contract hashes sessions with a fixed schema, so the field
//! list below must stay identical, in name, type and order, to the
//! contract's `Session` struct. Any drift produces a hash the contract will
//! reject without telling anyone why.

use alloy_dyn_abi::TypedData;
use alloy_primitives::{address, Address, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::str::FromStr;

use crate::error::SessionError;
use crate::models::session::SessionRecord;

/// Domain name the wallet core contract signs under
pub const DEFAULT_DOMAIN_NAME: &str = "wallet-core";
/// Domain version the wallet core contract signs under
pub const DEFAULT_DOMAIN_VERSION: &str = "1.0.0";
/// Wallet core implementation on Ethereum mainnet
pub const WALLET_CORE_ADDRESS: Address = address!("80296FF8D1ED46f8e3C7992664D13B833504c2Bb");

sol! {
    /// Value struct handed to the wallet. Same data as a [`SessionRecord`]
    /// plus the implementation address, minus the signature.
    #[derive(Debug, PartialEq, Eq, Serialize)]
    struct Session {
        address wallet;
        uint256 id;
        address executor;
        address validator;
        uint256 validUntil;
        uint256 validAfter;
        bytes preHook;
        bytes postHook;
    }
}

/// One `(name, type)` entry of a typed-data schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypedDataField {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: &'static str,
}

const SESSION_FIELDS: [TypedDataField; 8] = [
    TypedDataField { name: "wallet", ty: "address" },
    TypedDataField { name: "id", ty: "uint256" },
    TypedDataField { name: "executor", ty: "address" },
    TypedDataField { name: "validator", ty: "address" },
    TypedDataField { name: "validUntil", ty: "uint256" },
    TypedDataField { name: "validAfter", ty: "uint256" },
    TypedDataField { name: "preHook", ty: "bytes" },
    TypedDataField { name: "postHook", ty: "bytes" },
];

/// Ordered field list of the primary type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedDataSchema {
    primary_type: &'static str,
    fields: &'static [TypedDataField],
}

impl TypedDataSchema {
    /// Schema of the wallet core `Session` struct
    pub const fn session() -> Self {
        Self { primary_type: "Session", fields: &SESSION_FIELDS }
    }

    pub fn primary_type(&self) -> &'static str {
        self.primary_type
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|f| f.name)
    }

    /// EIP-712 `encodeType` string, e.g. `Session(address wallet,uint256 id,...)`
    pub fn encode_type(&self) -> String {
        let members: Vec<String> = self.fields.iter().map(|f| format!("{} {}", f.ty, f.name)).collect();
        format!("{}({})", self.primary_type, members.join(","))
    }

    /// `types` object in the shape wallets expect
    pub fn to_types_json(&self) -> Value {
        let mut types = Map::new();
        types.insert(
            self.primary_type.to_string(),
            Value::Array(self.fields.iter().map(field_json).collect()),
        );
        Value::Object(types)
    }
}

fn field_json(field: &TypedDataField) -> Value {
    let mut entry = Map::new();
    entry.insert("name".to_string(), Value::String(field.name.to_string()));
    entry.insert("type".to_string(), Value::String(field.ty.to_string()));
    Value::Object(entry)
}

/// Everything outside the session record that goes into the signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    pub chain_id: u64,
    /// Contract that verifies the signature (the user's delegated wallet)
    pub verifying_contract: Address,
    /// Wallet implementation being authorized
    pub wallet: Address,
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
}

impl SigningContext {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
            wallet: WALLET_CORE_ADDRESS,
            name: Cow::Borrowed(DEFAULT_DOMAIN_NAME),
            version: Cow::Borrowed(DEFAULT_DOMAIN_VERSION),
        }
    }

    pub fn with_wallet(mut self, wallet: Address) -> Self {
        self.wallet = wallet;
        self
    }

    pub fn with_domain(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.name = Cow::Owned(name.into());
        self.version = Cow::Owned(version.into());
        self
    }

    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(self.name.clone()),
            Some(self.version.clone()),
            Some(U256::from(self.chain_id)),
            Some(self.verifying_contract),
            None,
        )
    }
}

/// Domain, schema and value struct for one sign operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedDataPayload {
    pub domain: Eip712Domain,
    pub schema: TypedDataSchema,
    pub message: Session,
}

impl TypedDataPayload {
    /// `keccak256("\x19\x01" ‖ domainSeparator ‖ hashStruct(message))`
    pub fn signing_hash(&self) -> B256 {
        self.message.eip712_signing_hash(&self.domain)
    }

    /// Value struct as JSON, keys in schema order
    pub fn message_json(&self) -> Result<Map<String, Value>, SessionError> {
        match serde_json::to_value(&self.message) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(SessionError::invalid(format!("session message encoded as {}", other))),
            Err(e) => Err(SessionError::invalid(format!("failed to encode session message: {}", e))),
        }
    }

    /// Full document for `eth_signTypedData_v4`
    pub fn to_typed_data(&self) -> TypedData {
        TypedData::from_struct(&self.message, Some(self.domain.clone()))
    }
}

/// Assemble the typed-data payload for an unsigned session
pub fn build_payload(
    session: &SessionRecord,
    ctx: &SigningContext,
) -> Result<TypedDataPayload, SessionError> {
    if ctx.chain_id == 0 {
        return Err(SessionError::invalid("chain id must be a positive integer"));
    }
    if session.is_signed() {
        return Err(SessionError::invalid(format!("session {} is already signed", session.id)));
    }

    let message = Session {
        wallet: ctx.wallet,
        id: U256::from(session.id),
        executor: session.executor,
        validator: session.validator,
        validUntil: timestamp("validUntil", session.valid_until)?,
        validAfter: timestamp("validAfter", session.valid_after)?,
        preHook: session.pre_hook.clone(),
        postHook: session.post_hook.clone(),
    };

    tracing::debug!(
        session_id = session.id,
        chain_id = ctx.chain_id,
        verifying_contract = %ctx.verifying_contract,
        "built session typed data"
    );

    Ok(TypedDataPayload { domain: ctx.domain(), schema: TypedDataSchema::session(), message })
}

fn timestamp(field: &str, value: i64) -> Result<U256, SessionError> {
    u64::try_from(value)
        .map(U256::from)
        .map_err(|_| SessionError::invalid(format!("{} must be non-negative, got {}", field, value)))
}

/// Parse a `0x`-prefixed 20-byte hex address
pub fn parse_address(field: &str, value: &str) -> Result<Address, SessionError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| SessionError::invalid(format!("{} must start with 0x: {:?}", field, value)))?;

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SessionError::invalid(format!(
            "{} must be 20 hex-encoded bytes: {:?}",
            field, value
        )));
    }

    Address::from_str(value).map_err(|e| SessionError::invalid(format!("{}: {}", field, e)))
}
