// common/src/models/session.rs
use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SessionError;

/// Validity window applied on both sides of "now" when none is given (one week).
pub const DEFAULT_VALIDITY_SECS: i64 = 7 * 24 * 3600;

/// Validator sentinel meaning "the wallet validates its own sessions".
pub const SELF_VALIDATION_ADDRESS: Address =
    alloy_primitives::address!("0000000000000000000000000000000000000001");

/// Exclusive upper bound for randomly chosen session ids.
pub const MAX_RANDOM_SESSION_ID: u64 = 1_000_000;

/// Time-bounded authorization grant for an executor acting on a wallet.
///
/// The record is built without a signature, gets exactly one signature
/// attached after a successful sign, and is then handed to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: u64,
    /// Address allowed to act under this session
    pub executor: Address,
    /// Address (or sentinel) allowed to validate this session
    pub validator: Address,
    /// UNIX timestamp after which the session is no longer valid
    pub valid_until: i64,
    /// UNIX timestamp before which the session is not yet valid
    pub valid_after: i64,
    #[serde(default)]
    pub pre_hook: Bytes,
    #[serde(default)]
    pub post_hook: Bytes,
    /// Packed `r ‖ s ‖ v`, empty until signed
    #[serde(default)]
    pub signature: Bytes,
}

impl SessionRecord {
    /// Create an unsigned session with empty hooks
    pub fn new(
        id: u64,
        executor: Address,
        validator: Address,
        valid_after: i64,
        valid_until: i64,
    ) -> Self {
        Self {
            id,
            executor,
            validator,
            valid_until,
            valid_after,
            pre_hook: Bytes::new(),
            post_hook: Bytes::new(),
            signature: Bytes::new(),
        }
    }

    /// Create an unsigned session valid from `now - validity` to `now + validity`
    pub fn around(id: u64, executor: Address, validator: Address, now: i64, validity: i64) -> Self {
        Self::new(id, executor, validator, now - validity, now + validity)
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Attach the packed signature. A record is signed at most once.
    pub fn attach_signature(&mut self, signature: Bytes) -> Result<(), SessionError> {
        if self.is_signed() {
            return Err(SessionError::invalid(format!(
                "session {} already carries a signature",
                self.id
            )));
        }
        self.signature = signature;
        Ok(())
    }
}

/// Key of the per-chain session map inside a user blob
pub const SESSION_INFOS_KEY: &str = "sessionInfos";

/// Per-user blob kept in the backing store.
///
/// Sessions live under `sessionInfos`, keyed by decimal chain id. The blob is
/// held as a raw JSON object so keys and entries written by other producers
/// survive a store untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserContext(Map<String, Value>);

impl UserContext {
    /// Blob key for a user: lower-cased address, path separators replaced, `.json` suffix
    pub fn storage_key(user_address: &str) -> String {
        format!("{}.json", normalize_user_id(user_address).replace(|c: char| c == '/' || c == '\\', "_"))
    }

    /// Decode a stored blob. Anything but a JSON object is an error.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Set the session for one chain (last write wins), returning the raw entry it replaced.
    ///
    /// `sessionInfos` is created when missing or not an object. Other chains
    /// and other top-level keys are left as they are.
    pub fn upsert(&mut self, chain_id: u64, session: &SessionRecord) -> Result<Option<Value>, serde_json::Error> {
        let entry = serde_json::to_value(session)?;
        let slot = self
            .0
            .entry(SESSION_INFOS_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        let mut infos = match std::mem::take(slot) {
            Value::Object(infos) => infos,
            _ => Map::new(),
        };
        let previous = infos.insert(chain_id.to_string(), entry);
        *slot = Value::Object(infos);
        Ok(previous)
    }

    /// Raw per-chain entries, if the blob has a `sessionInfos` object
    pub fn session_infos(&self) -> Option<&Map<String, Value>> {
        self.0.get(SESSION_INFOS_KEY).and_then(Value::as_object)
    }

    /// Decode the session stored for one chain. Only that entry is parsed.
    pub fn session_for(&self, chain_id: &str) -> Option<Result<SessionRecord, serde_json::Error>> {
        self.session_infos()?
            .get(chain_id)
            .map(|entry| SessionRecord::deserialize(entry))
    }

    /// Number of chains with an entry, decodable or not
    pub fn chain_count(&self) -> usize {
        self.session_infos().map_or(0, Map::len)
    }
}

/// Canonical user identifier used in keys and responses
pub fn normalize_user_id(user_address: &str) -> String {
    user_address.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn sample() -> SessionRecord {
        SessionRecord::around(
            7,
            address!("1e8e3a338046913149c84002e22744780200e3be"),
            SELF_VALIDATION_ADDRESS,
            1_700_000_000,
            DEFAULT_VALIDITY_SECS,
        )
    }

    #[test]
    fn test_new_session_is_unsigned() {
        let session = sample();
        assert!(!session.is_signed());
        assert!(session.pre_hook.is_empty());
        assert!(session.post_hook.is_empty());
        assert_eq!(session.valid_until - session.valid_after, 2 * DEFAULT_VALIDITY_SECS);
    }

    #[test]
    fn test_signature_is_attached_once() {
        let mut session = sample();
        session.attach_signature(Bytes::from(vec![1u8; 65])).unwrap();
        assert!(session.is_signed());

        let err = session.attach_signature(Bytes::from(vec![2u8; 65])).unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)));
        assert_eq!(session.signature, Bytes::from(vec![1u8; 65]));
    }

    #[test]
    fn test_json_uses_camel_case_and_hex_bytes() {
        let json = serde_json::to_value(sample()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["id", "executor", "validator", "validUntil", "validAfter", "preHook", "postHook", "signature"]
        );
        assert_eq!(json["preHook"], "0x");
        assert_eq!(json["signature"], "0x");
    }

    #[test]
    fn test_missing_byte_fields_default_to_empty() {
        let session: SessionRecord = serde_json::from_value(serde_json::json!({
            "id": 1,
            "executor": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "validator": "0x0000000000000000000000000000000000000001",
            "validUntil": 10,
            "validAfter": 0
        }))
        .unwrap();
        assert!(!session.is_signed());
        assert_eq!(session.validator, SELF_VALIDATION_ADDRESS);
    }

    #[test]
    fn test_storage_key_is_lowercase_and_path_safe() {
        assert_eq!(
            UserContext::storage_key("0xAbCdEF0000000000000000000000000000000001"),
            "0xabcdef0000000000000000000000000000000001.json"
        );
        assert_eq!(UserContext::storage_key("../Evil\\User"), ".._evil_user.json");
    }

    #[test]
    fn test_upsert_overwrites_same_chain_only() {
        let mut ctx = UserContext::default();
        assert!(ctx.upsert(1, &sample()).unwrap().is_none());

        let mut other = sample();
        other.id = 8;
        assert!(ctx.upsert(10, &other).unwrap().is_none());

        let replaced = ctx.upsert(1, &other).unwrap().unwrap();
        assert_eq!(replaced["id"], 7);
        assert_eq!(ctx.session_for("1").unwrap().unwrap(), other);
        assert_eq!(ctx.chain_count(), 2);
    }

    #[test]
    fn test_upsert_keeps_foreign_keys_and_legacy_entries() {
        let mut ctx = UserContext::from_slice(
            serde_json::json!({
                "profile": { "name": "alice" },
                "sessionInfos": { "5": { "id": "legacy-string-id" } }
            })
            .to_string()
            .as_bytes(),
        )
        .unwrap();

        ctx.upsert(10, &sample()).unwrap();

        assert_eq!(serde_json::to_value(&ctx).unwrap()["profile"], serde_json::json!({ "name": "alice" }));
        assert_eq!(ctx.chain_count(), 2);
        assert!(ctx.session_for("5").unwrap().is_err());
        assert_eq!(ctx.session_for("10").unwrap().unwrap(), sample());
        assert!(ctx.session_for("1").is_none());
    }

    #[test]
    fn test_non_object_session_infos_is_recreated() {
        let mut ctx = UserContext::from_slice(br#"{"sessionInfos": [1, 2], "v": 2}"#).unwrap();
        assert!(ctx.session_infos().is_none());

        ctx.upsert(1, &sample()).unwrap();
        assert_eq!(ctx.chain_count(), 1);
        assert_eq!(serde_json::to_value(&ctx).unwrap()["v"], 2);
    }

    #[test]
    fn test_context_decoding() {
        let ctx = UserContext::from_slice(b"{}").unwrap();
        assert_eq!(ctx.chain_count(), 0);
        assert!(UserContext::from_slice(b"[]").is_err());
        assert!(UserContext::from_slice(b"not json").is_err());
    }
}
