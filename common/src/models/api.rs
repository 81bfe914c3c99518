// common/src/models/api.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionRecord;

/// Message for the 400 answer of the store route
pub const MISSING_FIELDS_ERROR: &str = "Missing required fields: userAddress, chainId, sessionData";

/// Body of `POST /api/session/store` as sent by the signing client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSessionRequest {
    pub user_address: String,
    pub chain_id: u64,
    pub session_data: SessionRecord,
}

/// What the relay reports back after a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreReceipt {
    pub user_id: String,
    pub chain_id: String,
    pub session_id: u64,
}

/// Success envelope shared by every `/api/session` route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, message: None, data }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), details: None }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub storage_connected: bool,
}

impl HealthResponse {
    pub fn new(storage_connected: bool) -> Self {
        Self { status: "OK".to_string(), timestamp: Utc::now(), storage_connected }
    }

    /// Relay is up and can reach its backing store
    pub fn is_ready(&self) -> bool {
        self.status == "OK" && self.storage_connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_uses_wire_names() {
        let receipt = StoreReceipt { user_id: "0xab".into(), chain_id: "1".into(), session_id: 9 };
        assert_eq!(
            serde_json::to_value(&receipt).unwrap(),
            serde_json::json!({ "userId": "0xab", "chainId": "1", "sessionId": 9 })
        );
    }

    #[test]
    fn test_envelope_omits_empty_message() {
        let json = serde_json::to_value(ApiResponse::ok(1)).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": 1 }));

        let json = serde_json::to_value(ApiResponse::ok(1).with_message("stored")).unwrap();
        assert_eq!(json["message"], "stored");
    }

    #[test]
    fn test_health_readiness() {
        assert!(HealthResponse::new(true).is_ready());
        assert!(!HealthResponse::new(false).is_ready());

        let json = serde_json::to_value(HealthResponse::new(false)).unwrap();
        assert_eq!(json["status"], "OK");
        assert_eq!(json["storageConnected"], false);
        assert!(json["timestamp"].is_string());
    }
}
