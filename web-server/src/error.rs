// web-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use session_common::models::ApiError;
use thiserror::Error;

/// Relay-level failures, each mapped to the status code clients rely on
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage not initialized. Check server configuration.")]
    NotInitialized,

    #[error("No session data found for user {user_id}")]
    UserNotFound { user_id: String },

    #[error("No session data found for user {user_id} on chain {chain_id}")]
    ChainNotFound { user_id: String, chain_id: String },

    #[error("Failed to store session data")]
    Write { details: String },

    #[error("Failed to retrieve session data")]
    Read { details: String },

    #[error("Session store unavailable")]
    Mailbox(#[from] actix::MailboxError),
}

impl StoreError {
    fn details(&self) -> Option<String> {
        match self {
            Self::Write { details } | Self::Read { details } => Some(details.clone()),
            Self::Mailbox(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UserNotFound { .. } | Self::ChainNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = ApiError::new(self.to_string());
        if let Some(details) = self.details() {
            body = body.with_details(details);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = StoreError::ChainNotFound { user_id: "0xab".into(), chain_id: "5".into() };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "No session data found for user 0xab on chain 5");
    }

    #[test]
    fn test_storage_failures_map_to_500() {
        assert_eq!(StoreError::NotInitialized.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = StoreError::Write { details: "bucket gone".into() };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.details().as_deref(), Some("bucket gone"));
    }
}
