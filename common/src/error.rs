// common/src/error.rs
use thiserror::Error;

/// Errors raised while building, signing, decoding or persisting a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A field failed validation before anything was signed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The wallet holder declined the signing prompt.
    #[error("user rejected the signing request")]
    UserRejected,

    /// The signing capability (or the wallet contract) cannot do what was asked.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// The wallet could not report its accounts, chain or code.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Signature blob with the wrong length.
    #[error("malformed signature: expected 65 bytes, got {0}")]
    MalformedSignature(usize),

    #[error("transport error: {0}")]
    TransportError(String),

    /// The remote store answered with a non-success status.
    #[error("remote rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// An operation that needs a connected wallet was attempted without one.
    #[error("wallet is not connected")]
    NotConnected,
}

impl SessionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Status text shown to the person driving the flow.
    pub fn user_message(&self) -> String {
        match self {
            Self::UserRejected => "User rejected the signing request.".to_string(),
            Self::NotConnected => "Please connect your wallet first.".to_string(),
            Self::UnsupportedOperation(reason) => reason.clone(),
            Self::NotFound(_) => "No session data found for user.".to_string(),
            Self::SigningFailed(reason) => format!("Signing failed: {}", reason),
            Self::ConnectionFailed(reason) => format!("Connection failed: {}", reason),
            other => format!("Signing failed: {}", other),
        }
    }

    /// Whether the error came from the person rather than from the system.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected)
    }
}
