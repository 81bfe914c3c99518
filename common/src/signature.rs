// common/src/signature.rs
use alloy_primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Length of a recoverable secp256k1 signature: r (32) ‖ s (32) ‖ v (1)
pub const SIGNATURE_LENGTH: usize = 65;

/// A signature split into its components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParts {
    pub r: B256,
    pub s: B256,
    /// Recovery id as returned by the signer (usually 27 or 28)
    pub v: u8,
}

impl SignatureParts {
    /// Split a 65-byte signature. Any other length is rejected, never padded or truncated.
    pub fn decompose(raw: &[u8]) -> Result<Self, SessionError> {
        if raw.len() != SIGNATURE_LENGTH {
            return Err(SessionError::MalformedSignature(raw.len()));
        }
        Ok(Self {
            r: B256::from_slice(&raw[0..32]),
            s: B256::from_slice(&raw[32..64]),
            v: raw[64],
        })
    }

    /// Recovery id as a minimal big-endian integer.
    ///
    /// Leading zero bytes are dropped, so `v = 0` encodes to nothing at all.
    /// Downstream consumers read this exact layout; keep it.
    pub fn encoded_v(&self) -> Vec<u8> {
        self.v.to_be_bytes().into_iter().skip_while(|b| *b == 0).collect()
    }

    /// `r ‖ s ‖ encoded_v()`, the layout stored in `SessionRecord::signature`
    pub fn repack(&self) -> Bytes {
        let mut out = Vec::with_capacity(SIGNATURE_LENGTH);
        out.extend_from_slice(self.r.as_slice());
        out.extend_from_slice(self.s.as_slice());
        out.extend_from_slice(&self.encoded_v());
        Bytes::from(out)
    }
}

/// Decompose then repack in one step
pub fn repack_signature(raw: &[u8]) -> Result<(SignatureParts, Bytes), SessionError> {
    let parts = SignatureParts::decompose(raw)?;
    let packed = parts.repack();
    Ok((parts, packed))
}
