//! The agent's signing identity.
//!
//! The private key arrives as hex, optionally prefixed with `0x` or
//! `ed25519-priv-`. The on-chain address is derived from the public key as
//! `BLAKE3(pubkey || 0x00)`, the trailing byte marking a single-key scheme.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

use helios_core::address::AccountAddress;
use helios_core::error::{PublishError, SignerError};
use helios_core::types::SignedPayload;

use crate::payload::{signing_message, RawTransaction};

const KEY_PREFIX: &str = "ed25519-priv-";
const SINGLE_KEY_SCHEME: u8 = 0x00;

/// Ed25519 key and the account address it controls.
///
/// The secret is zeroized on drop by the underlying `SigningKey`.
pub struct OracleSigner {
    signing_key: SigningKey,
    address: AccountAddress,
}

impl OracleSigner {
    /// Load a signer from a hex-encoded 32-byte private key.
    pub fn from_hex(key: &str) -> Result<Self, SignerError> {
        let trimmed = key.trim();
        let stripped = trimmed.strip_prefix(KEY_PREFIX).unwrap_or(trimmed);
        let stripped = stripped.strip_prefix("0x").unwrap_or(stripped);

        let mut raw = hex::decode(stripped).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        if raw.len() != 32 {
            let len = raw.len();
            raw.zeroize();
            return Err(SignerError::InvalidKey(format!("expected 32 bytes, got {len}")));
        }

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw);
        raw.zeroize();
        let signer = Self::from_bytes(&bytes);
        bytes.zeroize();
        Ok(signer)
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let address = derive_address(&signing_key.verifying_key());
        Self { signing_key, address }
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign arbitrary bytes.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Encode, sign, and wrap a raw transaction for submission.
    pub fn sign_transaction(&self, raw: &RawTransaction) -> Result<SignedPayload, PublishError> {
        let bytes = raw.encode()?;
        let signature = self.sign(&signing_message(&bytes));
        Ok(SignedPayload {
            sender: raw.sender,
            raw_txn: hex::encode(&bytes),
            public_key: hex::encode(self.verifying_key().to_bytes()),
            signature: hex::encode(signature),
        })
    }
}

impl fmt::Debug for OracleSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Account address controlled by `key`.
pub fn derive_address(key: &VerifyingKey) -> AccountAddress {
    let mut hasher = blake3::Hasher::new();
    hasher.update(key.as_bytes());
    hasher.update(&[SINGLE_KEY_SCHEME]);
    AccountAddress(*hasher.finalize().as_bytes())
}

/// Check a submitted payload's signature against its embedded public key.
pub fn verify_payload(payload: &SignedPayload) -> bool {
    let decode32 = |s: &str| -> Option<[u8; 32]> { hex::decode(s).ok()?.try_into().ok() };
    let Some(pk) = decode32(&payload.public_key) else { return false };
    let Ok(key) = VerifyingKey::from_bytes(&pk) else { return false };
    let Some(sig) = hex::decode(&payload.signature).ok().and_then(|b| <[u8; 64]>::try_from(b).ok()) else {
        return false;
    };
    let Ok(raw) = hex::decode(&payload.raw_txn) else { return false };
    key.verify(&signing_message(&raw), &ed25519_dalek::Signature::from_bytes(&sig)).is_ok()
        && derive_address(&key) == payload.sender
}
