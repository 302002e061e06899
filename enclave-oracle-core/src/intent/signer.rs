//! Enclave-side signer
//!
//! Holds the Ed25519 key generated at enclave boot and signs canonical
//! intent messages. The verifier reproduces the exact same bytes, so this is
//! the reference implementation of the message contract.

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::message::{canonical_message, IntentMessage, IntentPayload};
use crate::error::{OracleError, Result};

/// Response returned by the enclave for every signed observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedResponse<P> {
    pub response: IntentMessage<P>,
    /// Hex-encoded 64-byte Ed25519 signature
    pub signature: String,
}

impl<P> SignedResponse<P> {
    pub fn signature_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.signature)
            .map_err(|e| OracleError::MalformedPayload(format!("signature hex: {}", e)))
    }
}

/// Signing key wrapper; `SigningKey` zeroizes itself on drop
pub struct EnclaveSigner {
    key: SigningKey,
}

impl EnclaveSigner {
    /// Fresh key from the OS RNG, as done once at enclave boot
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    /// Load from a hex-encoded 32-byte seed
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = hex::decode(s.trim())
            .map_err(|e| OracleError::MalformedPayload(format!("seed hex: {}", e)))?;
        let result = <[u8; 32]>::try_from(bytes.as_slice())
            .map(|seed| Self::from_seed(&seed))
            .map_err(|_| {
                OracleError::MalformedPayload(format!("seed must be 32 bytes, got {}", bytes.len()))
            });
        bytes.zeroize();
        result
    }

    pub fn seed_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.key.to_bytes()))
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// Sign raw (`intent`, `timestamp_ms`, `payload`) without tying the
    /// payload type to an intent
    pub fn sign_message<P: Serialize + ?Sized>(
        &self,
        intent: u8,
        timestamp_ms: u64,
        payload: &P,
    ) -> Result<[u8; 64]> {
        let message = canonical_message(intent, timestamp_ms, payload)?;
        Ok(self.key.sign(&message).to_bytes())
    }

    /// Normalize and sign a payload under its own intent, then wrap it for
    /// transport. The response carries the normalized payload.
    pub fn sign<P: IntentPayload>(&self, payload: P, timestamp_ms: u64) -> Result<SignedResponse<P>> {
        let payload = payload.normalize();
        payload.validate()?;
        let signature = self.sign_message(P::INTENT.tag(), timestamp_ms, &payload)?;
        Ok(SignedResponse {
            response: IntentMessage::new(payload, timestamp_ms),
            signature: hex::encode(signature),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::verify_with_key;

    #[test]
    fn test_seed_roundtrip() {
        let signer = EnclaveSigner::generate();
        let restored = EnclaveSigner::from_hex(&signer.seed_hex()).unwrap();
        assert_eq!(restored.public_key(), signer.public_key());
    }

    #[test]
    fn test_bad_seed() {
        assert!(EnclaveSigner::from_hex("abcd").is_err());
        assert!(EnclaveSigner::from_hex("not hex").is_err());
    }

    #[test]
    fn test_deterministic_signatures() {
        let signer = EnclaveSigner::from_seed(&[3u8; 32]);
        let a = signer.sign_message(1, 5, "payload").unwrap();
        let b = signer.sign_message(1, 5, "payload").unwrap();
        assert_eq!(a, b);
        assert!(verify_with_key(1, 5, "payload", &a, &signer.public_key()));
    }
}
