//! Verifier — rebuild the canonical message and check it against a key
//!
//! Failure is a plain `false`; callers learn nothing about which byte was
//! wrong.

use ed25519_dalek::{Signature, VerifyingKey};
use serde::Serialize;

use super::message::canonical_message;
use crate::registry::{EnclaveIdentity, OneTimeWitness};

/// Check `signature` over (`intent`, `timestamp_ms`, `payload`) against the
/// identity's registered key
pub fn verify_signature<T: OneTimeWitness, P: Serialize + ?Sized>(
    intent: u8,
    timestamp_ms: u64,
    payload: &P,
    signature: &[u8],
    identity: &EnclaveIdentity<T>,
) -> bool {
    verify_with_key(intent, timestamp_ms, payload, signature, identity.public_key())
}

/// Same check against a bare Ed25519 public key
pub fn verify_with_key<P: Serialize + ?Sized>(
    intent: u8,
    timestamp_ms: u64,
    payload: &P,
    signature: &[u8],
    public_key: &[u8; 32],
) -> bool {
    let message = match canonical_message(intent, timestamp_ms, payload) {
        Ok(m) => m,
        Err(_) => return false,
    };
    let key = match VerifyingKey::from_bytes(public_key) {
        Ok(k) => k,
        Err(_) => return false,
    };
    let signature = match Signature::from_slice(signature) {
        Ok(s) => s,
        Err(_) => return false,
    };
    key.verify_strict(&message, &signature).is_ok()
}
