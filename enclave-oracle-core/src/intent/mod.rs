//! Intent-scoped signing and verification
//!
//! - **message**: canonical `intent || timestamp || bcs(payload)` layout
//! - **verifier**: generic signature check against an enclave identity
//! - **signer**: the enclave side of the contract
//! - **replay**: optional consumed-request set and freshness window

mod message;
mod replay;
mod signer;
mod verifier;

pub use message::{
    canonical_message, sanitize_question, sanitize_text, validate_text, IntentMessage,
    IntentPayload, IntentScope, MAX_FIELD_LEN,
};
pub use replay::ReplayGuard;
pub use signer::{EnclaveSigner, SignedResponse};
pub use verifier::{verify_signature, verify_with_key};
