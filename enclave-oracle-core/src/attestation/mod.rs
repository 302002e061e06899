//! Attestation — evidence that an enclave key was generated by measured code
//!
//! Parsing real vendor documents is delegated to an [`AttestationVerifier`]
//! implementation; the registry only consumes the verified measurements and
//! public key. A simulated Nitro-style authority is provided for development.

mod document;
mod simulated;

pub use document::{AttestationDocument, AttestationVerifier, VerifiedAttestation};
pub use simulated::{SimulatedNitroAuthority, SimulatedNitroVerifier, SIMULATED_MODULE_ID};
