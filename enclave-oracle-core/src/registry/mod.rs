//! Registry — capabilities, enclave configs and enclave identities
//!
//! - **Capability**: one-time admission token minted per witness type
//! - **EnclaveConfig**: expected PCR0/1/2 measurements, the trust anchor
//! - **EnclaveIdentity**: an attested enclave public key bound to a config

mod capability;
mod config;
mod identity;

pub use capability::{Capability, OneTimeWitness};
pub(crate) use capability::witness_name;
pub use config::{EnclaveConfig, Measurements, PCR_LEN};
pub use identity::EnclaveIdentity;

#[cfg(test)]
pub(crate) use identity::detached_identity;
