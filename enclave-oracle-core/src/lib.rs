//! Enclave Oracle — attested enclave identities and intent-scoped signatures
//!
//! An enclave signs observations (weather readings, model answers); the
//! ledger modules here verify that each signature came from a registered,
//! attested enclave before minting a record for it.

pub mod apps;
pub mod attestation;
pub mod config;
pub mod error;
pub mod intent;
pub mod ledger;
pub mod registry;

pub use apps::{Inference, InferencePayload, InferenceRecord, Oracle, Weather, WeatherPayload, WeatherRecord};
pub use error::{OracleError, Result};
pub use intent::{verify_signature, EnclaveSigner, IntentScope};
pub use ledger::{Address, Ledger, ObjectId};
pub use registry::{Capability, EnclaveConfig, EnclaveIdentity, Measurements, OneTimeWitness};
