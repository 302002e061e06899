//! Error taxonomy for the oracle core
//!
//! Every variant maps to a stable abort code so a rejected operation can be
//! reported the same way a ledger reports an aborted transaction.

/// Errors raised by registry, attestation and submission operations
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("capability missing or not issued by this ledger for module {0}")]
    CapabilityMissing(String),

    #[error("capability already minted for module {0}")]
    CapabilityAlreadyMinted(String),

    #[error("attestation measurements do not match config: {0}")]
    AttestationMismatch(String),

    #[error("attestation document invalid: {0}")]
    AttestationInvalid(String),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("request already consumed")]
    ReplayDetected,

    #[error("timestamp {timestamp_ms} outside freshness window of {window_ms}ms")]
    StaleTimestamp { timestamp_ms: u64, window_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OracleError {
    /// Numeric abort code, stable across releases
    pub fn abort_code(&self) -> u64 {
        match self {
            OracleError::CapabilityMissing(_) => 1,
            OracleError::CapabilityAlreadyMinted(_) => 2,
            OracleError::AttestationMismatch(_) => 3,
            OracleError::AttestationInvalid(_) => 4,
            OracleError::SignatureInvalid => 5,
            OracleError::MalformedPayload(_) => 6,
            OracleError::ObjectNotFound(_) => 7,
            OracleError::ReplayDetected => 8,
            OracleError::StaleTimestamp { .. } => 9,
            OracleError::Io(_) | OracleError::Json(_) => 100,
        }
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;
