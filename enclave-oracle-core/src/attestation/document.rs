//! Attestation documents and the verifier seam

use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};
use crate::registry::Measurements;

/// Evidence that an enclave with the given measurements generated `public_key`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationDocument {
    pub module_id: String,
    pub timestamp_ms: u64,
    pub measurements: Measurements,
    /// Enclave's Ed25519 public key, carried as raw bytes
    pub public_key: Vec<u8>,
    /// Hardware vendor's signature over [`AttestationDocument::signed_bytes`]
    pub vendor_signature: Vec<u8>,
}

/// The portion of a document covered by the vendor signature
#[derive(Serialize)]
struct SignedBody<'a> {
    module_id: &'a str,
    timestamp_ms: u64,
    pcr0: &'a [u8],
    pcr1: &'a [u8],
    pcr2: &'a [u8],
    public_key: &'a [u8],
}

impl AttestationDocument {
    /// Canonical bytes the vendor signs
    pub fn signed_bytes(&self) -> Result<Vec<u8>> {
        let body = SignedBody {
            module_id: &self.module_id,
            timestamp_ms: self.timestamp_ms,
            pcr0: &self.measurements.pcr0,
            pcr1: &self.measurements.pcr1,
            pcr2: &self.measurements.pcr2,
            public_key: &self.public_key,
        };
        bcs::to_bytes(&body)
            .map_err(|e| OracleError::AttestationInvalid(format!("encoding document: {}", e)))
    }

    /// Encode for transport (hex of the JSON form)
    pub fn to_hex(&self) -> Result<String> {
        Ok(hex::encode(serde_json::to_vec(self)?))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| OracleError::AttestationInvalid(format!("document hex: {}", e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// What a successful attestation check proves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAttestation {
    pub measurements: Measurements,
    pub public_key: [u8; 32],
    pub timestamp_ms: u64,
}

/// External collaborator that checks a document's vendor signature and
/// extracts the measurements and enclave key it vouches for.
pub trait AttestationVerifier {
    /// Fails with `AttestationInvalid` when the document cannot be trusted
    fn verify(&self, document: &AttestationDocument) -> Result<VerifiedAttestation>;
}
