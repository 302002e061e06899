//! Simulated Nitro-style attestation
//!
//! Stands in for the hardware vendor: the authority holds an Ed25519 "root"
//! key and signs documents, the verifier holds only the public half. Used by
//! the tests and the CLI demo where no real enclave is available.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use super::document::{AttestationDocument, AttestationVerifier, VerifiedAttestation};
use crate::error::{OracleError, Result};
use crate::registry::Measurements;

pub const SIMULATED_MODULE_ID: &str = "i-simulated-enc0";

/// Issues vendor-signed attestation documents
pub struct SimulatedNitroAuthority {
    root: SigningKey,
}

impl SimulatedNitroAuthority {
    pub fn generate() -> Self {
        Self {
            root: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            root: SigningKey::from_bytes(seed),
        }
    }

    pub fn vendor_public_key(&self) -> [u8; 32] {
        self.root.verifying_key().to_bytes()
    }

    pub fn verifier(&self) -> SimulatedNitroVerifier {
        SimulatedNitroVerifier {
            vendor_key: self.root.verifying_key(),
        }
    }

    /// Attest that an enclave measuring `measurements` holds `public_key`
    pub fn issue(
        &self,
        measurements: &Measurements,
        public_key: &[u8; 32],
        timestamp_ms: u64,
    ) -> Result<AttestationDocument> {
        let mut doc = AttestationDocument {
            module_id: SIMULATED_MODULE_ID.to_string(),
            timestamp_ms,
            measurements: measurements.clone(),
            public_key: public_key.to_vec(),
            vendor_signature: Vec::new(),
        };
        let sig = self.root.sign(&doc.signed_bytes()?);
        doc.vendor_signature = sig.to_bytes().to_vec();
        Ok(doc)
    }
}

/// Checks documents against a pinned vendor public key
#[derive(Debug, Clone)]
pub struct SimulatedNitroVerifier {
    vendor_key: VerifyingKey,
}

impl SimulatedNitroVerifier {
    pub fn new(vendor_public_key: &[u8; 32]) -> Result<Self> {
        let vendor_key = VerifyingKey::from_bytes(vendor_public_key)
            .map_err(|e| OracleError::AttestationInvalid(format!("vendor key: {}", e)))?;
        Ok(Self { vendor_key })
    }
}

impl AttestationVerifier for SimulatedNitroVerifier {
    fn verify(&self, document: &AttestationDocument) -> Result<VerifiedAttestation> {
        let signature = Signature::from_slice(&document.vendor_signature).map_err(|_| {
            OracleError::AttestationInvalid(format!(
                "vendor signature must be 64 bytes, got {}",
                document.vendor_signature.len()
            ))
        })?;
        self.vendor_key
            .verify_strict(&document.signed_bytes()?, &signature)
            .map_err(|_| OracleError::AttestationInvalid("vendor signature does not verify".into()))?;

        document
            .measurements
            .validate()
            .map_err(|e| OracleError::AttestationInvalid(e.to_string()))?;

        let public_key: [u8; 32] = document.public_key.as_slice().try_into().map_err(|_| {
            OracleError::AttestationInvalid(format!(
                "enclave public key must be 32 bytes, got {}",
                document.public_key.len()
            ))
        })?;
        VerifyingKey::from_bytes(&public_key)
            .map_err(|e| OracleError::AttestationInvalid(format!("enclave public key: {}", e)))?;

        log::debug!(
            "Attestation from {} verified (timestamp {})",
            document.module_id,
            document.timestamp_ms
        );

        Ok(VerifiedAttestation {
            measurements: document.measurements.clone(),
            public_key,
            timestamp_ms: document.timestamp_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PCR_LEN;

    fn measurements() -> Measurements {
        Measurements::new(vec![1; PCR_LEN], vec![2; PCR_LEN], vec![3; PCR_LEN]).unwrap()
    }

    fn enclave_key() -> [u8; 32] {
        SigningKey::generate(&mut OsRng).verifying_key().to_bytes()
    }

    #[test]
    fn test_issue_and_verify() {
        let authority = SimulatedNitroAuthority::generate();
        let key = enclave_key();
        let doc = authority.issue(&measurements(), &key, 42).unwrap();

        let verified = authority.verifier().verify(&doc).unwrap();
        assert_eq!(verified.public_key, key);
        assert_eq!(verified.measurements, measurements());
        assert_eq!(verified.timestamp_ms, 42);
    }

    #[test]
    fn test_pinned_vendor_key() {
        let authority = SimulatedNitroAuthority::from_seed(&[7u8; 32]);
        let verifier = SimulatedNitroVerifier::new(&authority.vendor_public_key()).unwrap();
        let doc = authority.issue(&measurements(), &enclave_key(), 1).unwrap();
        assert!(verifier.verify(&doc).is_ok());
    }

    #[test]
    fn test_tampered_measurement_rejected() {
        let authority = SimulatedNitroAuthority::generate();
        let mut doc = authority.issue(&measurements(), &enclave_key(), 1).unwrap();
        doc.measurements.pcr1[0] ^= 0x01;

        let err = authority.verifier().verify(&doc).unwrap_err();
        assert!(matches!(err, OracleError::AttestationInvalid(_)));
    }

    #[test]
    fn test_swapped_public_key_rejected() {
        let authority = SimulatedNitroAuthority::generate();
        let mut doc = authority.issue(&measurements(), &enclave_key(), 1).unwrap();
        doc.public_key = enclave_key().to_vec();
        assert!(authority.verifier().verify(&doc).is_err());
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let authority = SimulatedNitroAuthority::generate();
        let mut doc = authority.issue(&measurements(), &enclave_key(), 1).unwrap();
        doc.vendor_signature.truncate(10);
        let err = authority.verifier().verify(&doc).unwrap_err();
        assert!(matches!(err, OracleError::AttestationInvalid(_)));
    }

    #[test]
    fn test_document_hex_transport() {
        let authority = SimulatedNitroAuthority::generate();
        let doc = authority.issue(&measurements(), &enclave_key(), 9).unwrap();
        let decoded = AttestationDocument::from_hex(&doc.to_hex().unwrap()).unwrap();
        assert!(authority.verifier().verify(&decoded).is_ok());
    }
}
