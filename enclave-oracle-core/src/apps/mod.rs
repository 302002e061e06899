//! Application modules — adapters between the generic verifier and a
//! concrete output record
//!
//! Each application declares one payload shape with its intent tag and one
//! record type. Verification and minting go through [`submit_payload`], so
//! every application inherits the same domain separation.

pub mod inference;
pub mod weather;

pub use inference::{Inference, InferencePayload, InferenceRecord};
pub use weather::{Weather, WeatherPayload, WeatherRecord};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{OracleError, Result};
use crate::intent::{verify_signature, IntentPayload};
use crate::ledger::{Address, Ledger, ObjectBody, ObjectId, Owner, StoredObject};
use crate::registry::{witness_name, EnclaveIdentity, OneTimeWitness};

/// Witness for the enclave family serving both weather and inference
pub struct Oracle {
    _private: (),
}

impl Oracle {
    /// The ledger mints at most one capability per witness type, so further
    /// witnesses are useless once the module is initialised.
    pub fn witness() -> Self {
        Self { _private: () }
    }
}

impl OneTimeWitness for Oracle {
    const MODULE: &'static str = "enclave_oracle";
}

/// Persistent, immutable artifact minted after successful verification
pub trait OutputRecord: Serialize + DeserializeOwned {
    const KIND: &'static str;
}

pub trait Application {
    type Payload: IntentPayload;
    type Record: OutputRecord;

    fn mint(payload: Self::Payload, timestamp_ms: u64) -> Self::Record;
}

/// Validate, verify, then mint. Nothing is produced on any failure.
pub fn submit_payload<A: Application, T: OneTimeWitness>(
    payload: A::Payload,
    timestamp_ms: u64,
    signature: &[u8],
    identity: &EnclaveIdentity<T>,
) -> Result<A::Record> {
    payload.validate()?;
    let intent = <A::Payload as IntentPayload>::INTENT;
    if !verify_signature(intent.tag(), timestamp_ms, &payload, signature, identity) {
        log::debug!("Signature rejected for intent {} at {}", intent, timestamp_ms);
        return Err(OracleError::SignatureInvalid);
    }
    Ok(A::mint(payload, timestamp_ms))
}

impl Ledger {
    /// Run application `A`'s submit against a committed identity and transfer
    /// the resulting record to `recipient`
    pub fn submit<A: Application, T: OneTimeWitness>(
        &mut self,
        payload: A::Payload,
        timestamp_ms: u64,
        signature: &[u8],
        identity: &EnclaveIdentity<T>,
        recipient: Address,
    ) -> Result<(ObjectId, A::Record)> {
        let committed = self
            .identity::<T>(&identity.id())
            .map_err(|e| self.reject(e))?;

        let intent = <A::Payload as IntentPayload>::INTENT.tag();
        let record = submit_payload::<A, T>(payload, timestamp_ms, signature, &committed)
            .map_err(|e| self.reject(e))?;

        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let replay_key = self
            .replay_guard
            .as_ref()
            .map(|guard| guard.check(intent, timestamp_ms, signature, now_ms));
        let replay_key = replay_key.transpose().map_err(|e| self.reject(e))?;

        let body = serde_json::to_value(&record)?;
        let id = ObjectId::random();

        if let (Some(guard), Some(key)) = (self.replay_guard.as_mut(), replay_key) {
            guard.consume(key, timestamp_ms, now_ms);
        }
        self.insert(
            id,
            StoredObject::new(
                Owner::Address(recipient),
                T::MODULE,
                witness_name::<T>(),
                ObjectBody::Record {
                    kind: <A::Record as OutputRecord>::KIND.to_string(),
                    body,
                },
            ),
        );
        self.metadata.total_records_minted += 1;

        log::info!(
            "Minted {} {} for {} (enclave {})",
            <A::Record as OutputRecord>::KIND,
            id.short(),
            recipient,
            committed.id().short()
        );
        Ok((id, record))
    }

    pub fn record<R: OutputRecord>(&self, id: &ObjectId) -> Result<R> {
        let obj = self
            .get(id)
            .ok_or_else(|| OracleError::ObjectNotFound(id.to_string()))?;
        match &obj.body {
            ObjectBody::Record { kind, body } if kind == R::KIND => {
                Ok(serde_json::from_value(body.clone())?)
            }
            other => Err(OracleError::ObjectNotFound(format!(
                "{} is a {}, not a {}",
                id,
                other.label(),
                R::KIND
            ))),
        }
    }
}
