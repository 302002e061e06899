//! Weather oracle — attested temperature readings

use serde::{Deserialize, Serialize};

use super::{submit_payload, Application, OutputRecord};
use crate::error::Result;
use crate::intent::{validate_text, IntentPayload, IntentScope};
use crate::registry::{EnclaveIdentity, OneTimeWitness};

pub struct Weather;

/// Signed by the enclave. Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherPayload {
    pub location: String,
    pub temperature: u64,
}

impl IntentPayload for WeatherPayload {
    const INTENT: IntentScope = IntentScope::Weather;

    fn validate(&self) -> Result<()> {
        validate_text("location", &self.location)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub location: String,
    pub temperature: u64,
    pub timestamp_ms: u64,
}

impl OutputRecord for WeatherRecord {
    const KIND: &'static str = "WeatherRecord";
}

impl Application for Weather {
    type Payload = WeatherPayload;
    type Record = WeatherRecord;

    fn mint(payload: WeatherPayload, timestamp_ms: u64) -> WeatherRecord {
        WeatherRecord {
            location: payload.location,
            temperature: payload.temperature,
            timestamp_ms,
        }
    }
}

/// Verify an enclave-signed reading and produce its record
pub fn submit<T: OneTimeWitness>(
    location: &str,
    temperature: u64,
    timestamp_ms: u64,
    signature: &[u8],
    identity: &EnclaveIdentity<T>,
) -> Result<WeatherRecord> {
    let payload = WeatherPayload {
        location: location.to_string(),
        temperature,
    };
    submit_payload::<Weather, T>(payload, timestamp_ms, signature, identity)
}
