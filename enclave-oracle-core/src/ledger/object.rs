//! Object identifiers, addresses and the type-erased object envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OracleError, Result};

/// Unique identifier of a ledger object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(uuid::Uuid);

impl ObjectId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// First 8 hex characters, for log lines
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 32-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Parse a `0x`-prefixed (or bare) 64-character hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| OracleError::MalformedPayload(format!("address: {}", e)))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            OracleError::MalformedPayload(format!("address must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Who may use an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    /// Owned exclusively by one address
    Address(Address),
    /// Readable by every transaction (configs, identities)
    Shared,
}

/// Stored form of every object kind the ledger knows about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObjectBody {
    Capability,
    Config {
        name: String,
        pcr0: Vec<u8>,
        pcr1: Vec<u8>,
        pcr2: Vec<u8>,
    },
    Identity {
        public_key: [u8; 32],
        config_id: ObjectId,
        registered_at_ms: u64,
        superseded_by: Option<ObjectId>,
    },
    Record {
        kind: String,
        body: serde_json::Value,
    },
}

impl ObjectBody {
    pub fn label(&self) -> &str {
        match self {
            ObjectBody::Capability => "Capability",
            ObjectBody::Config { .. } => "EnclaveConfig",
            ObjectBody::Identity { .. } => "EnclaveIdentity",
            ObjectBody::Record { kind, .. } => kind.as_str(),
        }
    }
}

/// An object as it lives on the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub owner: Owner,
    /// Module name the object is scoped to
    pub module: String,
    /// Full type name of the witness that created it
    pub witness: String,
    /// Bumped on every mutation
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub body: ObjectBody,
}

impl StoredObject {
    pub fn new(owner: Owner, module: &str, witness: &str, body: ObjectBody) -> Self {
        Self {
            owner,
            module: module.to_string(),
            witness: witness.to_string(),
            version: 1,
            created_at: Utc::now(),
            body,
        }
    }
}
