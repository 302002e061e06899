//! Node configuration
//!
//! Loaded from JSON. The path comes from `ENCLAVE_ORACLE_CONFIG`, falling back
//! to `enclave-oracle.json` in the working directory; missing files yield the
//! defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::registry::{Measurements, PCR_LEN};

pub const CONFIG_ENV: &str = "ENCLAVE_ORACLE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "enclave-oracle.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Human-readable name stored on the enclave config
    pub enclave_name: String,
    /// Expected measurements, hex-encoded
    pub pcr0: String,
    pub pcr1: String,
    pub pcr2: String,
    /// Ledger snapshot location
    pub ledger_path: String,
    /// Hex seed of the enclave signing key
    pub key_path: String,
    /// When set, submissions go through a replay guard with this window
    pub freshness_window_ms: Option<u64>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        let zero = "00".repeat(PCR_LEN);
        Self {
            enclave_name: "enclave-oracle".to_string(),
            pcr0: zero.clone(),
            pcr1: zero.clone(),
            pcr2: zero,
            ledger_path: "enclave-oracle-ledger.json".to_string(),
            key_path: "enclave-oracle.key".to_string(),
            freshness_window_ms: None,
        }
    }
}

impl OracleConfig {
    /// Resolve the config path from the environment and load it
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: OracleConfig = serde_json::from_str(&data)?;
        config.measurements()?;
        log::info!("Loaded config '{}' from {}", config.enclave_name, path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn measurements(&self) -> Result<Measurements> {
        Measurements::from_hex(&self.pcr0, &self.pcr1, &self.pcr2)
    }
}
