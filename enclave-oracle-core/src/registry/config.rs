//! EnclaveConfig — expected measurements for one application family
//!
//! A config is the trust anchor for registration: an enclave identity can
//! only be registered when its attested PCR0/1/2 equal the config's values.
//! Configs are versionable; several may exist per module at once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

use super::capability::{witness_name, Capability, OneTimeWitness};
use crate::error::{OracleError, Result};
use crate::ledger::{Ledger, ObjectBody, ObjectId, Owner, StoredObject};

/// Length of each PCR value (SHA-384 digest)
pub const PCR_LEN: usize = 48;

/// The three enclave measurement registers compared at registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurements {
    pub pcr0: Vec<u8>,
    pub pcr1: Vec<u8>,
    pub pcr2: Vec<u8>,
}

impl Measurements {
    pub fn new(pcr0: Vec<u8>, pcr1: Vec<u8>, pcr2: Vec<u8>) -> Result<Self> {
        let m = Self { pcr0, pcr1, pcr2 };
        m.validate()?;
        Ok(m)
    }

    /// Parse three hex-encoded PCR values
    pub fn from_hex(pcr0: &str, pcr1: &str, pcr2: &str) -> Result<Self> {
        let decode = |name: &str, s: &str| {
            hex::decode(s).map_err(|e| OracleError::MalformedPayload(format!("{}: {}", name, e)))
        };
        Self::new(decode("pcr0", pcr0)?, decode("pcr1", pcr1)?, decode("pcr2", pcr2)?)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.registers() {
            if value.len() != PCR_LEN {
                return Err(OracleError::MalformedPayload(format!(
                    "{} must be {} bytes, got {}",
                    name,
                    PCR_LEN,
                    value.len()
                )));
            }
        }
        Ok(())
    }

    /// Name of the first register that differs from `expected`, if any
    pub fn first_mismatch(&self, expected: &Measurements) -> Option<&'static str> {
        self.registers()
            .into_iter()
            .zip(expected.registers())
            .find(|((_, actual), (_, wanted))| actual != wanted)
            .map(|((name, _), _)| name)
    }

    fn registers(&self) -> [(&'static str, &[u8]); 3] {
        [
            ("pcr0", self.pcr0.as_slice()),
            ("pcr1", self.pcr1.as_slice()),
            ("pcr2", self.pcr2.as_slice()),
        ]
    }
}

/// Expected measurements for module `T`, stored as a shared object
pub struct EnclaveConfig<T> {
    id: ObjectId,
    pub name: String,
    pub measurements: Measurements,
    _module: PhantomData<fn() -> T>,
}

impl<T: OneTimeWitness> EnclaveConfig<T> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    fn to_body(&self) -> ObjectBody {
        ObjectBody::Config {
            name: self.name.clone(),
            pcr0: self.measurements.pcr0.clone(),
            pcr1: self.measurements.pcr1.clone(),
            pcr2: self.measurements.pcr2.clone(),
        }
    }
}

impl<T> Clone for EnclaveConfig<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            measurements: self.measurements.clone(),
            _module: PhantomData,
        }
    }
}

impl<T: OneTimeWitness> fmt::Debug for EnclaveConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnclaveConfig")
            .field("module", &T::MODULE)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pcr0", &hex::encode(&self.measurements.pcr0))
            .finish()
    }
}

impl Ledger {
    /// Create a new shared config for module `T`
    pub fn create_config<T: OneTimeWitness>(
        &mut self,
        cap: &Capability<T>,
        name: &str,
        pcr0: Vec<u8>,
        pcr1: Vec<u8>,
        pcr2: Vec<u8>,
    ) -> Result<EnclaveConfig<T>> {
        self.check_capability(cap)?;
        let measurements = Measurements::new(pcr0, pcr1, pcr2).map_err(|e| self.reject(e))?;

        let config = EnclaveConfig {
            id: ObjectId::random(),
            name: name.to_string(),
            measurements,
            _module: PhantomData,
        };
        self.insert(
            config.id,
            StoredObject::new(Owner::Shared, T::MODULE, witness_name::<T>(), config.to_body()),
        );

        log::info!(
            "Created enclave config {} '{}' for module {}",
            config.id.short(),
            name,
            T::MODULE
        );
        Ok(config)
    }

    pub fn update_config_name<T: OneTimeWitness>(
        &mut self,
        cap: &Capability<T>,
        config: &mut EnclaveConfig<T>,
        name: &str,
    ) -> Result<()> {
        self.check_capability(cap)?;
        let mut updated = self.config::<T>(&config.id)?;
        updated.name = name.to_string();
        self.commit_config(&updated)?;
        *config = updated;
        Ok(())
    }

    /// Replace the expected measurements. Identities already registered
    /// against this config keep their binding and are not re-checked.
    pub fn update_pcrs<T: OneTimeWitness>(
        &mut self,
        cap: &Capability<T>,
        config: &mut EnclaveConfig<T>,
        pcr0: Vec<u8>,
        pcr1: Vec<u8>,
        pcr2: Vec<u8>,
    ) -> Result<()> {
        self.check_capability(cap)?;
        let measurements = Measurements::new(pcr0, pcr1, pcr2).map_err(|e| self.reject(e))?;
        let mut updated = self.config::<T>(&config.id)?;
        updated.measurements = measurements;
        self.commit_config(&updated)?;
        *config = updated;
        Ok(())
    }

    /// Current committed state of a config
    pub fn config<T: OneTimeWitness>(&self, id: &ObjectId) -> Result<EnclaveConfig<T>> {
        match &self.scoped(id, T::MODULE, witness_name::<T>())?.body {
            ObjectBody::Config { name, pcr0, pcr1, pcr2 } => Ok(EnclaveConfig {
                id: *id,
                name: name.clone(),
                measurements: Measurements {
                    pcr0: pcr0.clone(),
                    pcr1: pcr1.clone(),
                    pcr2: pcr2.clone(),
                },
                _module: PhantomData,
            }),
            other => Err(OracleError::ObjectNotFound(format!(
                "{} is a {}, not an EnclaveConfig",
                id,
                other.label()
            ))),
        }
    }

    fn commit_config<T: OneTimeWitness>(&mut self, config: &EnclaveConfig<T>) -> Result<()> {
        let obj = self.scoped_mut(&config.id, T::MODULE, witness_name::<T>())?;
        obj.body = config.to_body();
        obj.version += 1;
        log::info!(
            "Updated enclave config {} '{}' (version {})",
            config.id.short(),
            config.name,
            obj.version
        );
        Ok(())
    }
}
