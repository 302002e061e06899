//! EnclaveIdentity — a registered enclave public key bound to a config
//!
//! Registration requires the module capability plus an attestation document
//! whose vendor signature verifies and whose PCRs equal the config's. Once
//! registered the public key is never overwritten; rotation means registering
//! a new identity and optionally marking the old one superseded.

use std::fmt;
use std::marker::PhantomData;

use super::capability::{witness_name, Capability, OneTimeWitness};
use super::config::EnclaveConfig;
use crate::attestation::{AttestationDocument, AttestationVerifier};
use crate::error::{OracleError, Result};
use crate::ledger::{Ledger, ObjectBody, ObjectId, Owner, StoredObject};

/// A registered enclave key, authoritative for the requests it is passed to
pub struct EnclaveIdentity<T> {
    id: ObjectId,
    public_key: [u8; 32],
    config_id: ObjectId,
    registered_at_ms: u64,
    superseded_by: Option<ObjectId>,
    _module: PhantomData<fn() -> T>,
}

impl<T: OneTimeWitness> EnclaveIdentity<T> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    pub fn config_id(&self) -> ObjectId {
        self.config_id
    }

    pub fn registered_at_ms(&self) -> u64 {
        self.registered_at_ms
    }

    /// Set when a newer identity replaced this one. Informational only:
    /// verification still succeeds against a superseded key.
    pub fn superseded_by(&self) -> Option<ObjectId> {
        self.superseded_by
    }

    fn to_body(&self) -> ObjectBody {
        ObjectBody::Identity {
            public_key: self.public_key,
            config_id: self.config_id,
            registered_at_ms: self.registered_at_ms,
            superseded_by: self.superseded_by,
        }
    }
}

impl<T> Clone for EnclaveIdentity<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            public_key: self.public_key,
            config_id: self.config_id,
            registered_at_ms: self.registered_at_ms,
            superseded_by: self.superseded_by,
            _module: PhantomData,
        }
    }
}

impl<T: OneTimeWitness> fmt::Debug for EnclaveIdentity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnclaveIdentity")
            .field("module", &T::MODULE)
            .field("id", &self.id)
            .field("public_key", &hex::encode(self.public_key))
            .field("config_id", &self.config_id)
            .field("registered_at_ms", &self.registered_at_ms)
            .field("superseded_by", &self.superseded_by)
            .finish()
    }
}

impl Ledger {
    /// Register the enclave key carried by `document` against `config`
    pub fn register_enclave<T, V>(
        &mut self,
        cap: &Capability<T>,
        config: &EnclaveConfig<T>,
        document: &AttestationDocument,
        verifier: &V,
        timestamp_ms: u64,
    ) -> Result<EnclaveIdentity<T>>
    where
        T: OneTimeWitness,
        V: AttestationVerifier + ?Sized,
    {
        self.check_capability(cap)?;

        // Compare against the committed config, not the caller's copy
        let committed = self.config::<T>(&config.id())?;

        let attested = verifier.verify(document).map_err(|e| self.reject(e))?;
        if let Some(register) = attested.measurements.first_mismatch(&committed.measurements) {
            return Err(self.reject(OracleError::AttestationMismatch(format!(
                "{} differs from config {}",
                register,
                committed.id()
            ))));
        }

        let identity = EnclaveIdentity {
            id: ObjectId::random(),
            public_key: attested.public_key,
            config_id: committed.id(),
            registered_at_ms: timestamp_ms,
            superseded_by: None,
            _module: PhantomData,
        };
        self.insert(
            identity.id,
            StoredObject::new(Owner::Shared, T::MODULE, witness_name::<T>(), identity.to_body()),
        );

        log::info!(
            "Registered enclave {} (key {}) against config {} for module {}",
            identity.id.short(),
            &hex::encode(identity.public_key)[..16],
            committed.id().short(),
            T::MODULE
        );
        Ok(identity)
    }

    /// Mark `old` as replaced by `new`. The old key is left intact for audit.
    pub fn supersede<T: OneTimeWitness>(
        &mut self,
        cap: &Capability<T>,
        old: &mut EnclaveIdentity<T>,
        new: &EnclaveIdentity<T>,
    ) -> Result<()> {
        self.check_capability(cap)?;
        self.identity::<T>(&new.id)?;
        let mut updated = self.identity::<T>(&old.id)?;
        updated.superseded_by = Some(new.id);

        let obj = self.scoped_mut(&old.id, T::MODULE, witness_name::<T>())?;
        obj.body = updated.to_body();
        obj.version += 1;

        log::info!("Enclave {} superseded by {}", old.id.short(), new.id.short());
        *old = updated;
        Ok(())
    }

    /// Current committed state of an identity
    pub fn identity<T: OneTimeWitness>(&self, id: &ObjectId) -> Result<EnclaveIdentity<T>> {
        match &self.scoped(id, T::MODULE, witness_name::<T>())?.body {
            ObjectBody::Identity {
                public_key,
                config_id,
                registered_at_ms,
                superseded_by,
            } => Ok(EnclaveIdentity {
                id: *id,
                public_key: *public_key,
                config_id: *config_id,
                registered_at_ms: *registered_at_ms,
                superseded_by: *superseded_by,
                _module: PhantomData,
            }),
            other => Err(OracleError::ObjectNotFound(format!(
                "{} is a {}, not an EnclaveIdentity",
                id,
                other.label()
            ))),
        }
    }
}

#[cfg(test)]
pub(crate) fn detached_identity<T: OneTimeWitness>(public_key: [u8; 32]) -> EnclaveIdentity<T> {
    EnclaveIdentity {
        id: ObjectId::random(),
        public_key,
        config_id: ObjectId::random(),
        registered_at_ms: 0,
        superseded_by: None,
        _module: PhantomData,
    }
}

#[cfg(test)]
impl<T: OneTimeWitness> EnclaveIdentity<T> {
    /// Same object, viewed through another witness type
    pub(crate) fn with_witness<U: OneTimeWitness>(&self) -> EnclaveIdentity<U> {
        EnclaveIdentity {
            id: self.id,
            public_key: self.public_key,
            config_id: self.config_id,
            registered_at_ms: self.registered_at_ms,
            superseded_by: self.superseded_by,
            _module: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::SimulatedNitroAuthority;
    use crate::intent::EnclaveSigner;
    use crate::ledger::Address;
    use crate::registry::PCR_LEN;

    struct Fam;
    impl OneTimeWitness for Fam {
        const MODULE: &'static str = "fam";
    }

    struct Setup {
        ledger: Ledger,
        cap: Capability<Fam>,
        config: EnclaveConfig<Fam>,
        authority: SimulatedNitroAuthority,
    }

    fn setup() -> Setup {
        let mut ledger = Ledger::new("test");
        let cap = ledger.mint_capability(Fam, Address::random()).unwrap();
        let config = ledger
            .create_config(&cap, "enclave", vec![0; PCR_LEN], vec![1; PCR_LEN], vec![2; PCR_LEN])
            .unwrap();
        Setup {
            ledger,
            cap,
            config,
            authority: SimulatedNitroAuthority::generate(),
        }
    }

    #[test]
    fn test_register_matching_enclave() {
        let mut s = setup();
        let signer = EnclaveSigner::generate();
        let doc = s
            .authority
            .issue(&s.config.measurements, &signer.public_key(), 1_000)
            .unwrap();

        let identity = s
            .ledger
            .register_enclave(&s.cap, &s.config, &doc, &s.authority.verifier(), 1_000)
            .unwrap();

        assert_eq!(identity.public_key(), &signer.public_key());
        assert_eq!(identity.config_id(), s.config.id());
        assert_eq!(identity.registered_at_ms(), 1_000);
        assert_eq!(s.ledger.owner(&identity.id()), Some(Owner::Shared));
        assert_eq!(
            s.ledger.identity::<Fam>(&identity.id()).unwrap().public_key(),
            identity.public_key()
        );
    }

    #[test]
    fn test_mismatch_in_each_register() {
        for register in 0..3 {
            let mut s = setup();
            let mut measured = s.config.measurements.clone();
            match register {
                0 => measured.pcr0[0] ^= 0xff,
                1 => measured.pcr1[PCR_LEN / 2] ^= 0x01,
                _ => measured.pcr2[PCR_LEN - 1] ^= 0x80,
            }
            let doc = s
                .authority
                .issue(&measured, &EnclaveSigner::generate().public_key(), 1)
                .unwrap();
            let before = s.ledger.len();

            let err = s
                .ledger
                .register_enclave(&s.cap, &s.config, &doc, &s.authority.verifier(), 1)
                .unwrap_err();
            assert!(
                matches!(err, OracleError::AttestationMismatch(ref msg) if msg.starts_with(&format!("pcr{}", register))),
                "register {} gave {:?}",
                register,
                err
            );
            assert_eq!(s.ledger.len(), before);
        }
    }

    #[test]
    fn test_forged_document_rejected() {
        let mut s = setup();
        let rogue = SimulatedNitroAuthority::generate();
        let doc = rogue
            .issue(&s.config.measurements, &EnclaveSigner::generate().public_key(), 1)
            .unwrap();

        let err = s
            .ledger
            .register_enclave(&s.cap, &s.config, &doc, &s.authority.verifier(), 1)
            .unwrap_err();
        assert!(matches!(err, OracleError::AttestationInvalid(_)));
    }

    #[test]
    fn test_register_without_capability() {
        let mut s = setup();
        let mut elsewhere = Ledger::new("elsewhere");
        let foreign = elsewhere.mint_capability(Fam, Address::random()).unwrap();
        let doc = s
            .authority
            .issue(&s.config.measurements, &EnclaveSigner::generate().public_key(), 1)
            .unwrap();

        let err = s
            .ledger
            .register_enclave(&foreign, &s.config, &doc, &s.authority.verifier(), 1)
            .unwrap_err();
        assert!(matches!(err, OracleError::CapabilityMissing(_)));
    }

    #[test]
    fn test_register_uses_committed_config() {
        let mut s = setup();
        let stale = s.config.clone();
        let doc = s
            .authority
            .issue(&stale.measurements, &EnclaveSigner::generate().public_key(), 1)
            .unwrap();
        s.ledger
            .update_pcrs(&s.cap, &mut s.config, vec![9; PCR_LEN], vec![9; PCR_LEN], vec![9; PCR_LEN])
            .unwrap();

        let err = s
            .ledger
            .register_enclave(&s.cap, &stale, &doc, &s.authority.verifier(), 1)
            .unwrap_err();
        assert!(matches!(err, OracleError::AttestationMismatch(_)));
    }

    #[test]
    fn test_rotation_keeps_old_identity() {
        let mut s = setup();
        let verifier = s.authority.verifier();
        let first_key = EnclaveSigner::generate().public_key();
        let second_key = EnclaveSigner::generate().public_key();

        let doc1 = s.authority.issue(&s.config.measurements, &first_key, 1).unwrap();
        let mut old = s.ledger.register_enclave(&s.cap, &s.config, &doc1, &verifier, 1).unwrap();
        let doc2 = s.authority.issue(&s.config.measurements, &second_key, 2).unwrap();
        let new = s.ledger.register_enclave(&s.cap, &s.config, &doc2, &verifier, 2).unwrap();

        assert_ne!(old.id(), new.id());
        s.ledger.supersede(&s.cap, &mut old, &new).unwrap();

        let stored_old = s.ledger.identity::<Fam>(&old.id()).unwrap();
        assert_eq!(stored_old.superseded_by(), Some(new.id()));
        assert_eq!(stored_old.public_key(), &first_key);
        assert_eq!(old.superseded_by(), Some(new.id()));
        assert_eq!(s.ledger.identity::<Fam>(&new.id()).unwrap().superseded_by(), None);
    }
}
