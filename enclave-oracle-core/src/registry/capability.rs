//! Capability — one-time, type-scoped admission token
//!
//! A capability is minted exactly once per witness type when the module is
//! initialised. Holding it is the only way to create configs or register
//! enclave identities for that type. After a snapshot reload the owner
//! recovers the handle with [`Ledger::capability`].

use std::fmt;
use std::marker::PhantomData;

use crate::error::{OracleError, Result};
use crate::ledger::{Address, Ledger, ObjectBody, ObjectId, Owner, StoredObject};

/// A witness type identifying one application family.
///
/// The value is consumed by [`Ledger::mint_capability`]; the ledger refuses a
/// second mint for the same `MODULE`.
pub trait OneTimeWitness: 'static {
    /// Unique module name the witness scopes objects to
    const MODULE: &'static str;
}

/// Type name stored next to `MODULE` on every object, so two witness types
/// that declare the same module name still see disjoint objects
pub(crate) fn witness_name<T: OneTimeWitness>() -> &'static str {
    std::any::type_name::<T>()
}

/// Possession-based authorization for module `T`. Deliberately not `Clone`.
pub struct Capability<T> {
    id: ObjectId,
    owner: Address,
    _witness: PhantomData<fn() -> T>,
}

impl<T: OneTimeWitness> Capability<T> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn owner(&self) -> Address {
        self.owner
    }
}

impl<T: OneTimeWitness> fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("module", &T::MODULE)
            .field("id", &self.id)
            .field("owner", &self.owner)
            .finish()
    }
}

impl Ledger {
    /// Consume the module's witness and hand its capability to `deployer`
    pub fn mint_capability<T: OneTimeWitness>(
        &mut self,
        _witness: T,
        deployer: Address,
    ) -> Result<Capability<T>> {
        if self.capabilities.contains_key(T::MODULE) {
            return Err(self.reject(OracleError::CapabilityAlreadyMinted(T::MODULE.to_string())));
        }

        let id = ObjectId::random();
        self.insert(
            id,
            StoredObject::new(
                Owner::Address(deployer),
                T::MODULE,
                witness_name::<T>(),
                ObjectBody::Capability,
            ),
        );
        self.capabilities.insert(T::MODULE.to_string(), id);

        log::info!("Minted capability {} for module {} to {}", id.short(), T::MODULE, deployer);

        Ok(Capability {
            id,
            owner: deployer,
            _witness: PhantomData,
        })
    }

    /// Re-issue the handle for `T`'s capability to its recorded owner.
    ///
    /// Handles do not survive a snapshot round trip; the owner address stands
    /// in for the transaction sender.
    pub fn capability<T: OneTimeWitness>(&mut self, owner: Address) -> Result<Capability<T>> {
        let recorded = self.capabilities.get(T::MODULE).and_then(|id| {
            self.scoped(id, T::MODULE, witness_name::<T>())
                .ok()
                .map(|obj| (*id, obj.owner))
        });
        match recorded {
            Some((id, Owner::Address(addr))) if addr == owner => {
                log::debug!("Recovered capability {} for module {}", id.short(), T::MODULE);
                Ok(Capability {
                    id,
                    owner,
                    _witness: PhantomData,
                })
            }
            _ => Err(self.reject(OracleError::CapabilityMissing(T::MODULE.to_string()))),
        }
    }

    /// Check `cap` is the capability this ledger minted for `T`
    pub(crate) fn check_capability<T: OneTimeWitness>(&mut self, cap: &Capability<T>) -> Result<()> {
        let minted = self.capabilities.get(T::MODULE) == Some(&cap.id)
            && self.scoped(&cap.id, T::MODULE, witness_name::<T>()).is_ok();
        if minted {
            return Ok(());
        }
        Err(self.reject(OracleError::CapabilityMissing(T::MODULE.to_string())))
    }
}
