//! Ledger — the object store the oracle modules execute against
//!
//! Models the transactional substrate: every object has an id, an owner and
//! a version; each privileged operation validates fully before it commits,
//! so a rejected call leaves the store untouched. Snapshots persist as JSON.

mod object;

pub use object::{Address, ObjectBody, ObjectId, Owner, StoredObject};

use crate::error::{OracleError, Result};
use crate::intent::ReplayGuard;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct Ledger {
    pub(crate) objects: BTreeMap<ObjectId, StoredObject>,
    /// Module name -> id of the one capability minted for it
    pub(crate) capabilities: BTreeMap<String, ObjectId>,
    pub(crate) replay_guard: Option<ReplayGuard>,
    pub metadata: LedgerMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerMetadata {
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub total_objects_ever: u64,
    pub total_records_minted: u64,
    pub total_rejections: u64,
}

impl Ledger {
    pub fn new(label: &str) -> Self {
        Self {
            objects: BTreeMap::new(),
            capabilities: BTreeMap::new(),
            replay_guard: None,
            metadata: LedgerMetadata {
                label: label.to_string(),
                created_at: Utc::now(),
                total_objects_ever: 0,
                total_records_minted: 0,
                total_rejections: 0,
            },
        }
    }

    /// Load a snapshot, or start an empty ledger if none exists yet
    pub fn open(path: impl AsRef<Path>, label: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new(label));
        }
        let data = std::fs::read_to_string(path)?;
        let ledger: Ledger = serde_json::from_str(&data)?;
        info!(
            "Loaded ledger '{}' with {} objects from {}",
            ledger.metadata.label,
            ledger.objects.len(),
            path.display()
        );
        Ok(ledger)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Turn on the consumed-nonce set for every later `submit`
    pub fn enable_replay_guard(&mut self, freshness_window_ms: Option<u64>) {
        self.replay_guard = Some(ReplayGuard::new(freshness_window_ms));
    }

    pub fn get(&self, id: &ObjectId) -> Option<&StoredObject> {
        self.objects.get(id)
    }

    pub fn owner(&self, id: &ObjectId) -> Option<Owner> {
        self.objects.get(id).map(|o| o.owner)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&ObjectId, &StoredObject)> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Ids of every object owned by `addr`
    pub fn owned_by(&self, addr: &Address) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.owner == Owner::Address(*addr))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for obj in self.objects.values() {
            *counts.entry(obj.body.label()).or_default() += 1;
        }
        format!(
            "Ledger '{}' | {} objects | {} records minted | {} rejections | {:?}",
            self.metadata.label,
            self.objects.len(),
            self.metadata.total_records_minted,
            self.metadata.total_rejections,
            counts
        )
    }

    pub(crate) fn insert(&mut self, id: ObjectId, object: StoredObject) {
        self.metadata.total_objects_ever += 1;
        self.objects.insert(id, object);
    }

    /// Fetch an object and check it belongs to `module` under the same
    /// witness type
    pub(crate) fn scoped(&self, id: &ObjectId, module: &str, witness: &str) -> Result<&StoredObject> {
        let obj = self
            .objects
            .get(id)
            .ok_or_else(|| OracleError::ObjectNotFound(id.to_string()))?;
        if obj.module != module || obj.witness != witness {
            return Err(OracleError::ObjectNotFound(format!(
                "{} is scoped to {} ({}), not {} ({})",
                id, obj.module, obj.witness, module, witness
            )));
        }
        Ok(obj)
    }

    pub(crate) fn scoped_mut(
        &mut self,
        id: &ObjectId,
        module: &str,
        witness: &str,
    ) -> Result<&mut StoredObject> {
        self.scoped(id, module, witness)?;
        self.objects
            .get_mut(id)
            .ok_or_else(|| OracleError::ObjectNotFound(id.to_string()))
    }

    /// Count a rejected operation and hand the error back
    pub(crate) fn reject(&mut self, err: OracleError) -> OracleError {
        self.metadata.total_rejections += 1;
        log::warn!("Rejected: {} (abort code {})", err, err.abort_code());
        err
    }
}
