//! In-memory inventory store with optimistic concurrency control.
//!
//! Reads never block each other. Writes go through [`InventoryStore::commit`],
//! a compare-and-set on the record's version: a commit computed from a stale
//! snapshot is rejected with [`StoreError::VersionConflict`] instead of
//! overwriting someone else's allocation.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Drug;

/// Store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Drug not found: {0}")]
    NotFound(String),

    #[error("Drug already exists: {0}")]
    Duplicate(String),

    #[error("Record {drug_id} was changed by someone else (expected version {expected}, found {actual}); reload and retry")]
    VersionConflict {
        drug_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid snapshot for {drug_id}: {reason}")]
    InvalidSnapshot { drug_id: String, reason: String },

    #[error("Inventory lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(e: PoisonError<T>) -> Self {
        StoreError::LockPoisoned(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Check whether the version a write was based on is still current.
pub fn versions_match(current: u64, incoming: u64) -> bool {
    current == incoming
}

/// Read and compare-and-set access to drug records.
pub trait DrugRepository: Send + Sync {
    /// Snapshot of the current record.
    fn get(&self, drug_id: &str) -> StoreResult<Drug>;

    /// Replace the record if its version still equals `expected_version`.
    fn commit(&self, drug_id: &str, expected_version: u64, snapshot: Drug) -> StoreResult<()>;
}

/// Authoritative drug records.
///
/// Share across threads with `Arc<InventoryStore>`.
#[derive(Debug, Default)]
pub struct InventoryStore {
    drugs: RwLock<HashMap<String, Drug>>,
}

impl InventoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with initial drug records.
    pub fn with_drugs<I>(drugs: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = Drug>,
    {
        let store = Self::new();
        for drug in drugs {
            store.insert(drug)?;
        }
        Ok(store)
    }

    /// Register a new drug record.
    pub fn insert(&self, drug: Drug) -> StoreResult<()> {
        if !drug.is_consistent() {
            return Err(StoreError::InvalidSnapshot {
                drug_id: drug.id.clone(),
                reason: format!(
                    "total_stock {} does not match batch sum {}",
                    drug.total_stock,
                    drug.batch_sum()
                ),
            });
        }

        let mut drugs = self.drugs.write()?;
        if drugs.contains_key(&drug.id) {
            return Err(StoreError::Duplicate(drug.id));
        }
        debug!(drug_id = %drug.id, version = drug.version, "drug registered");
        drugs.insert(drug.id.clone(), drug);
        Ok(())
    }

    /// Get a snapshot of a drug record.
    pub fn get(&self, drug_id: &str) -> StoreResult<Drug> {
        let drugs = self.drugs.read()?;
        drugs
            .get(drug_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(drug_id.to_string()))
    }

    /// Current version of a drug record.
    pub fn version(&self, drug_id: &str) -> StoreResult<u64> {
        let drugs = self.drugs.read()?;
        drugs
            .get(drug_id)
            .map(|d| d.version)
            .ok_or_else(|| StoreError::NotFound(drug_id.to_string()))
    }

    /// Snapshots of every record, sorted by id.
    pub fn list(&self) -> StoreResult<Vec<Drug>> {
        let drugs = self.drugs.read()?;
        let mut all: Vec<Drug> = drugs.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.drugs.read()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.drugs.read()?.is_empty())
    }

    /// Replace a record if its version still equals `expected_version`.
    ///
    /// The snapshot must belong to `drug_id`, be internally consistent, and
    /// carry version `expected_version + 1`. The check and the write happen
    /// under one write lock, so two commits against the same expected version
    /// can never both succeed.
    pub fn commit(&self, drug_id: &str, expected_version: u64, snapshot: Drug) -> StoreResult<()> {
        validate_snapshot(drug_id, expected_version, &snapshot)?;

        let mut drugs = self.drugs.write()?;
        let current = drugs
            .get_mut(drug_id)
            .ok_or_else(|| StoreError::NotFound(drug_id.to_string()))?;

        if !versions_match(current.version, expected_version) {
            warn!(
                drug_id,
                expected_version,
                actual_version = current.version,
                "commit rejected: version conflict"
            );
            return Err(StoreError::VersionConflict {
                drug_id: drug_id.to_string(),
                expected: expected_version,
                actual: current.version,
            });
        }

        *current = snapshot;
        debug!(
            drug_id,
            version = current.version,
            total_stock = current.total_stock,
            "commit accepted"
        );
        Ok(())
    }
}

impl DrugRepository for InventoryStore {
    fn get(&self, drug_id: &str) -> StoreResult<Drug> {
        InventoryStore::get(self, drug_id)
    }

    fn commit(&self, drug_id: &str, expected_version: u64, snapshot: Drug) -> StoreResult<()> {
        InventoryStore::commit(self, drug_id, expected_version, snapshot)
    }
}

fn validate_snapshot(drug_id: &str, expected_version: u64, snapshot: &Drug) -> StoreResult<()> {
    let invalid = |reason: String| StoreError::InvalidSnapshot {
        drug_id: drug_id.to_string(),
        reason,
    };

    if snapshot.id != drug_id {
        return Err(invalid(format!("snapshot belongs to {}", snapshot.id)));
    }
    if expected_version.checked_add(1) != Some(snapshot.version) {
        return Err(invalid(format!(
            "snapshot version {} does not follow {}",
            snapshot.version, expected_version
        )));
    }
    if !snapshot.is_consistent() {
        return Err(invalid(format!(
            "total_stock {} does not match batch sum {}",
            snapshot.total_stock,
            snapshot.batch_sum()
        )));
    }
    Ok(())
}
