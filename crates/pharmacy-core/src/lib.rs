//! Pharmacy Core Library
//!
//! FEFO stock allocation with an optimistic-concurrency inventory store.
//!
//! # Architecture
//!
//! ```text
//!            UI / CLI
//!               │
//!               │  get(drug_id)            (read, no lock held afterwards)
//!               ▼
//!     ┌───────────────────┐
//!     │  InventoryStore   │◄──────────────────────────────┐
//!     └─────────┬─────────┘                               │
//!               │  Drug snapshot @ version N              │
//!               ▼                                         │
//!     ┌───────────────────┐                               │
//!     │   allocate_fefo   │  pure: earliest expiry first  │
//!     └─────────┬─────────┘                               │
//!               │  Drug @ N+1 + AllocationPlan            │
//!               ▼                                         │
//!     commit(drug_id, N, snapshot) ── VersionConflict ────┘
//!               │                     (reload and retry)
//!               ▼
//!            stored @ N+1
//! ```
//!
//! # Core Principle
//!
//! **No write is ever silently overwritten.** A commit based on a stale
//! version is rejected; the caller re-reads and recomputes.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Drug, DrugBatch, AllocationPlan, etc.)
//! - [`allocator`]: FEFO allocation algorithm
//! - [`store`]: In-memory inventory store with compare-and-set commits
//! - [`dispense`]: Read/allocate/commit workflow with bounded retries

pub mod allocator;
pub mod dispense;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use allocator::{allocate_fefo, AllocationError};
pub use dispense::{DispenseConfig, DispenseError, DispenseReceipt, Dispenser};
pub use models::{
    Allocation, AllocationPlan, BatchAllocation, Drug, DrugBatch, StockStatus,
    DEFAULT_LOW_STOCK_THRESHOLD,
};
pub use store::{versions_match, DrugRepository, InventoryStore, StoreError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use chrono::NaiveDate;
use std::sync::Arc;

const DATE_FORMAT: &str = "%Y-%m-%d";

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PharmacyError {
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AllocationError> for PharmacyError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::InsufficientStock { .. } => {
                PharmacyError::InsufficientStock(e.to_string())
            }
            AllocationError::InvalidRequest => PharmacyError::InvalidRequest(e.to_string()),
            AllocationError::Inconsistent { .. } => PharmacyError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for PharmacyError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => PharmacyError::NotFound(id),
            StoreError::VersionConflict { .. } => PharmacyError::VersionConflict(e.to_string()),
            StoreError::Duplicate(_) | StoreError::InvalidSnapshot { .. } => {
                PharmacyError::InvalidInput(e.to_string())
            }
            StoreError::LockPoisoned(_) => PharmacyError::Internal(e.to_string()),
        }
    }
}

impl From<DispenseError> for PharmacyError {
    fn from(e: DispenseError) -> Self {
        match e {
            DispenseError::Allocation(e) => e.into(),
            DispenseError::Store(e) => e.into(),
        }
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open an inventory seeded with the given drugs, using default dispense settings.
#[uniffi::export]
pub fn open_inventory(drugs: Vec<FfiDrug>) -> Result<Arc<PharmacyCore>, PharmacyError> {
    open_inventory_with_config(drugs, DispenseConfig::default().max_attempts)
}

/// Open an inventory with a custom retry budget for `dispense`.
#[uniffi::export]
pub fn open_inventory_with_config(
    drugs: Vec<FfiDrug>,
    max_attempts: u32,
) -> Result<Arc<PharmacyCore>, PharmacyError> {
    let drugs = drugs
        .into_iter()
        .map(Drug::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let store = InventoryStore::with_drugs(drugs)?;
    Ok(Arc::new(PharmacyCore {
        store: Arc::new(store),
        config: DispenseConfig {
            max_attempts,
            ..DispenseConfig::default()
        },
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe inventory handle for FFI.
#[derive(uniffi::Object)]
pub struct PharmacyCore {
    store: Arc<InventoryStore>,
    config: DispenseConfig,
}

#[uniffi::export]
impl PharmacyCore {
    /// All drugs, sorted by id.
    pub fn list_drugs(&self) -> Result<Vec<FfiDrug>, PharmacyError> {
        let drugs = self.store.list()?;
        Ok(drugs.into_iter().map(|d| d.into()).collect())
    }

    /// Get a drug snapshot by id.
    pub fn get_drug(&self, drug_id: String) -> Result<FfiDrug, PharmacyError> {
        let drug = self.store.get(&drug_id)?;
        Ok(drug.into())
    }

    /// Compute a FEFO allocation without touching the store.
    pub fn allocate(&self, drug: FfiDrug, quantity: u32) -> Result<FfiAllocation, PharmacyError> {
        let drug = Drug::try_from(drug)?;
        let allocation = allocate_fefo(&drug, quantity)?;
        Ok(allocation.into())
    }

    /// Write back a snapshot computed from `expected_version`.
    pub fn commit(
        &self,
        drug_id: String,
        expected_version: u64,
        snapshot: FfiDrug,
    ) -> Result<(), PharmacyError> {
        let snapshot = Drug::try_from(snapshot)?;
        self.store.commit(&drug_id, expected_version, snapshot)?;
        Ok(())
    }

    /// Allocate and commit in one step, retrying on version conflicts.
    pub fn dispense(
        &self,
        drug_id: String,
        quantity: u32,
    ) -> Result<FfiDispenseReceipt, PharmacyError> {
        let dispenser = Dispenser::new(&*self.store, self.config.clone());
        let receipt = dispenser.dispense(&drug_id, quantity)?;
        Ok(receipt.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe batch. Expiry crosses the boundary as `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBatch {
    pub batch_id: String,
    pub expiry_date: String,
    pub quantity: u32,
    pub location: String,
}

impl From<DrugBatch> for FfiBatch {
    fn from(batch: DrugBatch) -> Self {
        Self {
            batch_id: batch.batch_id,
            expiry_date: batch.expiry_date.format(DATE_FORMAT).to_string(),
            quantity: batch.quantity,
            location: batch.location,
        }
    }
}

impl TryFrom<FfiBatch> for DrugBatch {
    type Error = PharmacyError;

    fn try_from(batch: FfiBatch) -> Result<Self, Self::Error> {
        let expiry_date = NaiveDate::parse_from_str(&batch.expiry_date, DATE_FORMAT)
            .map_err(|e| {
                PharmacyError::InvalidInput(format!(
                    "batch {} expiry '{}': {}",
                    batch.batch_id, batch.expiry_date, e
                ))
            })?;
        Ok(DrugBatch {
            batch_id: batch.batch_id,
            expiry_date,
            quantity: batch.quantity,
            location: batch.location,
        })
    }
}

/// FFI-safe drug.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrug {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub total_stock: u32,
    pub batches: Vec<FfiBatch>,
    pub version: u64,
}

impl From<Drug> for FfiDrug {
    fn from(drug: Drug) -> Self {
        Self {
            id: drug.id,
            name: drug.name,
            category: drug.category,
            price: drug.price,
            total_stock: drug.total_stock,
            batches: drug.batches.into_iter().map(|b| b.into()).collect(),
            version: drug.version,
        }
    }
}

impl TryFrom<FfiDrug> for Drug {
    type Error = PharmacyError;

    fn try_from(drug: FfiDrug) -> Result<Self, Self::Error> {
        let batches = drug
            .batches
            .into_iter()
            .map(DrugBatch::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Drug {
            id: drug.id,
            name: drug.name,
            category: drug.category,
            price: drug.price,
            total_stock: drug.total_stock,
            batches,
            version: drug.version,
        })
    }
}

/// FFI-safe plan line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBatchAllocation {
    pub batch_id: String,
    pub quantity: u32,
}

impl From<BatchAllocation> for FfiBatchAllocation {
    fn from(allocation: BatchAllocation) -> Self {
        Self {
            batch_id: allocation.batch_id,
            quantity: allocation.quantity,
        }
    }
}

/// FFI-safe allocation result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAllocation {
    pub updated_drug: FfiDrug,
    pub plan: Vec<FfiBatchAllocation>,
}

impl From<Allocation> for FfiAllocation {
    fn from(allocation: Allocation) -> Self {
        Self {
            updated_drug: allocation.updated_drug.into(),
            plan: allocation.plan.into_iter().map(|a| a.into()).collect(),
        }
    }
}

/// FFI-safe dispense receipt.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDispenseReceipt {
    pub dispense_id: String,
    pub drug_id: String,
    pub drug_name: String,
    pub plan: Vec<FfiBatchAllocation>,
    pub new_version: u64,
    pub remaining_stock: u32,
    pub low_stock: bool,
    pub attempts: u32,
    pub dispensed_at: String,
}

impl From<DispenseReceipt> for FfiDispenseReceipt {
    fn from(receipt: DispenseReceipt) -> Self {
        Self {
            dispense_id: receipt.dispense_id,
            drug_id: receipt.drug_id,
            drug_name: receipt.drug_name,
            plan: receipt.plan.into_iter().map(|a| a.into()).collect(),
            new_version: receipt.new_version,
            remaining_stock: receipt.remaining_stock,
            low_stock: receipt.stock_status == StockStatus::LowStock,
            attempts: receipt.attempts,
            dispensed_at: receipt.dispensed_at,
        }
    }
}
