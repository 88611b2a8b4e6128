//! Dispense workflow: read, allocate, commit, retry on conflict.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::allocator::{allocate_fefo, AllocationError};
use crate::models::{Allocation, AllocationPlan, StockStatus, DEFAULT_LOW_STOCK_THRESHOLD};
use crate::store::{DrugRepository, InventoryStore, StoreError};

/// Dispense errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispenseError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispenseError {
    /// Whether the caller may succeed by reloading and trying again.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DispenseError::Store(StoreError::VersionConflict { .. }))
    }
}

pub type DispenseResult<T> = Result<T, DispenseError>;

/// Dispense tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispenseConfig {
    /// Total tries (first attempt included) before a conflict is reported
    pub max_attempts: u32,
    /// Stock level below which the receipt reports `LowStock`
    pub low_stock_threshold: u32,
}

impl Default for DispenseConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

/// Record of a committed dispense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DispenseReceipt {
    /// Unique receipt ID
    pub dispense_id: String,
    pub drug_id: String,
    pub drug_name: String,
    /// Batches drawn, in FEFO order
    pub plan: AllocationPlan,
    /// Version the record was committed at
    pub new_version: u64,
    /// Stock left after this dispense
    pub remaining_stock: u32,
    pub stock_status: StockStatus,
    /// Tries needed, including the successful one
    pub attempts: u32,
    /// Commit timestamp (RFC 3339)
    pub dispensed_at: String,
}

/// Runs allocations against a repository with optimistic retries.
pub struct Dispenser<'a, R: DrugRepository + ?Sized = InventoryStore> {
    repo: &'a R,
    config: DispenseConfig,
}

impl<'a, R: DrugRepository + ?Sized> Dispenser<'a, R> {
    /// Create a new dispenser.
    pub fn new(repo: &'a R, config: DispenseConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &DispenseConfig {
        &self.config
    }

    /// Dispense `quantity` units of a drug.
    ///
    /// Each attempt reads a fresh snapshot. Allocation failures return
    /// immediately; version conflicts are retried until `max_attempts`
    /// tries have been made, after which the last conflict is returned.
    pub fn dispense(&self, drug_id: &str, quantity: u32) -> DispenseResult<DispenseReceipt> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let drug = self.repo.get(drug_id)?;
            let Allocation { updated_drug, plan } = allocate_fefo(&drug, quantity)?;

            let drug_name = updated_drug.name.clone();
            let new_version = updated_drug.version;
            let remaining_stock = updated_drug.total_stock;
            let stock_status = updated_drug.stock_status(self.config.low_stock_threshold);

            match self.repo.commit(drug_id, drug.version, updated_drug) {
                Ok(()) => {
                    info!(
                        drug_id,
                        quantity,
                        new_version,
                        remaining_stock,
                        attempts = attempt,
                        batches = plan.len(),
                        "dispense committed"
                    );
                    return Ok(DispenseReceipt {
                        dispense_id: uuid::Uuid::new_v4().to_string(),
                        drug_id: drug_id.to_string(),
                        drug_name,
                        plan,
                        new_version,
                        remaining_stock,
                        stock_status,
                        attempts: attempt,
                        dispensed_at: chrono::Utc::now().to_rfc3339(),
                    });
                }
                Err(StoreError::VersionConflict { .. }) if attempt < max_attempts => {
                    warn!(drug_id, attempt, max_attempts, "version conflict, retrying dispense");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
