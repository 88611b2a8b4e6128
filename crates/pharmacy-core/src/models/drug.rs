//! Drug and batch models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stock level below which a drug is flagged as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 50;

/// Version assigned to a freshly created drug record.
pub const INITIAL_VERSION: u64 = 1;

/// A physically distinct lot of a drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrugBatch {
    /// Lot identifier, unique within the parent drug
    pub batch_id: String,
    /// Expiry date of every unit in this lot
    pub expiry_date: NaiveDate,
    /// Units currently on hand (a depleted lot stays at zero)
    pub quantity: u32,
    /// Storage location tag (e.g., "Shelf-A1", "Fridge-1")
    pub location: String,
}

impl DrugBatch {
    /// Create a new batch.
    pub fn new(batch_id: String, expiry_date: NaiveDate, quantity: u32, location: String) -> Self {
        Self {
            batch_id,
            expiry_date,
            quantity,
            location,
        }
    }

    /// Check if this batch has any units left.
    pub fn is_depleted(&self) -> bool {
        self.quantity == 0
    }
}

/// Stock health shown next to each drug in the inventory table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockStatus {
    /// Total stock under the low-stock threshold
    LowStock,
    /// Total stock at or above the threshold
    Healthy,
}

/// A drug record owning its expiry-dated batches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Drug {
    /// Unique drug identifier
    pub id: String,
    /// Display name (e.g., "Amoxicillin 500mg")
    pub name: String,
    /// Therapeutic category
    pub category: String,
    /// Unit price
    pub price: f64,
    /// Sum of all batch quantities
    pub total_stock: u32,
    /// Batches in collection order (not sorted)
    pub batches: Vec<DrugBatch>,
    /// Optimistic concurrency token, bumped once per allocation
    pub version: u64,
}

impl Drug {
    /// Create a new drug record at the initial version.
    ///
    /// `total_stock` is derived from the batches.
    pub fn new(
        id: String,
        name: String,
        category: String,
        price: f64,
        batches: Vec<DrugBatch>,
    ) -> Self {
        let sum: u64 = batches.iter().map(|b| u64::from(b.quantity)).sum();
        Self {
            id,
            name,
            category,
            price,
            total_stock: u32::try_from(sum).unwrap_or(u32::MAX),
            batches,
            version: INITIAL_VERSION,
        }
    }

    /// Sum of all batch quantities.
    pub fn batch_sum(&self) -> u64 {
        self.batches.iter().map(|b| u64::from(b.quantity)).sum()
    }

    /// Check that `total_stock` agrees with the batch quantities.
    pub fn is_consistent(&self) -> bool {
        self.batch_sum() == u64::from(self.total_stock)
    }

    /// Batches ordered by expiry, earliest first. Equal expiry dates keep
    /// their collection order.
    pub fn batches_by_expiry(&self) -> Vec<&DrugBatch> {
        let mut sorted: Vec<&DrugBatch> = self.batches.iter().collect();
        sorted.sort_by_key(|b| b.expiry_date);
        sorted
    }

    /// Non-empty batches that expire strictly before `date`.
    pub fn expiring_before(&self, date: NaiveDate) -> Vec<&DrugBatch> {
        self.batches_by_expiry()
            .into_iter()
            .filter(|b| !b.is_depleted() && b.expiry_date < date)
            .collect()
    }

    /// Classify stock health against a threshold.
    pub fn stock_status(&self, threshold: u32) -> StockStatus {
        if self.total_stock < threshold {
            StockStatus::LowStock
        } else {
            StockStatus::Healthy
        }
    }

    /// Find a batch by its lot identifier.
    pub fn batch(&self, batch_id: &str) -> Option<&DrugBatch> {
        self.batches.iter().find(|b| b.batch_id == batch_id)
    }
}
