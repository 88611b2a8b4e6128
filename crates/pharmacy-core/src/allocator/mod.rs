//! Stock allocation across expiry-dated batches.
//!
//! Allocation is a pure computation: it reads a [`Drug`](crate::models::Drug)
//! snapshot and returns a new one. Writing the result back is the store's job.

mod fefo;

pub use fefo::*;

use thiserror::Error;

/// Allocation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("Insufficient stock: requested {requested}, only {available} available")]
    InsufficientStock { requested: u32, available: u32 },

    #[error("Invalid request: quantity must be at least 1")]
    InvalidRequest,

    /// Batch quantities disagree with the recorded total. This is corrupted
    /// data, not a business condition.
    #[error("Inventory invariant violated for {drug_id}: total_stock {recorded} but batches sum to {actual}")]
    Inconsistent {
        drug_id: String,
        recorded: u32,
        actual: u64,
    },
}

impl AllocationError {
    /// Whether this error reflects corrupted inventory data rather than
    /// an ordinary rejection.
    pub fn is_defect(&self) -> bool {
        matches!(self, AllocationError::Inconsistent { .. })
    }
}

pub type AllocationResult<T> = Result<T, AllocationError>;
