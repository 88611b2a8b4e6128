//! Allocation plan models.

use serde::{Deserialize, Serialize};

use super::drug::Drug;

/// Units drawn from one batch during an allocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchAllocation {
    /// Lot the units were taken from
    pub batch_id: String,
    /// Units taken (always > 0)
    pub quantity: u32,
}

/// Itemized record of how one request was fulfilled, in draw order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AllocationPlan {
    allocations: Vec<BatchAllocation>,
}

impl AllocationPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a draw.
    pub(crate) fn push(&mut self, batch_id: String, quantity: u32) {
        self.allocations.push(BatchAllocation { batch_id, quantity });
    }

    /// Total units across all draws.
    pub fn total(&self) -> u64 {
        self.allocations.iter().map(|a| u64::from(a.quantity)).sum()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchAllocation> {
        self.allocations.iter()
    }

    pub fn as_slice(&self) -> &[BatchAllocation] {
        &self.allocations
    }
}

impl<'a> IntoIterator for &'a AllocationPlan {
    type Item = &'a BatchAllocation;
    type IntoIter = std::slice::Iter<'a, BatchAllocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.allocations.iter()
    }
}

impl IntoIterator for AllocationPlan {
    type Item = BatchAllocation;
    type IntoIter = std::vec::IntoIter<BatchAllocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.allocations.into_iter()
    }
}

/// Successful allocator output: the next snapshot plus the plan that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// Drug snapshot after the draw, at `version + 1`
    pub updated_drug: Drug,
    /// Per-batch breakdown
    pub plan: AllocationPlan,
}
