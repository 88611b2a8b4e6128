//! First-Expired-First-Out allocation.

use crate::models::{Allocation, AllocationPlan, Drug};

use super::{AllocationError, AllocationResult};

/// Allocate `requested` units from `drug` under FEFO.
///
/// Batches are drained earliest expiry first; batches sharing an expiry date
/// are drained in collection order. The returned snapshot keeps the batch
/// collection order, carries `total_stock - requested`, and is one version
/// ahead. On any error nothing is produced: allocation is all-or-nothing.
pub fn allocate_fefo(drug: &Drug, requested: u32) -> AllocationResult<Allocation> {
    if requested == 0 {
        return Err(AllocationError::InvalidRequest);
    }

    let actual = drug.batch_sum();
    if actual != u64::from(drug.total_stock) {
        return Err(AllocationError::Inconsistent {
            drug_id: drug.id.clone(),
            recorded: drug.total_stock,
            actual,
        });
    }

    if requested > drug.total_stock {
        return Err(AllocationError::InsufficientStock {
            requested,
            available: drug.total_stock,
        });
    }

    let mut updated = drug.clone();

    // Stable sort keeps collection order among equal expiry dates
    let mut order: Vec<usize> = (0..updated.batches.len()).collect();
    order.sort_by_key(|&i| updated.batches[i].expiry_date);

    let mut remaining = requested;
    let mut plan = AllocationPlan::new();

    for i in order {
        if remaining == 0 {
            break;
        }
        let batch = &mut updated.batches[i];
        if batch.quantity == 0 {
            continue;
        }
        let take = batch.quantity.min(remaining);
        batch.quantity -= take;
        remaining -= take;
        plan.push(batch.batch_id.clone(), take);
    }

    debug_assert_eq!(remaining, 0, "consistent stock always covers the request");

    updated.total_stock -= requested;
    updated.version += 1;

    Ok(Allocation {
        updated_drug: updated,
        plan,
    })
}
