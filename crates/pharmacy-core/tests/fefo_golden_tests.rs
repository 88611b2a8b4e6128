//! Golden scenarios and properties for FEFO allocation.

use chrono::NaiveDate;
use pharmacy_core::allocator::{allocate_fefo, AllocationError};
use pharmacy_core::models::{Drug, DrugBatch};
use proptest::prelude::*;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn make_drug(id: &str, name: &str, batches: &[(&str, &str, u32)]) -> Drug {
    Drug::new(
        id.to_string(),
        name.to_string(),
        "Test".to_string(),
        10.0,
        batches
            .iter()
            .map(|(batch_id, expiry, qty)| {
                DrugBatch::new(batch_id.to_string(), date(expiry), *qty, "Shelf-A1".to_string())
            })
            .collect(),
    )
}

#[test]
fn test_amoxicillin_spans_two_batches() {
    let drug = make_drug(
        "d1",
        "Amoxicillin 500mg",
        &[("B101", "2024-06-01", 100), ("B102", "2024-12-01", 400)],
    );
    assert_eq!(drug.total_stock, 500);

    let result = allocate_fefo(&drug, 120).unwrap();

    let plan: Vec<_> = result
        .plan
        .iter()
        .map(|a| (a.batch_id.as_str(), a.quantity))
        .collect();
    assert_eq!(plan, vec![("B101", 100), ("B102", 20)]);

    let quantities: Vec<_> = result.updated_drug.batches.iter().map(|b| b.quantity).collect();
    assert_eq!(quantities, vec![0, 380]);
    assert_eq!(result.updated_drug.total_stock, 380);
    assert_eq!(result.updated_drug.version, drug.version + 1);
}

#[test]
fn test_insulin_over_request_is_rejected_untouched() {
    let drug = make_drug(
        "d3",
        "Insulin Glargine",
        &[("B301", "2024-05-20", 10), ("B302", "2024-08-15", 40)],
    );
    let before = drug.clone();

    let err = allocate_fefo(&drug, 60).unwrap_err();

    assert_eq!(
        err,
        AllocationError::InsufficientStock {
            requested: 60,
            available: 50
        }
    );
    assert_eq!(drug, before);
}

#[test]
fn test_failed_call_is_repeatable() {
    let drug = make_drug("d3", "Insulin Glargine", &[("B301", "2024-05-20", 10)]);

    let first = allocate_fefo(&drug, 11).unwrap_err();
    let second = allocate_fefo(&drug, 11).unwrap_err();
    let third = allocate_fefo(&drug, 11).unwrap_err();

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(drug.version, 1);
}

#[test]
fn test_chained_allocations_drain_in_expiry_order() {
    let mut drug = make_drug(
        "d2",
        "Atorvastatin 20mg",
        &[("B202", "2025-06-20", 150), ("B201", "2025-01-15", 150)],
    );

    for _ in 0..3 {
        drug = allocate_fefo(&drug, 50).unwrap().updated_drug;
    }
    assert_eq!(drug.batch("B201").unwrap().quantity, 0);
    assert_eq!(drug.batch("B202").unwrap().quantity, 150);
    assert_eq!(drug.version, 4);

    let next = allocate_fefo(&drug, 1).unwrap();
    assert_eq!(next.plan.as_slice()[0].batch_id, "B202");
}

// =========================================================================
// Properties
// =========================================================================

fn arb_drug() -> impl Strategy<Value = Drug> {
    // Few distinct dates so ties are common
    prop::collection::vec((0u32..6, 0u32..200), 1..8).prop_map(|layout| {
        let base = date("2024-01-01");
        let batches = layout
            .into_iter()
            .enumerate()
            .map(|(i, (offset, qty))| {
                DrugBatch::new(
                    format!("B{}", i),
                    base + chrono::Duration::days(i64::from(offset) * 30),
                    qty,
                    "Shelf".to_string(),
                )
            })
            .collect();
        Drug::new("dp".into(), "Prop Drug".into(), "Test".into(), 1.0, batches)
    })
}

fn arb_drug_and_request() -> impl Strategy<Value = (Drug, u32)> {
    arb_drug().prop_flat_map(|drug| {
        let max = drug.total_stock.max(1);
        (Just(drug), 1..=max)
    })
}

proptest! {
    #[test]
    fn prop_conservation((drug, requested) in arb_drug_and_request()) {
        prop_assume!(requested <= drug.total_stock);
        let result = allocate_fefo(&drug, requested).unwrap();

        prop_assert_eq!(result.updated_drug.total_stock, drug.total_stock - requested);
        prop_assert!(result.updated_drug.is_consistent());
        prop_assert_eq!(result.plan.total(), u64::from(requested));
    }

    #[test]
    fn prop_fefo_order((drug, requested) in arb_drug_and_request()) {
        prop_assume!(requested <= drug.total_stock);
        let result = allocate_fefo(&drug, requested).unwrap();

        // Plan expiry dates never go backwards and never include empty draws
        let expiries: Vec<_> = result
            .plan
            .iter()
            .map(|a| drug.batch(&a.batch_id).unwrap().expiry_date)
            .collect();
        prop_assert!(expiries.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(result.plan.iter().all(|a| a.quantity > 0));

        // A later batch is only touched once every earlier one is empty
        let after = &result.updated_drug;
        for drawn in result.plan.iter() {
            let expiry = drug.batch(&drawn.batch_id).unwrap().expiry_date;
            for batch in after.batches.iter().filter(|b| b.expiry_date < expiry) {
                prop_assert_eq!(batch.quantity, 0);
            }
        }
    }

    #[test]
    fn prop_all_or_nothing(drug in arb_drug(), extra in 1u32..100) {
        let requested = drug.total_stock + extra;
        let before = drug.clone();

        let err = allocate_fefo(&drug, requested).unwrap_err();

        let is_insufficient = matches!(err, AllocationError::InsufficientStock { .. });
        prop_assert!(is_insufficient);
        prop_assert_eq!(&drug, &before);
    }

    #[test]
    fn prop_version_bumps_by_one((drug, requested) in arb_drug_and_request()) {
        match allocate_fefo(&drug, requested) {
            Ok(result) => prop_assert_eq!(result.updated_drug.version, drug.version + 1),
            Err(_) => prop_assert_eq!(drug.total_stock, 0),
        }
    }

    #[test]
    fn prop_input_not_mutated((drug, requested) in arb_drug_and_request()) {
        let before = drug.clone();
        let _ = allocate_fefo(&drug, requested);
        prop_assert_eq!(drug, before);
    }

    #[test]
    fn prop_batches_never_removed((drug, requested) in arb_drug_and_request()) {
        prop_assume!(requested <= drug.total_stock);
        let result = allocate_fefo(&drug, requested).unwrap();

        let ids_before: Vec<_> = drug.batches.iter().map(|b| &b.batch_id).collect();
        let ids_after: Vec<_> = result.updated_drug.batches.iter().map(|b| &b.batch_id).collect();
        prop_assert_eq!(ids_before, ids_after);
    }
}
