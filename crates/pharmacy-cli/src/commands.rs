//! Command execution.

use std::io::Write;

use anyhow::{Context, Result};
use pharmacy_core::{allocate_fefo, DispenseConfig, Dispenser, InventoryStore, StockStatus};

use crate::config::Command;

/// Output options shared by every command.
#[derive(Debug, Clone)]
pub struct Output {
    pub json: bool,
    pub config: DispenseConfig,
}

fn status_label(status: StockStatus) -> &'static str {
    match status {
        StockStatus::LowStock => "Low Stock",
        StockStatus::Healthy => "Healthy",
    }
}

/// Run one command against the store, writing results to `out`.
pub fn run_command<W: Write>(
    store: &InventoryStore,
    command: &Command,
    output: &Output,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::List => list(store, output, out),
        Command::Show { drug_id } => show(store, drug_id, output, out),
        Command::Plan { drug_id, quantity } => plan(store, drug_id, *quantity, output, out),
        Command::Dispense {
            drug_id,
            quantities,
        } => dispense(store, drug_id, quantities, output, out),
    }
}

fn list<W: Write>(store: &InventoryStore, output: &Output, out: &mut W) -> Result<()> {
    let drugs = store.list()?;
    if output.json {
        serde_json::to_writer_pretty(&mut *out, &drugs)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<6} {:<24} {:<16} {:>7}  {:<10} {:>7}",
        "ID", "NAME", "CATEGORY", "STOCK", "STATUS", "VERSION"
    )?;
    for drug in &drugs {
        writeln!(
            out,
            "{:<6} {:<24} {:<16} {:>7}  {:<10} {:>7}",
            drug.id,
            drug.name,
            drug.category,
            drug.total_stock,
            status_label(drug.stock_status(output.config.low_stock_threshold)),
            drug.version
        )?;
    }
    Ok(())
}

fn show<W: Write>(store: &InventoryStore, drug_id: &str, output: &Output, out: &mut W) -> Result<()> {
    let drug = store.get(drug_id)?;
    if output.json {
        serde_json::to_writer_pretty(&mut *out, &drug)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "{} ({})", drug.name, drug.id)?;
    writeln!(
        out,
        "Stock: {}  Version: {}  Status: {}",
        drug.total_stock,
        drug.version,
        status_label(drug.stock_status(output.config.low_stock_threshold))
    )?;
    writeln!(out, "Batches (sorted by expiry):")?;
    for batch in drug.batches_by_expiry() {
        writeln!(
            out,
            "  {:<8} exp {}  {:>6}  {}",
            batch.batch_id, batch.expiry_date, batch.quantity, batch.location
        )?;
    }
    Ok(())
}

fn plan<W: Write>(
    store: &InventoryStore,
    drug_id: &str,
    quantity: u32,
    output: &Output,
    out: &mut W,
) -> Result<()> {
    let drug = store.get(drug_id)?;
    let allocation = allocate_fefo(&drug, quantity)
        .with_context(|| format!("cannot allocate {} units of {}", quantity, drug.name))?;

    if output.json {
        serde_json::to_writer_pretty(&mut *out, &allocation)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Plan for {} units of {} (not committed):", quantity, drug.name)?;
    for line in &allocation.plan {
        writeln!(out, "  Batch {}: take {} units", line.batch_id, line.quantity)?;
    }
    writeln!(
        out,
        "Stock after: {}  Version after: {}",
        allocation.updated_drug.total_stock, allocation.updated_drug.version
    )?;
    Ok(())
}

fn dispense<W: Write>(
    store: &InventoryStore,
    drug_id: &str,
    quantities: &[u32],
    output: &Output,
    out: &mut W,
) -> Result<()> {
    let dispenser = Dispenser::new(store, output.config.clone());

    for &quantity in quantities {
        let receipt = dispenser
            .dispense(drug_id, quantity)
            .with_context(|| format!("dispense of {} units of {} failed", quantity, drug_id))?;
        serde_json::to_writer(&mut *out, &receipt)?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::load_store;
    use pharmacy_core::DispenseReceipt;

    fn output(json: bool) -> Output {
        Output {
            json,
            config: DispenseConfig::default(),
        }
    }

    fn run(store: &InventoryStore, command: Command, json: bool) -> Result<String> {
        let mut buf = Vec::new();
        run_command(store, &command, &output(json), &mut buf)?;
        Ok(String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_list_flags_low_stock() {
        let store = load_store(None).unwrap();
        let text = run(&store, Command::List, false).unwrap();

        let insulin = text.lines().find(|l| l.starts_with("d3")).unwrap();
        assert!(insulin.contains("Healthy"));

        run(
            &store,
            Command::Dispense {
                drug_id: "d3".into(),
                quantities: vec![1],
            },
            false,
        )
        .unwrap();
        let text = run(&store, Command::List, false).unwrap();
        let insulin = text.lines().find(|l| l.starts_with("d3")).unwrap();
        assert!(insulin.contains("Low Stock"));
    }

    #[test]
    fn test_show_sorts_batches() {
        let store = load_store(None).unwrap();
        let text = run(&store, Command::Show { drug_id: "d3".into() }, false).unwrap();

        let b301 = text.find("B301").unwrap();
        let b302 = text.find("B302").unwrap();
        assert!(b301 < b302);
    }

    #[test]
    fn test_plan_does_not_commit() {
        let store = load_store(None).unwrap();
        let text = run(
            &store,
            Command::Plan {
                drug_id: "d1".into(),
                quantity: 120,
            },
            false,
        )
        .unwrap();

        assert!(text.contains("Batch B101: take 100 units"));
        assert!(text.contains("Batch B102: take 20 units"));
        assert_eq!(store.get("d1").unwrap().version, 1);
    }

    #[test]
    fn test_dispense_sequence_emits_receipts() {
        let store = load_store(None).unwrap();
        let text = run(
            &store,
            Command::Dispense {
                drug_id: "d1".into(),
                quantities: vec![120, 30],
            },
            true,
        )
        .unwrap();

        let receipts: Vec<DispenseReceipt> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(receipts.len(), 2);
        assert_eq!(receipts[0].new_version, 2);
        assert_eq!(receipts[1].new_version, 3);
        assert_eq!(receipts[1].remaining_stock, 350);
        assert_eq!(receipts[1].plan.as_slice()[0].batch_id, "B102");
    }

    #[test]
    fn test_insufficient_stock_message() {
        let store = load_store(None).unwrap();
        let err = run(
            &store,
            Command::Dispense {
                drug_id: "d3".into(),
                quantities: vec![60],
            },
            false,
        )
        .unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("Insufficient stock"));
        assert_eq!(store.get("d3").unwrap().version, 1);
    }
}
