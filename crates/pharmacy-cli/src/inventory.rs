//! Inventory loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pharmacy_core::{Drug, InventoryStore};
use tracing::info;

const SAMPLE_INVENTORY: &str = include_str!("../data/inventory.json");

/// Parse drug records from inventory JSON.
pub fn parse_inventory(json: &str) -> Result<Vec<Drug>> {
    serde_json::from_str(json).context("failed to parse inventory JSON")
}

/// Build a store from a file, or from the bundled sample when `path` is `None`.
pub fn load_store(path: Option<&Path>) -> Result<InventoryStore> {
    let drugs = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read inventory file {:?}", path))?;
            parse_inventory(&contents)
                .with_context(|| format!("invalid inventory file {:?}", path))?
        }
        None => parse_inventory(SAMPLE_INVENTORY)?,
    };

    let count = drugs.len();
    let store = InventoryStore::with_drugs(drugs).context("failed to load inventory")?;
    info!(drugs = count, source = ?path, "inventory loaded");
    Ok(store)
}
