//! Command-line arguments and environment configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pharmacy_core::{DispenseConfig, DEFAULT_LOW_STOCK_THRESHOLD};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured logging
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "pharmacy", about = "FEFO pharmacy stock allocation", version)]
pub struct CliArgs {
    #[arg(
        long,
        env = "PHARMACY_INVENTORY",
        value_name = "FILE",
        help = "Inventory JSON file (defaults to the bundled sample formulary)",
        global = true
    )]
    pub inventory: Option<PathBuf>,

    #[arg(
        long,
        env = "PHARMACY_MAX_ATTEMPTS",
        value_name = "N",
        default_value_t = 3,
        help = "Dispense attempts before a version conflict is reported",
        global = true
    )]
    pub max_attempts: u32,

    #[arg(
        long,
        env = "PHARMACY_LOW_STOCK_THRESHOLD",
        value_name = "UNITS",
        default_value_t = DEFAULT_LOW_STOCK_THRESHOLD,
        help = "Stock level below which a drug is flagged as low",
        global = true
    )]
    pub low_stock_threshold: u32,

    #[arg(
        long,
        env = "PHARMACY_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty,
        help = "Log format written to stderr",
        global = true
    )]
    pub log_format: LogFormat,

    #[arg(long, help = "Print results as JSON", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Inventory table with stock status
    List,

    /// Batches of one drug, earliest expiry first
    Show { drug_id: String },

    /// Dry-run a FEFO allocation without committing it
    Plan { drug_id: String, quantity: u32 },

    /// Allocate and commit one or more dispenses in sequence
    Dispense {
        drug_id: String,
        #[arg(required = true, num_args = 1..)]
        quantities: Vec<u32>,
    },
}

impl CliArgs {
    /// Dispense settings derived from the arguments.
    pub fn dispense_config(&self) -> DispenseConfig {
        DispenseConfig {
            max_attempts: self.max_attempts,
            low_stock_threshold: self.low_stock_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["pharmacy", "list"]).unwrap();
        assert_eq!(args.command, Command::List);
        assert_eq!(args.dispense_config(), DispenseConfig::default());
        assert_eq!(args.log_format, LogFormat::Pretty);
        assert!(!args.json);
    }

    #[test]
    fn test_dispense_multiple_quantities() {
        let args = CliArgs::try_parse_from([
            "pharmacy",
            "dispense",
            "d1",
            "120",
            "30",
            "--max-attempts",
            "5",
        ])
        .unwrap();

        assert_eq!(
            args.command,
            Command::Dispense {
                drug_id: "d1".into(),
                quantities: vec![120, 30],
            }
        );
        assert_eq!(args.dispense_config().max_attempts, 5);
    }

    #[test]
    fn test_dispense_requires_quantity() {
        assert!(CliArgs::try_parse_from(["pharmacy", "dispense", "d1"]).is_err());
    }

    #[test]
    fn test_negative_quantity_rejected_by_parser() {
        assert!(CliArgs::try_parse_from(["pharmacy", "plan", "d1", "-5"]).is_err());
    }
}
