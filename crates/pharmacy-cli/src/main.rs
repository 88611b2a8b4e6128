//! `pharmacy` command-line front-end.

mod commands;
mod config;
mod inventory;
mod logging;

use std::io;

use anyhow::Result;
use clap::Parser;

use commands::{run_command, Output};
use config::CliArgs;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    logging::init_logging(args.log_format)?;

    let store = inventory::load_store(args.inventory.as_deref())?;
    let output = Output {
        json: args.json,
        config: args.dispense_config(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command(&store, &args.command, &output, &mut out)
}
