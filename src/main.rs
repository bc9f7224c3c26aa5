//! Transfer Ledger CLI
//!
//! Runs a CSV command script against a fresh ledger and prints the final
//! accounts followed by the transfer history.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- script.csv > ledger.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `LEDGER_OPENING_BALANCE`: Balance given to each newly registered account (default 0)

use std::env;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process;
use transfer_ledger::{LedgerConfig, LedgerError, Result, TransferEngine};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(LedgerError::MissingArgument);
    }

    let config = LedgerConfig::from_env()?;

    let input_path = &args[1];
    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let engine = TransferEngine::with_config(config);
    engine.process_csv(reader)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    engine.write_accounts(&mut handle)?;
    writeln!(handle)?;
    engine.write_transfers(&mut handle)?;

    Ok(())
}
