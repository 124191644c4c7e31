//! stashflow binary - listing import and currency valuation passes
//!
//! ## Usage
//!
//! ```bash
//! stashflow import --input stashes.json -d data/stashflow.db
//! stashflow currency -d data/stashflow.db -v
//! stashflow currency --continuous --reject-outliers
//! ```
//!
//! ## Environment Variables
//!
//! - STASHFLOW_DB - Database path or sqlite:// DSN (default: stashflow.db)
//! - RUST_LOG - Overrides the -v/--debug log level

use clap::Parser;
use stashflow::config::{Cli, Mode, ValuationConfig};
use stashflow::logging;
use stashflow::sqlite_pragma::open_database;
use stashflow::store::{listings, load_stash_file};
use stashflow::valuation::BatchProcessor;
use stashflow::ValuationError;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = ValuationConfig::from_cli(cli)?;
    logging::init(config.verbosity);

    log::info!("🚀 stashflow starting ({:?} mode)", config.mode);

    let mut conn = open_database(&config.database, config.verbosity.traces_sql())?;

    match config.mode {
        Mode::Import => {
            let input = config
                .input
                .as_ref()
                .ok_or_else(|| ValuationError::Config("import mode requires --input".into()))?;
            let stashes = load_stash_file(input)?;
            listings::import_stashes(&mut conn, &stashes)?;
        }
        Mode::Currency => {
            let mut processor = BatchProcessor::new(&mut conn, config.pass.clone());
            if config.continuous {
                log::info!("🔄 Continuous mode, polling for new listings");
                processor.run_continuous()?;
            } else {
                let summary = processor.run_pass()?;
                println!(
                    "Processed {} listings, recorded {} sales in {} blocks",
                    summary.rows_seen, summary.sales_recorded, summary.blocks_committed
                );
            }
        }
    }

    Ok(())
}
