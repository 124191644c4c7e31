//! Command-line and environment configuration

use crate::error::{Result, ValuationError};
use crate::logging::Verbosity;
use crate::valuation::batch::{PassOptions, BLOCK_SIZE};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_DATABASE: &str = "stashflow.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Value priced listings and refresh currency pair statistics
    Currency,
    /// Load a stash-tab JSON dump into the listing tables
    Import,
}

#[derive(Debug, Parser)]
#[command(name = "stashflow", version, about = "Currency valuation for public stash listings")]
pub struct Cli {
    /// What to run
    #[arg(value_enum)]
    pub mode: Mode,

    /// Database path or sqlite:// DSN
    #[arg(
        short = 'd',
        long = "database",
        visible_alias = "database-dsn",
        env = "STASHFLOW_DB",
        default_value = DEFAULT_DATABASE
    )]
    pub database: String,

    /// Log progress at info level
    #[arg(short, long)]
    pub verbose: bool,

    /// Log at debug level and trace SQL statements
    #[arg(long)]
    pub debug: bool,

    /// Keep polling for new listings after the backlog is drained
    #[arg(long)]
    pub continuous: bool,

    /// Epoch seconds to start from instead of the stored checkpoint
    #[arg(long, value_name = "EPOCH_SECS")]
    pub start_time: Option<i64>,

    /// Stop after this many committed blocks
    #[arg(long, value_name = "N")]
    pub max_blocks: Option<usize>,

    /// Drop prices beyond two standard deviations from wide distributions
    #[arg(long)]
    pub reject_outliers: bool,

    /// Accept full currency names seen in the summary table as note tokens
    #[arg(long)]
    pub learn_currency_names: bool,

    /// Stash JSON file for import mode
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ValuationConfig {
    pub mode: Mode,
    pub database: String,
    pub verbosity: Verbosity,
    pub continuous: bool,
    pub input: Option<PathBuf>,
    pub pass: PassOptions,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Currency,
            database: DEFAULT_DATABASE.to_string(),
            verbosity: Verbosity::Quiet,
            continuous: false,
            input: None,
            pass: PassOptions::default(),
        }
    }
}

impl ValuationConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if cli.max_blocks == Some(0) {
            return Err(ValuationError::Config(
                "--max-blocks must be at least 1".to_string(),
            ));
        }

        if cli.mode == Mode::Import && cli.input.is_none() {
            return Err(ValuationError::Config(
                "import mode requires --input <FILE>".to_string(),
            ));
        }

        Ok(Self {
            mode: cli.mode,
            database: cli.database,
            verbosity: Verbosity::from_flags(cli.verbose, cli.debug),
            continuous: cli.continuous,
            input: cli.input,
            pass: PassOptions {
                block_size: BLOCK_SIZE,
                start_time: cli.start_time,
                max_blocks: cli.max_blocks,
                reject_outliers: cli.reject_outliers,
                learn_currency_names: cli.learn_currency_names,
            },
        })
    }
}
