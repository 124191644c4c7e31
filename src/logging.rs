//! env_logger setup for the stashflow binary

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Verbosity selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        }
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Warn,
            Verbosity::Verbose => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }

    /// Debug runs also echo every SQL statement.
    pub fn traces_sql(self) -> bool {
        self == Verbosity::Debug
    }
}

/// Initialize logging to stderr. `RUST_LOG`, when set, wins over the
/// command-line verbosity.
pub fn init(verbosity: Verbosity) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));

    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_module("stashflow", verbosity.level_filter());
        if verbosity.traces_sql() {
            builder.filter_module("stashflow::sql", LevelFilter::Trace);
        }
    }

    // try_init: tests and embedders may have installed a logger already
    let _ = builder.target(Target::Stderr).try_init();
}
