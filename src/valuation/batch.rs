//! Block-wise valuation pass over the listing tables
//!
//! A pass starts from the checkpoint (latest recorded sale, or an
//! explicit start time) and walks listings in fixed-size blocks. Each
//! block is processed inside one transaction: a failure anywhere in the
//! block rolls all of it back, so a crashed pass resumes from the last
//! committed block. The checkpoint comparison is inclusive; rows at the
//! checkpoint are fetched again and skipped by the re-observation gate.

use super::aggregator::WeightedAggregator;
use super::note_parser::NoteParser;
use super::resolver::ValueResolver;
use super::sale_recorder::{ListingOutcome, SaleRecorder};
use crate::error::Result;
use crate::store::{SchemaStatus, SqliteStore, ValuationStore};
use crate::types::PassSummary;
use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use std::thread;
use std::time::Duration;

/// Listings fetched and committed per transaction
pub const BLOCK_SIZE: usize = 1000;

/// Rows between progress log lines
const PROGRESS_INTERVAL: usize = 1000;

/// Idle wait between continuous passes that found nothing new
const IDLE_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct PassOptions {
    pub block_size: usize,
    /// Overrides the stored checkpoint (epoch seconds)
    pub start_time: Option<i64>,
    /// Stop after this many committed blocks
    pub max_blocks: Option<usize>,
    pub reject_outliers: bool,
    pub learn_currency_names: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            start_time: None,
            max_blocks: None,
            reject_outliers: false,
            learn_currency_names: false,
        }
    }
}

pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

fn describe_checkpoint(checkpoint: Option<i64>) -> String {
    match checkpoint.and_then(|ts| Utc.timestamp_opt(ts, 0).single()) {
        Some(at) => format!("{} ({})", at.to_rfc3339(), checkpoint.unwrap_or_default()),
        None => "the beginning".to_string(),
    }
}

pub struct BatchProcessor<'c> {
    conn: &'c mut Connection,
    parser: NoteParser,
    aggregator: WeightedAggregator,
    resolver: ValueResolver,
    options: PassOptions,
    schema_ready: bool,
}

impl<'c> BatchProcessor<'c> {
    pub fn new(conn: &'c mut Connection, options: PassOptions) -> Self {
        Self {
            conn,
            parser: NoteParser::default(),
            aggregator: WeightedAggregator::new(options.reject_outliers),
            resolver: ValueResolver::default(),
            options,
            schema_ready: false,
        }
    }

    pub fn options(&self) -> &PassOptions {
        &self.options
    }

    /// Create the valuation tables once per processor
    pub fn prepare_schema(&mut self) -> Result<()> {
        if self.schema_ready {
            return Ok(());
        }

        for (table, status) in SqliteStore::new(self.conn).ensure_schema()? {
            match status {
                SchemaStatus::Created => log::info!("🔧 {} table created", table.label()),
                SchemaStatus::AlreadyPresent => {
                    log::info!("✅ {} table already present", table.label())
                }
            }
        }
        self.schema_ready = true;
        Ok(())
    }

    fn refresh_currency_names(&mut self) -> Result<()> {
        let names = SqliteStore::new(self.conn).known_currency_names()?;
        let added = self.parser.catalog_mut().learn_names(names);
        if added > 0 {
            log::info!("📊 Learned {} currency name aliases", added);
        }
        Ok(())
    }

    /// Run one pass from the checkpoint to the end of the listing table
    /// (or until `max_blocks` blocks have been committed)
    pub fn run_pass(&mut self) -> Result<PassSummary> {
        self.prepare_schema()?;

        if self.options.learn_currency_names {
            self.refresh_currency_names()?;
        }

        let checkpoint = match self.options.start_time {
            Some(start) => Some(start),
            None => SqliteStore::new(self.conn).last_checkpoint()?,
        };
        log::info!("🚀 Valuation pass starting from {}", describe_checkpoint(checkpoint));

        let block_size = self.options.block_size.max(1);
        let recorder = SaleRecorder::new(&self.parser, &self.aggregator, &self.resolver);
        let mut summary = PassSummary {
            checkpoint,
            ..PassSummary::default()
        };
        let mut offset = 0;

        loop {
            if let Some(max_blocks) = self.options.max_blocks {
                if summary.blocks_committed >= max_blocks {
                    log::info!("Stopping after {} blocks", summary.blocks_committed);
                    break;
                }
            }

            let tx = self.conn.transaction()?;
            let (rows, recorded) = {
                let store = SqliteStore::new(&tx);
                let block = store.fetch_listing_block(checkpoint, block_size, offset)?;
                let mut recorded = 0;

                for (index, row) in block.iter().enumerate() {
                    let outcome = recorder.process_listing(&store, row, current_timestamp())?;
                    if matches!(outcome, ListingOutcome::Recorded { .. }) {
                        recorded += 1;
                    }

                    let seen = offset + index + 1;
                    if seen % PROGRESS_INTERVAL == 0 {
                        log::info!(
                            "📊 {} listings processed, now at {}",
                            seen,
                            describe_checkpoint(Some(row.item_updated_at))
                        );
                    }
                }
                (block.len(), recorded)
            };
            tx.commit()?;

            offset += rows;
            summary.rows_seen += rows;
            summary.sales_recorded += recorded;
            summary.blocks_committed += 1;
            log::debug!("✅ Committed block of {} listings ({} sales)", rows, recorded);

            if rows < block_size {
                break;
            }
        }

        log::info!(
            "✅ Pass complete: {} listings, {} sales recorded, {} blocks",
            summary.rows_seen,
            summary.sales_recorded,
            summary.blocks_committed
        );
        Ok(summary)
    }

    /// Keep running passes, idling briefly whenever one records nothing
    ///
    /// Only returns on error.
    pub fn run_continuous(&mut self) -> Result<()> {
        loop {
            let summary = self.run_pass()?;
            if summary.sales_recorded == 0 {
                thread::sleep(IDLE_POLL);
            }
        }
    }
}
