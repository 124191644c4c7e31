//! Valuation engine: note parsing, pair statistics, conversion and the
//! block-wise pass that ties them together

pub mod aggregator;
pub mod batch;
pub mod currency_names;
pub mod note_parser;
pub mod resolver;
pub mod sale_recorder;

pub use aggregator::{SummaryOutcome, WeightedAggregator, WeightedStats};
pub use batch::{BatchProcessor, PassOptions, BLOCK_SIZE};
pub use currency_names::{CurrencyCatalog, CANONICAL_CURRENCY};
pub use note_parser::NoteParser;
pub use resolver::{ConversionGraph, ValueResolver, MAX_CONVERSION_HOPS};
pub use sale_recorder::{ListingOutcome, SaleRecorder};
