//! stashflow - currency valuation for public stash marketplace listings
//!
//! Reads priced listings from SQLite, records one sale per item,
//! maintains recency-weighted statistics per currency pair and values
//! every sale in Chaos Orbs.

pub mod config;
pub mod error;
pub mod logging;
pub mod sqlite_pragma;
pub mod store;
pub mod types;
pub mod valuation;

pub use error::{Result, ValuationError};
pub use types::{CurrencyPairStat, ListingRow, ParsedPrice, PassSummary, SaleRecord, SaleSample};
