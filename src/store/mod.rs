//! Persistence seam for the valuation engine
//!
//! Tables (see `/sql/`):
//! - `stash`, `item` - listings, written by import and read by the pass
//! - `sale` - UPSERT on item_id, one priced listing per item
//! - `currency_summary` - UPSERT on (from_currency, to_currency)

pub mod listings;
pub mod schema;
pub mod sqlite;

pub use listings::{load_stash_file, ApiItem, ApiStash, ImportSummary, ListingStore};
pub use schema::{SchemaStatus, Table};
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::{CurrencyPairStat, ListingRow, SaleRecord, SaleSample};

/// Everything the valuation engine reads and writes
///
/// All methods run against whatever connection or transaction the
/// implementation wraps, so a block of listings processed through one
/// store commits or rolls back together.
pub trait ValuationStore {
    /// Create the `sale` and `currency_summary` tables when missing
    fn ensure_schema(&self) -> Result<Vec<(Table, SchemaStatus)>>;

    /// Public listings with a non-empty item or stash note, updated at or
    /// after `checkpoint`, ordered by (updated_at, created_at, id)
    fn fetch_listing_block(
        &self,
        checkpoint: Option<i64>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ListingRow>>;

    fn find_sale(&self, item_id: i64) -> Result<Option<SaleRecord>>;

    /// Insert or overwrite the sale keyed by `item_id`
    ///
    /// An existing row keeps its `id`, `name`, `is_currency` and
    /// `created_at`; price fields and timestamps are replaced.
    fn upsert_sale(&self, sale: &SaleRecord) -> Result<()>;

    fn set_sale_value(&self, item_id: i64, amount_chaos: Option<f64>) -> Result<()>;

    /// Every recorded price of `name` in `currency`
    fn sale_samples(&self, name: &str, currency: &str) -> Result<Vec<SaleSample>>;

    fn upsert_currency_pair(&self, stat: &CurrencyPairStat, now: i64) -> Result<()>;

    /// Pairs starting at `from_currency`, highest count first
    fn find_currency_pairs_from(&self, from_currency: &str) -> Result<Vec<CurrencyPairStat>>;

    fn find_currency_pair(
        &self,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<Option<CurrencyPairStat>>;

    /// Latest `item_updated_at` among recorded sales
    fn last_checkpoint(&self) -> Result<Option<i64>>;

    /// Distinct currency names appearing on either side of a pair
    fn known_currency_names(&self) -> Result<Vec<String>>;
}
