//! Shared record types for listings, sales and currency pair statistics

/// One marketplace listing as read from the item/stash tables
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub item_id: i64,
    pub item_api_id: String,
    pub type_line: String,
    pub name: String,
    pub note: Option<String>,
    /// Category labels decoded from the stored JSON (object keys, array
    /// elements or a bare string)
    pub category: Vec<String>,
    pub item_updated_at: i64,
    pub stash_note: Option<String>,
    pub stash_public: bool,
}

impl ListingRow {
    pub fn is_currency(&self) -> bool {
        self.category.iter().any(|label| label.contains("currency"))
    }

    /// Name the sale is recorded under: the bare type for currency
    /// stacks, "name typeLine" for everything else.
    pub fn subject(&self) -> String {
        if self.is_currency() {
            self.type_line.clone()
        } else {
            format!("{} {}", self.name, self.type_line).trim().to_string()
        }
    }

    /// A listing is considered for sale when either note carries a
    /// leading '~' marker.
    pub fn has_sale_marker(&self) -> bool {
        let marked = |note: &Option<String>| note.as_deref().is_some_and(|n| n.starts_with('~'));
        marked(&self.note) || marked(&self.stash_note)
    }
}

/// Amount and canonical currency name extracted from a note
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrice {
    pub amount: f64,
    pub currency: String,
}

/// One row of the `sale` table
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub item_id: i64,
    pub item_api_id: String,
    pub name: String,
    pub is_currency: bool,
    pub sale_currency: String,
    pub sale_amount: f64,
    pub sale_amount_chaos: Option<f64>,
    pub item_updated_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Price observation used by the weighted aggregator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleSample {
    pub amount: f64,
    pub item_updated_at: i64,
}

/// One row of the `currency_summary` table: how many `to_currency` one
/// unit of `from_currency` sold for
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyPairStat {
    pub from_currency: String,
    pub to_currency: String,
    pub count: i64,
    pub mean: f64,
    pub standard_dev: f64,
    pub weight: f64,
}

/// Totals reported at the end of a valuation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub rows_seen: usize,
    pub sales_recorded: usize,
    pub blocks_committed: usize,
    /// Checkpoint the pass started from (None = beginning of history)
    pub checkpoint: Option<i64>,
}
