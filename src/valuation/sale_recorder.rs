//! Turns one listing into a recorded sale

use super::aggregator::WeightedAggregator;
use super::note_parser::NoteParser;
use super::resolver::ValueResolver;
use crate::error::Result;
use crate::store::ValuationStore;
use crate::types::{ListingRow, SaleRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum ListingOutcome {
    /// Neither note starts with '~', or the stash is private
    NotForSale,
    /// Marked for sale but no usable price (or a zero price)
    NoPrice,
    /// A sale for this item was recorded from the same or a newer listing
    AlreadyRecorded,
    Recorded {
        name: String,
        currency: String,
        amount: f64,
        value_chaos: Option<f64>,
    },
}

pub struct SaleRecorder<'a> {
    parser: &'a NoteParser,
    aggregator: &'a WeightedAggregator,
    resolver: &'a ValueResolver,
}

impl<'a> SaleRecorder<'a> {
    pub fn new(
        parser: &'a NoteParser,
        aggregator: &'a WeightedAggregator,
        resolver: &'a ValueResolver,
    ) -> Self {
        Self {
            parser,
            aggregator,
            resolver,
        }
    }

    /// Record `row` as a sale, refresh pair statistics for currency
    /// stacks and store the Chaos Orb value when one can be resolved
    pub fn process_listing<S: ValuationStore + ?Sized>(
        &self,
        store: &S,
        row: &ListingRow,
        now: i64,
    ) -> Result<ListingOutcome> {
        if !row.stash_public || !row.has_sale_marker() {
            return Ok(ListingOutcome::NotForSale);
        }

        let name = row.subject();

        // item note first, the stash-wide note is the fallback
        let price = self
            .parser
            .parse(row.note.as_deref())
            .or_else(|| self.parser.parse(row.stash_note.as_deref()));
        let price = match price {
            Some(price) if price.amount != 0.0 => price,
            _ => {
                log::debug!("No usable price for {} (item {})", name, row.item_id);
                return Ok(ListingOutcome::NoPrice);
            }
        };

        let existing = store.find_sale(row.item_id)?;
        if let Some(existing) = &existing {
            if existing.item_updated_at >= row.item_updated_at {
                return Ok(ListingOutcome::AlreadyRecorded);
            }
        }

        let is_currency = row.is_currency();
        store.upsert_sale(&SaleRecord {
            item_id: row.item_id,
            item_api_id: row.item_api_id.clone(),
            name: name.clone(),
            is_currency,
            sale_currency: price.currency.clone(),
            sale_amount: price.amount,
            sale_amount_chaos: None,
            item_updated_at: row.item_updated_at,
            created_at: existing.as_ref().map_or(now, |e| e.created_at),
            updated_at: now,
        })?;

        if is_currency {
            self.aggregator.update_summary(
                store,
                &name,
                &price.currency,
                row.item_updated_at,
                now,
            )?;
        }

        let value_chaos = self
            .resolver
            .value_in_canonical(store, &price.currency, price.amount)?;
        if value_chaos.is_some() {
            store.set_sale_value(row.item_id, value_chaos)?;
        }

        log::debug!(
            "Recorded {} for {} {} ({:?} chaos)",
            name,
            price.amount,
            price.currency,
            value_chaos
        );

        Ok(ListingOutcome::Recorded {
            name,
            currency: price.currency,
            amount: price.amount,
            value_chaos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::{ensure_tables, VALUATION_TABLES};
    use crate::store::SqliteStore;
    use rusqlite::Connection;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_tables(&conn, &VALUATION_TABLES).unwrap();
        conn
    }

    fn listing(item_id: i64, type_line: &str, note: Option<&str>, at: i64) -> ListingRow {
        ListingRow {
            item_id,
            item_api_id: format!("api-{}", item_id),
            type_line: type_line.to_string(),
            name: String::new(),
            note: note.map(str::to_string),
            category: vec!["currency".to_string()],
            item_updated_at: at,
            stash_note: None,
            stash_public: true,
        }
    }

    fn record(store: &SqliteStore<'_>, row: &ListingRow) -> ListingOutcome {
        let parser = NoteParser::default();
        let aggregator = WeightedAggregator::default();
        let resolver = ValueResolver::default();
        SaleRecorder::new(&parser, &aggregator, &resolver)
            .process_listing(store, row, 1_000)
            .unwrap()
    }

    #[test]
    fn test_unmarked_listing_is_not_for_sale() {
        let conn = create_test_db();
        let store = SqliteStore::new(&conn);

        let row = listing(1, "Exalted Orb", Some("price 100 chaos"), 10);
        assert_eq!(record(&store, &row), ListingOutcome::NotForSale);
        assert!(store.find_sale(1).unwrap().is_none());
    }

    #[test]
    fn test_private_stash_listing_is_not_for_sale() {
        let conn = create_test_db();
        let store = SqliteStore::new(&conn);

        let mut row = listing(1, "Exalted Orb", Some("~price 100 chaos"), 10);
        row.stash_public = false;
        assert_eq!(record(&store, &row), ListingOutcome::NotForSale);
        assert!(store.find_sale(1).unwrap().is_none());
        assert!(store.find_currency_pair("Exalted Orb", "Chaos Orb").unwrap().is_none());
    }

    #[test]
    fn test_zero_and_unparseable_prices_skipped() {
        let conn = create_test_db();
        let store = SqliteStore::new(&conn);

        let zero = listing(1, "Exalted Orb", Some("~price 0 chaos"), 10);
        let junk = listing(2, "Exalted Orb", Some("~price lots chaos"), 10);
        assert_eq!(record(&store, &zero), ListingOutcome::NoPrice);
        assert_eq!(record(&store, &junk), ListingOutcome::NoPrice);
        assert_eq!(store.last_checkpoint().unwrap(), None);
    }

    #[test]
    fn test_currency_sale_updates_pair_and_value() {
        let conn = create_test_db();
        let store = SqliteStore::new(&conn);

        let row = listing(1, "Exalted Orb", Some("~b/o 100 chaos"), 10);
        let outcome = record(&store, &row);
        assert_eq!(
            outcome,
            ListingOutcome::Recorded {
                name: "Exalted Orb".to_string(),
                currency: "Chaos Orb".to_string(),
                amount: 100.0,
                value_chaos: Some(100.0),
            }
        );

        let pair = store
            .find_currency_pair("Exalted Orb", "Chaos Orb")
            .unwrap()
            .unwrap();
        assert_eq!(pair.count, 1);
        assert_eq!(pair.mean, 100.0);

        // a later exalt-priced sale is now valued through that pair
        let priced_in_exa = listing(2, "Divine Orb", Some("~price 1/10 exa"), 20);
        match record(&store, &priced_in_exa) {
            ListingOutcome::Recorded { value_chaos, .. } => {
                assert!((value_chaos.unwrap() - 10.0).abs() < 1e-9)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_stash_note_fallback_and_non_currency_subject() {
        let conn = create_test_db();
        let store = SqliteStore::new(&conn);

        let mut row = listing(5, "Simple Robe", None, 10);
        row.name = "Tabula Rasa".to_string();
        row.category = vec!["armour".to_string()];
        row.stash_note = Some("~price 8 chaos".to_string());

        record(&store, &row);

        let sale = store.find_sale(5).unwrap().unwrap();
        assert_eq!(sale.name, "Tabula Rasa Simple Robe");
        assert!(!sale.is_currency);
        assert_eq!(sale.sale_amount_chaos, Some(8.0));
        // non-currency sales never feed the pair table
        assert!(store.find_currency_pairs_from("Tabula Rasa Simple Robe").unwrap().is_empty());
    }

    #[test]
    fn test_item_note_wins_over_stash_note() {
        let conn = create_test_db();
        let store = SqliteStore::new(&conn);

        let mut row = listing(1, "Orb of Fusing", Some("~price 3 alt"), 10);
        row.stash_note = Some("~price 1 chaos".to_string());
        record(&store, &row);

        assert_eq!(store.find_sale(1).unwrap().unwrap().sale_currency, "Orb of Alteration");
    }

    #[test]
    fn test_unparseable_item_note_falls_back_to_stash() {
        let conn = create_test_db();
        let store = SqliteStore::new(&conn);

        let mut row = listing(1, "Orb of Fusing", Some("~price ask me"), 10);
        row.stash_note = Some("~b/o 1/2 chaos".to_string());
        record(&store, &row);

        assert_eq!(store.find_sale(1).unwrap().unwrap().sale_amount, 0.5);
    }

    #[test]
    fn test_reobservation_gate() {
        let conn = create_test_db();
        let store = SqliteStore::new(&conn);

        let first = listing(1, "Exalted Orb", Some("~price 100 chaos"), 10);
        record(&store, &first);
        assert_eq!(record(&store, &first), ListingOutcome::AlreadyRecorded);

        let stale = listing(1, "Exalted Orb", Some("~price 1 chaos"), 5);
        assert_eq!(record(&store, &stale), ListingOutcome::AlreadyRecorded);

        let repriced = listing(1, "Exalted Orb", Some("~price 120 chaos"), 30);
        assert!(matches!(record(&store, &repriced), ListingOutcome::Recorded { .. }));

        let sale = store.find_sale(1).unwrap().unwrap();
        assert_eq!(sale.sale_amount, 120.0);
        assert_eq!(sale.item_updated_at, 30);

        // the repriced item replaces its own sample
        let pair = store
            .find_currency_pair("Exalted Orb", "Chaos Orb")
            .unwrap()
            .unwrap();
        assert_eq!(pair.count, 1);
        assert_eq!(pair.mean, 120.0);
    }

    #[test]
    fn test_unresolvable_value_left_empty() {
        let conn = create_test_db();
        let store = SqliteStore::new(&conn);

        let row = listing(1, "Orb of Fusing", Some("~price 4 regal"), 10);
        match record(&store, &row) {
            ListingOutcome::Recorded { value_chaos, .. } => assert_eq!(value_chaos, None),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(store.find_sale(1).unwrap().unwrap().sale_amount_chaos, None);
    }
}
