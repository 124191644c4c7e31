//! rusqlite implementation of `ValuationStore`

use super::schema::{self, SchemaStatus, Table, VALUATION_TABLES};
use super::ValuationStore;
use crate::error::Result;
use crate::types::{CurrencyPairStat, ListingRow, SaleRecord, SaleSample};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

const LISTING_BLOCK_SQL: &str = "
    SELECT item.id, item.api_id, item.type_line, item.name, item.note, item.category,
           item.updated_at, stash.stash, stash.public
    FROM item
    INNER JOIN stash ON stash.id = item.stash_id
    WHERE stash.public = 1
      AND ((item.note IS NOT NULL AND item.note != '')
           OR (stash.stash IS NOT NULL AND stash.stash != ''))
      AND (?1 IS NULL OR item.updated_at >= ?1)
    ORDER BY item.updated_at, item.created_at, item.id
    LIMIT ?2 OFFSET ?3";

const SALE_COLUMNS: &str = "item_id, item_api_id, name, is_currency, sale_currency, sale_amount,
     sale_amount_chaos, item_updated_at, created_at, updated_at";

const PAIR_COLUMNS: &str = "from_currency, to_currency, count, mean, standard_dev, weight";

/// Store over a borrowed connection
///
/// Pass a `Transaction` (it derefs to `Connection`) to make every write
/// part of that transaction.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

/// Decode the stored category JSON into a flat list of labels
///
/// The stash API has shipped categories as `{"currency": []}`, as
/// `["currency"]` and as a bare string over time; all three are accepted.
pub fn decode_category(raw: Option<&str>) -> Result<Vec<String>> {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(Vec::new()),
    };

    let labels = match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::String(label) => vec![label],
        _ => Vec::new(),
    };
    Ok(labels)
}

fn sale_from_row(row: &Row<'_>) -> rusqlite::Result<SaleRecord> {
    Ok(SaleRecord {
        item_id: row.get(0)?,
        item_api_id: row.get(1)?,
        name: row.get(2)?,
        is_currency: row.get(3)?,
        sale_currency: row.get(4)?,
        sale_amount: row.get(5)?,
        sale_amount_chaos: row.get(6)?,
        item_updated_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn pair_from_row(row: &Row<'_>) -> rusqlite::Result<CurrencyPairStat> {
    Ok(CurrencyPairStat {
        from_currency: row.get(0)?,
        to_currency: row.get(1)?,
        count: row.get(2)?,
        mean: row.get(3)?,
        standard_dev: row.get(4)?,
        weight: row.get(5)?,
    })
}

impl ValuationStore for SqliteStore<'_> {
    fn ensure_schema(&self) -> Result<Vec<(Table, SchemaStatus)>> {
        schema::ensure_tables(self.conn, &VALUATION_TABLES)
    }

    fn fetch_listing_block(
        &self,
        checkpoint: Option<i64>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ListingRow>> {
        let mut stmt = self.conn.prepare_cached(LISTING_BLOCK_SQL)?;

        // Category JSON is decoded after the query so a malformed value
        // surfaces as a JSON error rather than a column conversion error.
        let raw_rows = stmt
            .query_map(params![checkpoint, limit as i64, offset as i64], |row| {
                let category: Option<String> = row.get(5)?;
                Ok((
                    ListingRow {
                        item_id: row.get(0)?,
                        item_api_id: row.get(1)?,
                        type_line: row.get(2)?,
                        name: row.get(3)?,
                        note: row.get(4)?,
                        category: Vec::new(),
                        item_updated_at: row.get(6)?,
                        stash_note: row.get(7)?,
                        stash_public: row.get(8)?,
                    },
                    category,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw_rows
            .into_iter()
            .map(|(mut listing, category)| {
                listing.category = decode_category(category.as_deref())?;
                Ok(listing)
            })
            .collect()
    }

    fn find_sale(&self, item_id: i64) -> Result<Option<SaleRecord>> {
        let sql = format!("SELECT {} FROM sale WHERE item_id = ?1", SALE_COLUMNS);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        Ok(stmt.query_row(params![item_id], sale_from_row).optional()?)
    }

    fn upsert_sale(&self, sale: &SaleRecord) -> Result<()> {
        let sql = format!(
            "INSERT INTO sale ({})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(item_id) DO UPDATE SET
                 item_api_id = excluded.item_api_id,
                 sale_currency = excluded.sale_currency,
                 sale_amount = excluded.sale_amount,
                 sale_amount_chaos = excluded.sale_amount_chaos,
                 item_updated_at = excluded.item_updated_at,
                 updated_at = excluded.updated_at",
            SALE_COLUMNS
        );
        self.conn.prepare_cached(&sql)?.execute(params![
            sale.item_id,
            sale.item_api_id,
            sale.name,
            sale.is_currency,
            sale.sale_currency,
            sale.sale_amount,
            sale.sale_amount_chaos,
            sale.item_updated_at,
            sale.created_at,
            sale.updated_at,
        ])?;
        Ok(())
    }

    fn set_sale_value(&self, item_id: i64, amount_chaos: Option<f64>) -> Result<()> {
        self.conn
            .prepare_cached("UPDATE sale SET sale_amount_chaos = ?2 WHERE item_id = ?1")?
            .execute(params![item_id, amount_chaos])?;
        Ok(())
    }

    fn sale_samples(&self, name: &str, currency: &str) -> Result<Vec<SaleSample>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT sale_amount, item_updated_at FROM sale
             WHERE name = ?1 AND sale_currency = ?2",
        )?;
        let samples = stmt
            .query_map(params![name, currency], |row| {
                Ok(SaleSample {
                    amount: row.get(0)?,
                    item_updated_at: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(samples)
    }

    fn upsert_currency_pair(&self, stat: &CurrencyPairStat, now: i64) -> Result<()> {
        let sql = format!(
            "INSERT INTO currency_summary ({}, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(from_currency, to_currency) DO UPDATE SET
                 count = excluded.count,
                 mean = excluded.mean,
                 standard_dev = excluded.standard_dev,
                 weight = excluded.weight,
                 updated_at = excluded.updated_at",
            PAIR_COLUMNS
        );
        self.conn.prepare_cached(&sql)?.execute(params![
            stat.from_currency,
            stat.to_currency,
            stat.count,
            stat.mean,
            stat.standard_dev,
            stat.weight,
            now,
        ])?;
        Ok(())
    }

    fn find_currency_pairs_from(&self, from_currency: &str) -> Result<Vec<CurrencyPairStat>> {
        let sql = format!(
            "SELECT {} FROM currency_summary WHERE from_currency = ?1
             ORDER BY count DESC, to_currency",
            PAIR_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let pairs = stmt
            .query_map(params![from_currency], pair_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pairs)
    }

    fn find_currency_pair(
        &self,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<Option<CurrencyPairStat>> {
        let sql = format!(
            "SELECT {} FROM currency_summary WHERE from_currency = ?1 AND to_currency = ?2",
            PAIR_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        Ok(stmt
            .query_row(params![from_currency, to_currency], pair_from_row)
            .optional()?)
    }

    fn last_checkpoint(&self) -> Result<Option<i64>> {
        let checkpoint: Option<i64> =
            self.conn
                .query_row("SELECT MAX(item_updated_at) FROM sale", [], |row| row.get(0))?;
        Ok(checkpoint)
    }

    fn known_currency_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT from_currency FROM currency_summary
             UNION
             SELECT to_currency FROM currency_summary",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}
