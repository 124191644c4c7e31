//! Table creation for the listing and valuation schemas
//!
//! DDL lives in `/sql/` and is compiled in. Every file uses
//! `IF NOT EXISTS`, so running it against a populated database is a
//! no-op; the existence probe beforehand only decides what to report.

use crate::error::Result;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    Created,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Stash,
    Item,
    Sale,
    CurrencySummary,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Stash => "stash",
            Table::Item => "item",
            Table::Sale => "sale",
            Table::CurrencySummary => "currency_summary",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Table::Stash => "Stash",
            Table::Item => "Item",
            Table::Sale => "Sale",
            Table::CurrencySummary => "Currency Summary",
        }
    }

    fn ddl(self) -> &'static str {
        match self {
            Table::Stash => include_str!("../../sql/01_stash.sql"),
            Table::Item => include_str!("../../sql/02_item.sql"),
            Table::Sale => include_str!("../../sql/03_sale.sql"),
            Table::CurrencySummary => include_str!("../../sql/04_currency_summary.sql"),
        }
    }
}

/// Tables the valuation pass writes
pub const VALUATION_TABLES: [Table; 2] = [Table::Sale, Table::CurrencySummary];

/// Tables the import path writes and the valuation pass reads
pub const LISTING_TABLES: [Table; 2] = [Table::Stash, Table::Item];

pub fn table_exists(conn: &Connection, table: Table) -> Result<bool> {
    let mut stmt =
        conn.prepare_cached("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    Ok(stmt.exists(params![table.name()])?)
}

/// Create `table` (and its indexes) unless it already exists
pub fn ensure_table(conn: &Connection, table: Table) -> Result<SchemaStatus> {
    if table_exists(conn, table)? {
        log::debug!("{} table already present", table.label());
        return Ok(SchemaStatus::AlreadyPresent);
    }

    conn.execute_batch(table.ddl())?;
    log::info!("🔧 Created {} table", table.label());
    Ok(SchemaStatus::Created)
}

pub fn ensure_tables(conn: &Connection, tables: &[Table]) -> Result<Vec<(Table, SchemaStatus)>> {
    tables
        .iter()
        .map(|&table| ensure_table(conn, table).map(|status| (table, status)))
        .collect()
}
