//! Listing tables: stash-tab JSON models and the import path
//!
//! Import is how listings reach the database in this crate; the live
//! stash API poller is a separate concern. Rows are upserted on their
//! API id so re-importing a newer dump refreshes `updated_at`, which is
//! what moves a listing past the valuation checkpoint.

use super::schema::{self, SchemaStatus, Table, LISTING_TABLES};
use crate::error::{Result, ValuationError};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// One stash tab from the public stash API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStash {
    pub id: String,
    pub account_name: Option<String>,
    pub last_character_name: Option<String>,
    /// Stash tab title; doubles as a tab-wide price note
    pub stash: Option<String>,
    #[serde(default = "default_stash_type")]
    pub stash_type: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub items: Vec<ApiItem>,
}

fn default_stash_type() -> String {
    "PremiumStash".to_string()
}

/// One item inside a stash tab (only the fields valuation reads)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub type_line: String,
    pub note: Option<String>,
    pub category: Option<Value>,
    #[serde(default)]
    pub league: String,
    pub stack_size: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StashFile {
    Page { stashes: Vec<ApiStash> },
    List(Vec<ApiStash>),
}

/// Remove a leading `<<set:...>>` style markup run from an API name
pub fn clean_markup(value: &str) -> &str {
    if !value.starts_with("<<") {
        return value;
    }
    match value.rfind(">>") {
        Some(end) if end >= 2 => &value[end + 2..],
        _ => value,
    }
}

/// Read a stash dump: either a raw API page (`{"stashes": [...]}`) or a
/// bare array of stashes
pub fn load_stash_file(path: impl AsRef<Path>) -> Result<Vec<ApiStash>> {
    let text = fs::read_to_string(path.as_ref())?;
    let stashes = match serde_json::from_str::<StashFile>(&text)? {
        StashFile::Page { stashes } => stashes,
        StashFile::List(stashes) => stashes,
    };

    if let Some(stash) = stashes.iter().find(|s| s.id.trim().is_empty()) {
        return Err(ValuationError::InvalidListing(format!(
            "stash with empty id (account {:?})",
            stash.account_name
        )));
    }

    log::info!(
        "📊 Loaded {} stashes from {}",
        stashes.len(),
        path.as_ref().display()
    );
    Ok(stashes)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub stashes: usize,
    pub items: usize,
}

/// Writer for the `stash` and `item` tables
pub struct ListingStore<'c> {
    conn: &'c Connection,
}

impl<'c> ListingStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn ensure_schema(&self) -> Result<Vec<(Table, SchemaStatus)>> {
        schema::ensure_tables(self.conn, &LISTING_TABLES)
    }

    /// Upsert `stash` (and optionally its items) stamped with the current time
    pub fn insert_api_stash(&self, stash: &ApiStash, with_items: bool) -> Result<i64> {
        self.insert_api_stash_at(stash, with_items, Utc::now().timestamp())
    }

    /// Upsert `stash` stamped with `now`; returns the stash row id
    pub fn insert_api_stash_at(&self, stash: &ApiStash, with_items: bool, now: i64) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO stash (api_id, account_name, last_character_name, stash,
                                    stash_type, public, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(api_id) DO UPDATE SET
                     account_name = excluded.account_name,
                     last_character_name = excluded.last_character_name,
                     stash = excluded.stash,
                     stash_type = excluded.stash_type,
                     public = excluded.public,
                     updated_at = excluded.updated_at",
            )?
            .execute(params![
                stash.id,
                stash.account_name,
                stash.last_character_name,
                stash.stash,
                stash.stash_type,
                stash.public,
                now,
            ])?;

        let stash_id: i64 = self.conn.query_row(
            "SELECT id FROM stash WHERE api_id = ?1",
            params![stash.id],
            |row| row.get(0),
        )?;

        if with_items {
            for item in &stash.items {
                self.insert_api_item(stash_id, item, now)?;
            }
        }

        log::debug!(
            "Stored stash {} ({} items, public={})",
            stash.id,
            stash.items.len(),
            stash.public
        );
        Ok(stash_id)
    }

    pub fn insert_api_item(&self, stash_id: i64, item: &ApiItem, now: i64) -> Result<()> {
        let category = item
            .category
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn
            .prepare_cached(
                "INSERT INTO item (api_id, stash_id, name, type_line, note, category, league,
                                   stack_size, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                 ON CONFLICT(api_id) DO UPDATE SET
                     stash_id = excluded.stash_id,
                     name = excluded.name,
                     type_line = excluded.type_line,
                     note = excluded.note,
                     category = excluded.category,
                     league = excluded.league,
                     stack_size = excluded.stack_size,
                     updated_at = excluded.updated_at",
            )?
            .execute(params![
                item.id,
                stash_id,
                clean_markup(&item.name),
                clean_markup(&item.type_line),
                item.note,
                category,
                item.league,
                item.stack_size,
                now,
            ])?;
        Ok(())
    }
}

/// Import every stash (with items) in one transaction
pub fn import_stashes(conn: &mut Connection, stashes: &[ApiStash]) -> Result<ImportSummary> {
    ListingStore::new(conn).ensure_schema()?;

    let now = Utc::now().timestamp();
    let tx = conn.transaction()?;
    let mut summary = ImportSummary::default();
    {
        let store = ListingStore::new(&tx);
        for stash in stashes {
            store.insert_api_stash_at(stash, true, now)?;
            summary.stashes += 1;
            summary.items += stash.items.len();
        }
    }
    tx.commit()?;

    log::info!(
        "✅ Imported {} stashes, {} items",
        summary.stashes,
        summary.items
    );
    Ok(summary)
}
