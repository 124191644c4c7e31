//! Integration tests for the valuation pass
//!
//! Listings are imported through `ListingStore` into a file-backed SQLite
//! database and valued with `BatchProcessor`, covering:
//! - direct and two-hop Chaos Orb valuation
//! - idempotent re-runs
//! - crash recovery via --max-blocks matching an uninterrupted run
//! - block rollback when a listing fails mid-block
//! - private stashes and stash-note pricing

#[cfg(test)]
mod valuation_pass_tests {
    use rusqlite::Connection;
    use stashflow::sqlite_pragma::open_database;
    use stashflow::store::{ApiItem, ApiStash, ListingStore, SqliteStore, ValuationStore};
    use stashflow::valuation::{BatchProcessor, PassOptions, ValueResolver};
    use tempfile::{tempdir, TempDir};

    const DAY: i64 = 86_400;

    fn item(id: &str, name: &str, type_line: &str, note: Option<&str>, currency: bool) -> ApiItem {
        let category = if currency {
            serde_json::json!({"currency": []})
        } else {
            serde_json::json!({"accessories": ["ring"]})
        };
        ApiItem {
            id: id.to_string(),
            name: name.to_string(),
            type_line: type_line.to_string(),
            note: note.map(str::to_string),
            category: Some(category),
            league: "Standard".to_string(),
            stack_size: None,
        }
    }

    fn currency(id: &str, type_line: &str, note: &str) -> ApiItem {
        item(id, "", type_line, Some(note), true)
    }

    fn stash(id: &str, public: bool, note: Option<&str>, items: Vec<ApiItem>) -> ApiStash {
        ApiStash {
            id: id.to_string(),
            account_name: Some("trader".to_string()),
            last_character_name: None,
            stash: note.map(str::to_string),
            stash_type: "PremiumStash".to_string(),
            public,
            items,
        }
    }

    fn open_test_db() -> (TempDir, Connection) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stashflow.db");
        let conn = open_database(path.to_str().unwrap(), false).unwrap();
        ListingStore::new(&conn).ensure_schema().unwrap();
        (dir, conn)
    }

    fn seed(conn: &Connection, stashes: &[(ApiStash, i64)]) {
        let store = ListingStore::new(conn);
        for (stash, at) in stashes {
            store.insert_api_stash_at(stash, true, *at).unwrap();
        }
    }

    fn run(conn: &mut Connection, options: PassOptions) -> stashflow::PassSummary {
        BatchProcessor::new(conn, options).run_pass().unwrap()
    }

    fn chaos_value(conn: &Connection, currency: &str) -> Option<f64> {
        ValueResolver::default()
            .value_in_canonical(&SqliteStore::new(conn), currency, 1.0)
            .unwrap()
    }

    type SaleSnapshot = Vec<(i64, String, String, f64, Option<f64>, i64)>;
    type PairSnapshot = Vec<(String, String, i64, f64, f64)>;

    fn snapshot(conn: &Connection) -> (SaleSnapshot, PairSnapshot) {
        let sales: SaleSnapshot = conn
            .prepare(
                "SELECT item_id, name, sale_currency, sale_amount, sale_amount_chaos, item_updated_at
                 FROM sale ORDER BY item_id",
            )
            .unwrap()
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        let pairs: PairSnapshot = conn
            .prepare(
                "SELECT from_currency, to_currency, count, mean, standard_dev
                 FROM currency_summary ORDER BY from_currency, to_currency",
            )
            .unwrap()
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        (sales, pairs)
    }

    /// Ten stashes at increasing timestamps, mixing currency trades,
    /// a non-currency item and an unpriced note
    fn market_history() -> Vec<(ApiStash, i64)> {
        let base = 1_546_300_800;
        (0..10)
            .map(|i| {
                let items = vec![
                    currency(&format!("exa-{}", i), "Exalted Orb", &format!("~price {} chaos", 95 + i)),
                    currency(&format!("chrom-{}", i), "Chromatic Orb", "~b/o 1/5 chaos"),
                    currency(&format!("div-{}", i), "Divine Orb", "~price 1/8 exa"),
                    item(&format!("ring-{}", i), "Dusk Knuckle", "Ruby Ring", Some("~price 2 exa"), false),
                    item(&format!("junk-{}", i), "", "Iron Ring", Some("make an offer"), false),
                ];
                (stash(&format!("stash-{}", i), true, None, items), base + i * DAY / 4)
            })
            .collect()
    }

    #[test]
    fn test_exalt_for_chaos() {
        let (_dir, mut conn) = open_test_db();
        seed(
            &conn,
            &[(stash("s1", true, None, vec![currency("e1", "Exalted Orb", "~price 100 chaos")]), 1000)],
        );

        let summary = run(&mut conn, PassOptions::default());

        assert_eq!(summary.sales_recorded, 1);
        assert_eq!(chaos_value(&conn, "Exalted Orb"), Some(100.0));
        let value: f64 = conn
            .query_row("SELECT sale_amount_chaos FROM sale", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, 100.0);
    }

    #[test]
    fn test_two_hop_conversion() {
        let (_dir, mut conn) = open_test_db();
        seed(
            &conn,
            &[(
                stash(
                    "s1",
                    true,
                    None,
                    vec![
                        currency("e1", "Exalted Orb", "~price 500 chrom"),
                        currency("c1", "Chromatic Orb", "~price 1/5 chaos"),
                    ],
                ),
                1000,
            )],
        );

        run(&mut conn, PassOptions::default());

        let value = chaos_value(&conn, "Exalted Orb").unwrap();
        assert!((value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_timestamps_give_arithmetic_mean() {
        let (_dir, mut conn) = open_test_db();
        seed(
            &conn,
            &[(
                stash(
                    "s1",
                    true,
                    None,
                    vec![
                        currency("e1", "Exalted Orb", "~price 90 chaos"),
                        currency("e2", "Exalted Orb", "~price 100 chaos"),
                        currency("e3", "Exalted Orb", "~price 110 chaos"),
                    ],
                ),
                1000,
            )],
        );

        run(&mut conn, PassOptions::default());

        let pair = SqliteStore::new(&conn)
            .find_currency_pair("Exalted Orb", "Chaos Orb")
            .unwrap()
            .unwrap();
        assert_eq!(pair.count, 3);
        assert!((pair.mean - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_outlier_rejection_option() {
        let (_dir, mut conn) = open_test_db();
        let mut items: Vec<ApiItem> = (0..20)
            .map(|i| currency(&format!("alt-{}", i), "Orb of Alteration", "~price 1/100 chaos"))
            .collect();
        items.push(currency("alt-typo", "Orb of Alteration", "~price 100 chaos"));
        seed(&conn, &[(stash("s1", true, None, items), 1000)]);

        run(
            &mut conn,
            PassOptions {
                reject_outliers: true,
                ..PassOptions::default()
            },
        );

        let pair = SqliteStore::new(&conn)
            .find_currency_pair("Orb of Alteration", "Chaos Orb")
            .unwrap()
            .unwrap();
        assert_eq!(pair.count, 20);
        assert!((pair.mean - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_private_stash_and_stash_note() {
        let (_dir, mut conn) = open_test_db();
        seed(
            &conn,
            &[
                (
                    stash("hidden", false, None, vec![currency("h1", "Exalted Orb", "~price 1 chaos")]),
                    1000,
                ),
                (
                    stash(
                        "tab",
                        true,
                        Some("~b/o 3 chaos"),
                        vec![item("r1", "Vermillion Band", "Coral Ring", None, false)],
                    ),
                    1000,
                ),
            ],
        );

        let summary = run(&mut conn, PassOptions::default());

        assert_eq!(summary.rows_seen, 1);
        let (sales, pairs) = snapshot(&conn);
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].1, "Vermillion Band Coral Ring");
        assert_eq!(sales[0].4, Some(3.0));
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let (_dir, mut conn) = open_test_db();
        seed(&conn, &market_history());

        let first = run(&mut conn, PassOptions::default());
        let before = snapshot(&conn);
        let updated_before: i64 = conn
            .query_row("SELECT MAX(updated_at) FROM sale", [], |row| row.get(0))
            .unwrap();

        let second = run(&mut conn, PassOptions::default());

        assert_eq!(first.sales_recorded, 40);
        assert_eq!(second.sales_recorded, 0);
        assert!(second.rows_seen > 0, "checkpoint rows are re-read");
        assert_eq!(snapshot(&conn), before);
        let updated_after: i64 = conn
            .query_row("SELECT MAX(updated_at) FROM sale", [], |row| row.get(0))
            .unwrap();
        assert_eq!(updated_after, updated_before);
    }

    #[test]
    fn test_interrupted_pass_matches_uninterrupted_run() {
        let history = market_history();
        let options = PassOptions {
            block_size: 7,
            ..PassOptions::default()
        };

        let (_full_dir, mut full) = open_test_db();
        seed(&full, &history);
        run(&mut full, options.clone());

        let (_resumed_dir, mut resumed) = open_test_db();
        seed(&resumed, &history);
        let partial = run(
            &mut resumed,
            PassOptions {
                max_blocks: Some(2),
                ..options.clone()
            },
        );
        assert_eq!(partial.blocks_committed, 2);
        assert_eq!(partial.rows_seen, 14);
        run(&mut resumed, options);

        assert_eq!(snapshot(&resumed), snapshot(&full));
    }

    #[test]
    fn test_failed_block_rolls_back() {
        let (_dir, mut conn) = open_test_db();
        seed(
            &conn,
            &[
                (
                    stash(
                        "good",
                        true,
                        None,
                        vec![
                            currency("e1", "Exalted Orb", "~price 100 chaos"),
                            currency("e2", "Exalted Orb", "~price 102 chaos"),
                        ],
                    ),
                    1000,
                ),
                (
                    stash("bad", true, None, vec![currency("p1", "Poison Orb", "~price 1 chaos")]),
                    2000,
                ),
            ],
        );

        BatchProcessor::new(&mut conn, PassOptions::default())
            .prepare_schema()
            .unwrap();
        conn.execute_batch(
            "CREATE TRIGGER poison_sale BEFORE INSERT ON sale
             WHEN NEW.name = 'Poison Orb'
             BEGIN SELECT RAISE(ABORT, 'poisoned listing'); END;",
        )
        .unwrap();

        // all three listings share one block: nothing survives
        let result = BatchProcessor::new(&mut conn, PassOptions::default()).run_pass();
        assert!(result.is_err());
        let (sales, pairs) = snapshot(&conn);
        assert!(sales.is_empty());
        assert!(pairs.is_empty());

        // with two-row blocks the first block commits before the failure
        let small_blocks = PassOptions {
            block_size: 2,
            ..PassOptions::default()
        };
        assert!(BatchProcessor::new(&mut conn, small_blocks.clone())
            .run_pass()
            .is_err());
        assert_eq!(snapshot(&conn).0.len(), 2);

        conn.execute_batch("DROP TRIGGER poison_sale").unwrap();
        let summary = run(&mut conn, small_blocks);
        assert_eq!(summary.checkpoint, Some(1000));
        assert_eq!(summary.sales_recorded, 1);
        assert_eq!(snapshot(&conn).0.len(), 3);
    }

    #[test]
    fn test_relisted_item_moves_past_checkpoint() {
        let (_dir, mut conn) = open_test_db();
        seed(
            &conn,
            &[(stash("s1", true, None, vec![currency("e1", "Exalted Orb", "~price 100 chaos")]), 1000)],
        );
        run(&mut conn, PassOptions::default());

        seed(
            &conn,
            &[(stash("s1", true, None, vec![currency("e1", "Exalted Orb", "~price 120 chaos")]), 1000 + DAY)],
        );
        let summary = run(&mut conn, PassOptions::default());

        assert_eq!(summary.checkpoint, Some(1000));
        assert_eq!(summary.sales_recorded, 1);
        assert_eq!(chaos_value(&conn, "Exalted Orb"), Some(120.0));
    }
}
