//! Connection setup: DSN handling, PRAGMA tuning and optional SQL tracing

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

const MEMORY_DATABASE: &str = ":memory:";

/// Map a SQLAlchemy-style DSN onto a file path
///
/// `sqlite:///rel.db` is the relative file `rel.db` and `sqlite:////abs.db`
/// the absolute `/abs.db`. The shorter `sqlite://` and `sqlite:` prefixes
/// are stripped as well; anything else is already a path. An empty path
/// means an in-memory database, as in SQLAlchemy.
pub fn database_path(dsn: &str) -> &str {
    let path = ["sqlite:///", "sqlite://", "sqlite:"]
        .iter()
        .find_map(|prefix| dsn.strip_prefix(prefix))
        .unwrap_or(dsn);
    if path.is_empty() {
        MEMORY_DATABASE
    } else {
        path
    }
}

/// Apply the write-heavy PRAGMA set used for batch passes
///
/// - WAL journal (file databases only, in-memory keeps `memory`)
/// - synchronous=NORMAL
/// - temp_store=MEMORY
/// - wal_autocheckpoint=1000 pages
/// - foreign_keys=ON
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    let journal: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "wal_autocheckpoint", 1000)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    log::debug!("🔧 SQLite pragmas applied (journal_mode={})", journal);
    Ok(())
}

fn log_statement(sql: &str) {
    log::trace!(target: "stashflow::sql", "{}", sql);
}

/// Open (creating if needed) the database behind `dsn`
///
/// When `trace_sql` is set every executed statement is logged under the
/// `stashflow::sql` target at trace level.
pub fn open_database(dsn: &str, trace_sql: bool) -> Result<Connection> {
    let path = database_path(dsn);

    let mut conn = if path == MEMORY_DATABASE {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Connection::open(path)?
    };

    apply_optimized_pragmas(&conn)?;

    if trace_sql {
        conn.trace(Some(log_statement));
        log::debug!("🔍 SQL statement tracing enabled");
    }

    log::info!("✅ Opened database {}", path);
    Ok(conn)
}
