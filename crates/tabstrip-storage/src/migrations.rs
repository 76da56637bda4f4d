//! Schema migrations, tracked with SQLite's `user_version`

use rusqlite::Connection;

use crate::Result;

const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current < 1 {
        migrate_v1(conn)?;
    }

    if current != SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v1: local tabs");

    // Rewritten whole on every flush; position is the strip order
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS local_tabs (
            position INTEGER PRIMARY KEY,
            tab_id INTEGER NOT NULL,
            parent_id INTEGER,
            url TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            last_used TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_local_tabs_url ON local_tabs(url);
    "#,
    )?;

    Ok(())
}
