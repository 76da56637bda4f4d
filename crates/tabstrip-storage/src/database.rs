//! SQLite-backed tab store

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::sink::{PersistenceSink, TabRecord};
use crate::Result;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Load the last persisted tab strip, in order
    pub fn load_tabs(&self) -> Result<Vec<TabRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT position, tab_id, parent_id, url, title, last_used
                 FROM local_tabs ORDER BY position",
            )?;

            let tabs: Vec<TabRecord> = stmt
                .query_map([], |row| {
                    let last_used_str: String = row.get(5)?;
                    let last_used = DateTime::parse_from_rfc3339(&last_used_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now());
                    let position: i64 = row.get(0)?;

                    Ok(TabRecord {
                        tab_id: row.get(1)?,
                        parent_id: row.get(2)?,
                        url: Some(row.get(3)?),
                        title: row.get(4)?,
                        is_private: false,
                        position: position as usize,
                        last_used,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();

            Ok(tabs)
        })
    }
}

impl PersistenceSink for Database {
    /// Replace the stored strip. Private tabs and tabs that never resolved a
    /// URL are not written.
    fn persist_tabs(&self, tabs: &[TabRecord]) -> Result<()> {
        let stored = self.transaction(|conn| {
            conn.execute("DELETE FROM local_tabs", [])?;

            let mut position: i64 = 0;
            for tab in tabs.iter().filter(|t| !t.is_private) {
                let Some(url) = tab.url.as_deref() else {
                    continue;
                };
                conn.execute(
                    "INSERT INTO local_tabs (position, tab_id, parent_id, url, title, last_used)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        position,
                        tab.tab_id,
                        tab.parent_id,
                        url,
                        tab.title,
                        tab.last_used.to_rfc3339(),
                    ],
                )?;
                position += 1;
            }

            Ok(position)
        })?;

        tracing::debug!(total = tabs.len(), stored, "Persisted local tabs");

        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}
