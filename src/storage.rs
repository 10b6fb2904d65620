use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;

/// String-keyed persistent store. Values are read whole and written whole.
pub struct PrefsStore {
    conn: Connection,
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

impl PrefsStore {
    pub fn open(path: &Path) -> Result<Self> {
        ensure_dir(path)?;
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS prefs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM prefs WHERE key = ?1")?;
        let value = stmt
            .query_row(params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO prefs (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value=excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Makes every later write fail, for exercising rollback paths.
    #[cfg(test)]
    pub(crate) fn reject_writes(&self) {
        self.conn
            .execute_batch("PRAGMA query_only = ON;")
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let store = PrefsStore::open_in_memory().unwrap();
        assert_eq!(store.get("callersList").unwrap(), None);
    }

    #[test]
    fn put_overwrites_previous_value() {
        let store = PrefsStore::open_in_memory().unwrap();
        store.put("k", "one").unwrap();
        store.put("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.sqlite");
        {
            let store = PrefsStore::open(&path).unwrap();
            store.put("callersList", "[]").unwrap();
        }
        let store = PrefsStore::open(&path).unwrap();
        assert_eq!(store.get("callersList").unwrap().as_deref(), Some("[]"));
    }
}
