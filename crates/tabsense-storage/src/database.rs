//! Database connection and settings operations

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

/// Settings store shared by every component that persists state.
/// Clones share one connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        // WAL mode so a reader never waits on the engine's writes
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        tracing::debug!(path = %path.display(), "Opened settings database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        run_migrations(&mut conn)?;
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

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?)
        })
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().timestamp_millis();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, updated_at],
            )?;
            Ok(())
        })
    }

    pub fn remove_setting(&self, key: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let removed = conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
            Ok(removed > 0)
        })
    }

    /// Read a JSON-encoded setting. Absent keys yield `None`; a value that
    /// does not decode as `T` is an error.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_setting(key)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(Into::into)
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_setting(key, &serde_json::to_string(value)?)?;
        tracing::debug!(key, "Persisted setting");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AUTO_CLEAN_KEY, FOCUS_STATE_KEY};

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let count: i32 =
                conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_absent_keys_read_as_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_setting(AUTO_CLEAN_KEY).unwrap().is_none());
        assert!(db.get_json::<bool>(FOCUS_STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_json_setting() {
        let db = Database::open_in_memory().unwrap();

        db.set_json(AUTO_CLEAN_KEY, &true).unwrap();
        assert_eq!(db.get_json::<bool>(AUTO_CLEAN_KEY).unwrap(), Some(true));

        // Overwrite keeps a single row
        db.set_json(AUTO_CLEAN_KEY, &false).unwrap();
        assert_eq!(db.get_json::<bool>(AUTO_CLEAN_KEY).unwrap(), Some(false));
        db.with_connection(|conn| {
            let rows: i64 = conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
            assert_eq!(rows, 1);
            Ok(())
        })
        .unwrap();

        assert!(db.remove_setting(AUTO_CLEAN_KEY).unwrap());
        assert!(!db.remove_setting(AUTO_CLEAN_KEY).unwrap());
        assert!(db.get_setting(AUTO_CLEAN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_json_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting(AUTO_CLEAN_KEY, "not json").unwrap();
        assert!(db.get_json::<bool>(AUTO_CLEAN_KEY).is_err());
    }

    #[test]
    fn test_clones_share_connection() {
        let db = Database::open_in_memory().unwrap();
        let other = db.clone();
        db.set_setting("k", "v").unwrap();
        assert_eq!(other.get_setting("k").unwrap().as_deref(), Some("v"));
    }
}
