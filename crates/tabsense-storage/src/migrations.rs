//! Schema migrations
//!
//! The applied version lives in SQLite's `user_version` pragma. Each entry
//! in [`MIGRATIONS`] runs once, in order, inside its own transaction.

use rusqlite::Connection;

use crate::Result;

struct Migration {
    version: i32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "settings store",
    // One JSON document per key; keys are read and written independently
    sql: r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
    "#,
}];

pub fn schema_version(conn: &Connection) -> Result<i32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let current = schema_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_rerunnable() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let latest = MIGRATIONS.last().map(|m| m.version).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), latest);
    }
}
