//! Schema migrations for the cache database.

use super::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

/// Ordered schema steps, each applied once inside its own transaction.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_caches.sql"))];

fn schema_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )?;
    let version = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;
    Ok(version)
}

/// Bring the schema up to date.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current = schema_version(conn)?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("step {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version, "applied cache schema migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn count(conn: &Connection, sql: &'static str) -> i64 {
        conn.call(move |conn| conn.query_row(sql, [], |row| row.get(0)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rerun_is_noop() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let tables = count(
            &conn,
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('caches', 'entries')",
        )
        .await;
        assert_eq!(tables, 2);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM _migrations").await, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_entries_cascade_with_cache() {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| conn.execute_batch("PRAGMA foreign_keys=ON;")).await.unwrap();
        run(&conn).await.unwrap();

        conn.call(|conn| {
            conn.execute_batch(
                "INSERT INTO caches (name, created_at) VALUES ('hngr-v1', 'now');
                 INSERT INTO entries (cache_name, path, status, status_text, headers_json, body, body_sha256, stored_at)
                 VALUES ('hngr-v1', '/', 200, 'OK', '[]', x'', '', 'now');
                 DELETE FROM caches WHERE name = 'hngr-v1';",
            )
        })
        .await
        .unwrap();

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM entries").await, 0);
    }
}
