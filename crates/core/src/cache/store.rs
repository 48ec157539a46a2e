//! Entry operations on a single named cache.
//!
//! Entries are keyed by request path. Writes are UPSERTs, so concurrent
//! writers to the same path resolve as last write wins.

use crate::cache::hash::body_digest;
use crate::{Error, Response};
use bytes::Bytes;
use tokio_rusqlite::{Connection, params, rusqlite};

/// Handle to one named cache store.
#[derive(Clone, Debug)]
pub struct Cache {
    conn: Connection,
    name: String,
}

/// Stored metadata of a cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub path: String,
    pub status: u16,
    pub body_sha256: String,
    pub stored_at: String,
}

impl Cache {
    pub(crate) fn new(conn: Connection, name: String) -> Self {
        Self { conn, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace the response stored under `path`.
    pub async fn put(&self, path: &str, response: &Response) -> Result<(), Error> {
        let name = self.name.clone();
        let path = path.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let digest = body_digest(&response.body);
        let status = response.status;
        let status_text = response.status_text.clone();
        let body = response.body.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                    cache_name, path, status, status_text, headers_json, body, body_sha256, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(cache_name, path) DO UPDATE SET
                    status = excluded.status,
                    status_text = excluded.status_text,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    body_sha256 = excluded.body_sha256,
                    stored_at = excluded.stored_at",
                    params![name, path, status, status_text, headers_json, body, digest, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored under `path`.
    ///
    /// Returns None if nothing is cached for that path.
    pub async fn match_path(&self, path: &str) -> Result<Option<Response>, Error> {
        let name = self.name.clone();
        let path = path.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                FROM entries WHERE cache_name = ?1 AND path = ?2",
                )?;

                let result = stmt.query_row(params![name, path], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((status, status_text, headers_json, body)) => {
                        let headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(Response { status, status_text, headers, body: Bytes::from(body) }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Metadata for the entry under `path`, if any.
    pub async fn entry(&self, path: &str) -> Result<Option<CachedEntry>, Error> {
        let name = self.name.clone();
        let path = path.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let result = conn.query_row(
                    "SELECT path, status, body_sha256, stored_at FROM entries WHERE cache_name = ?1 AND path = ?2",
                    params![name, path],
                    |row| {
                        Ok(CachedEntry {
                            path: row.get(0)?,
                            status: row.get(1)?,
                            body_sha256: row.get(2)?,
                            stored_at: row.get(3)?,
                        })
                    },
                );

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Every cached path, sorted.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.clone();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT path FROM entries WHERE cache_name = ?1 ORDER BY path ASC")?;
                let paths = stmt
                    .query_map(params![name], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(paths)
            })
            .await
            .map_err(Error::from)
    }
}
