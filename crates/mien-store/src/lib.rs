//! SQLite-backed implementation of the core's [`FaceStore`] seam.
//!
//! One table, insert + select only. Records are immutable after creation;
//! re-registering a name creates a new row. Concurrent writers from
//! independent processes are serialized by SQLite itself, not by this crate.

use chrono::{DateTime, Utc};
use mien_core::store::{FaceRecord, FaceStore, StoreError, StoredFace};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Explicit repository configuration, passed at construction. There are no
/// fallback paths; the caller decides where records live.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS faces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    encoding BLOB NOT NULL,
    created_at TEXT NOT NULL
)";

/// Face record repository over a single SQLite database.
///
/// The connection is acquired per operation behind a mutex; how connections
/// are managed is invisible to the core.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at the configured path and
    /// ensure the schema exists.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(&config.path).map_err(storage_err)?;
        tracing::debug!(path = %config.path.display(), "face store opened");
        Self::init(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, []).map_err(storage_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError("store connection mutex poisoned".to_string()))
    }
}

impl FaceStore for SqliteStore {
    fn store(&self, name: &str, encoding: &[u8]) -> Result<StoredFace, StoreError> {
        let created_at = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO faces (name, encoding, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![name, encoding, created_at.to_rfc3339()],
        )
        .map_err(storage_err)?;
        let id = conn.last_insert_rowid();
        tracing::info!(id, name, "face encoding stored");
        Ok(StoredFace { id, name: name.to_string(), created_at })
    }

    fn all_records(&self) -> Result<Vec<FaceRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name, encoding FROM faces ORDER BY id")
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FaceRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    encoding: row.get(2)?,
                })
            })
            .map_err(storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM faces", [], |row| row.get(0))
            .map_err(storage_err)?;
        Ok(count as u64)
    }

    fn latest(&self) -> Result<Option<StoredFace>, StoreError> {
        Ok(self.fetch_recent(1)?.into_iter().next())
    }

    fn recent(&self, limit: u32) -> Result<Vec<StoredFace>, StoreError> {
        self.fetch_recent(limit)
    }
}

impl SqliteStore {
    fn fetch_recent(&self, limit: u32) -> Result<Vec<StoredFace>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, created_at FROM faces
                 ORDER BY created_at DESC, id DESC LIMIT ?1",
            )
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([limit], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(storage_err)?;

        let mut faces = Vec::new();
        for row in rows {
            let (id, name, created_at) = row.map_err(storage_err)?;
            let created_at = parse_timestamp(&created_at)?;
            faces.push(StoredFace { id, name, created_at });
        }
        Ok(faces)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError(format!("malformed created_at {raw:?}: {e}")))
}

fn storage_err(e: rusqlite::Error) -> StoreError {
    StoreError(e.to_string())
}
