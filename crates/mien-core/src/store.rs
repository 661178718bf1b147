//! Repository seam for persisted face records.
//!
//! The core never talks to a database directly; it consumes this trait.
//! Records are immutable once stored — re-registering a name creates a new,
//! independent record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// A stored face: identity label plus the pixel template it was enrolled
/// with. `encoding` length is fixed by the extractor configuration; records
/// that disagree are skipped at match time.
#[derive(Debug, Clone)]
pub struct FaceRecord {
    pub id: i64,
    pub name: String,
    pub encoding: Vec<u8>,
}

/// Metadata of a stored face, without the template payload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFace {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence failure, surfaced verbatim to the caller. Never retried.
#[derive(Error, Debug)]
#[error("storage failure: {0}")]
pub struct StoreError(pub String);

/// Persistent store of face records.
pub trait FaceStore {
    /// Persist a new record; the store assigns `id` and `created_at`.
    fn store(&self, name: &str, encoding: &[u8]) -> Result<StoredFace, StoreError>;

    /// Full snapshot of all records, in insertion order. No pagination.
    fn all_records(&self) -> Result<Vec<FaceRecord>, StoreError>;

    /// Number of stored records.
    fn count(&self) -> Result<u64, StoreError>;

    /// Most recently registered face, if any.
    fn latest(&self) -> Result<Option<StoredFace>, StoreError>;

    /// Up to `limit` most recent registrations, newest first.
    fn recent(&self, limit: u32) -> Result<Vec<StoredFace>, StoreError>;
}
