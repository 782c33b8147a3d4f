//! Persistence for food diary entries.
//!
//! Handlers talk to an [`EntryStore`]; the backing database decides the write
//! policy. The Postgres store upserts, the MySQL store inserts and replaces.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

#[cfg(test)]
pub mod memory;
pub mod mysql;
pub mod postgres;

pub use mysql::DbConfig;

/// Maximum length of an entry id, matching the `VARCHAR(50)` key column.
pub const MAX_ID_LEN: usize = 50;

/// A stored entry as read back from `food_entries`.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodEntry {
    pub id: String,
    pub products: Vec<Value>,
    pub entry_date: OffsetDateTime,
    pub has_allergy: bool,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

/// Caller-supplied fields of an entry, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub id: String,
    pub products: Vec<Value>,
    pub entry_date: OffsetDateTime,
    pub has_allergy: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry {0} already exists")]
    DuplicateId(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Classifies an insert failure, singling out primary key collisions.
    pub(crate) fn on_insert(err: sqlx::Error, id: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateId(id.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// All entries, newest `entry_date` first.
    async fn list(&self) -> Result<Vec<FoodEntry>, StoreError>;

    /// Writes a single entry (insert or upsert, depending on the store).
    async fn save(&self, entry: &NewEntry) -> Result<(), StoreError>;

    /// Applies a client's full entry set and returns how many were written.
    async fn sync(&self, entries: &[NewEntry]) -> Result<usize, StoreError>;

    /// Removes an entry. Unknown ids are not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Builds a store for connection settings that arrive with each request.
pub trait DiaryStoreFactory: Send + Sync {
    fn open(&self, config: DbConfig) -> Arc<dyn EntryStore>;
}
