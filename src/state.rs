use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::store::{mysql::MySqlStoreFactory, postgres::PgEntryStore, DiaryStoreFactory, EntryStore};

#[derive(Clone)]
pub struct AppState {
    /// Process-wide store for the sync surface.
    pub entries: Arc<dyn EntryStore>,
    /// Opens a store per request for the food diary surface.
    pub diary: Arc<dyn DiaryStoreFactory>,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        Ok(Self::from_parts(
            Arc::new(PgEntryStore::new(db)),
            Arc::new(MySqlStoreFactory),
        ))
    }

    pub fn from_parts(entries: Arc<dyn EntryStore>, diary: Arc<dyn DiaryStoreFactory>) -> Self {
        Self { entries, diary }
    }
}
