use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlConnection},
    types::Json,
    ConnectOptions, Connection, FromRow,
};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tracing::{debug, warn};

use super::{DiaryStoreFactory, EntryStore, FoodEntry, NewEntry, StoreError};
use crate::error::ConfigError;

/// Connection settings carried by the `X-DB-Config` request header.
#[derive(Clone, PartialEq, Deserialize)]
pub struct DbConfig {
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

fn default_port() -> u16 {
    3306
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(p) => Ok(p),
        Port::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl DbConfig {
    pub fn from_header(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| {
            warn!(error = %e, "unparsable database configuration header");
            ConfigError::Malformed
        })
    }

    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Store over a single MySQL connection opened per operation, with
/// insert-only writes and a destructive bulk replace.
pub struct MySqlEntryStore {
    config: DbConfig,
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: String,
    products: Json<Vec<Value>>,
    entry_date: PrimitiveDateTime,
    has_allergy: bool,
    created_at: Option<PrimitiveDateTime>,
}

impl From<EntryRow> for FoodEntry {
    fn from(r: EntryRow) -> Self {
        // the session runs with time_zone = '+00:00'
        Self {
            id: r.id,
            products: r.products.0,
            entry_date: r.entry_date.assume_utc(),
            has_allergy: r.has_allergy,
            created_at: r.created_at.map(PrimitiveDateTime::assume_utc),
            updated_at: None,
        }
    }
}

fn to_utc_datetime(ts: OffsetDateTime) -> PrimitiveDateTime {
    let utc = ts.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

async fn bootstrap(conn: &mut MySqlConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS food_entries (
            id VARCHAR(50) PRIMARY KEY,
            products JSON NOT NULL,
            entry_date DATETIME(3) NOT NULL,
            has_allergy BOOLEAN NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert(conn: &mut MySqlConnection, entry: &NewEntry) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO food_entries (id, products, entry_date, has_allergy)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(Json(&entry.products))
    .bind(to_utc_datetime(entry.entry_date))
    .bind(entry.has_allergy)
    .execute(conn)
    .await
    .map_err(|e| StoreError::on_insert(e, &entry.id))?;
    Ok(())
}

async fn replace_all(conn: &mut MySqlConnection, entries: &[NewEntry]) -> Result<usize, StoreError> {
    let mut tx = conn.begin().await?;
    sqlx::query("DELETE FROM food_entries")
        .execute(&mut *tx)
        .await?;
    for entry in entries {
        insert(&mut *tx, entry).await?;
    }
    tx.commit().await?;
    Ok(entries.len())
}

impl MySqlEntryStore {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }

    async fn open(&self) -> Result<MySqlConnection, StoreError> {
        debug!(host = %self.config.host, database = %self.config.database, "opening mysql connection");
        let mut conn = self.config.connect_options().connect().await?;
        bootstrap(&mut conn).await?;
        Ok(conn)
    }

    /// Gracefully closes the connection; dropping it would also release it.
    async fn release(conn: MySqlConnection) {
        if let Err(e) = conn.close().await {
            warn!(error = %e, "closing mysql connection failed");
        }
    }
}

#[async_trait]
impl EntryStore for MySqlEntryStore {
    async fn list(&self) -> Result<Vec<FoodEntry>, StoreError> {
        let mut conn = self.open().await?;
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, products, entry_date, has_allergy, created_at
            FROM food_entries
            ORDER BY entry_date DESC
            "#,
        )
        .fetch_all(&mut conn)
        .await;
        Self::release(conn).await;
        Ok(rows?.into_iter().map(FoodEntry::from).collect())
    }

    async fn save(&self, entry: &NewEntry) -> Result<(), StoreError> {
        let mut conn = self.open().await?;
        let result = insert(&mut conn, entry).await;
        Self::release(conn).await;
        result
    }

    async fn sync(&self, entries: &[NewEntry]) -> Result<usize, StoreError> {
        let mut conn = self.open().await?;
        let result = replace_all(&mut conn, entries).await;
        Self::release(conn).await;
        result
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.open().await?;
        let result = sqlx::query("DELETE FROM food_entries WHERE id = ?")
            .bind(id)
            .execute(&mut conn)
            .await;
        Self::release(conn).await;
        result?;
        Ok(())
    }
}

/// Hands out a [`MySqlEntryStore`] per request configuration.
#[derive(Clone, Default)]
pub struct MySqlStoreFactory;

impl DiaryStoreFactory for MySqlStoreFactory {
    fn open(&self, config: DbConfig) -> Arc<dyn EntryStore> {
        Arc::new(MySqlEntryStore::new(config))
    }
}
