use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use time::OffsetDateTime;

use super::{EntryStore, FoodEntry, NewEntry, StoreError};

/// Shared, pool-backed store with upsert semantics.
#[derive(Clone)]
pub struct PgEntryStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: String,
    products: Json<Vec<Value>>,
    entry_date: OffsetDateTime,
    has_allergy: bool,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
}

impl From<EntryRow> for FoodEntry {
    fn from(r: EntryRow) -> Self {
        Self {
            id: r.id,
            products: r.products.0,
            entry_date: r.entry_date,
            has_allergy: r.has_allergy,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl PgEntryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn upsert(conn: &mut PgConnection, entry: &NewEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO food_entries (id, products, entry_date, has_allergy)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE SET
            products = EXCLUDED.products,
            entry_date = EXCLUDED.entry_date,
            has_allergy = EXCLUDED.has_allergy,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&entry.id)
    .bind(Json(&entry.products))
    .bind(entry.entry_date)
    .bind(entry.has_allergy)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl EntryStore for PgEntryStore {
    async fn list(&self) -> Result<Vec<FoodEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, products, entry_date, has_allergy, created_at, updated_at
            FROM food_entries
            ORDER BY entry_date DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(FoodEntry::from).collect())
    }

    async fn save(&self, entry: &NewEntry) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        upsert(&mut *conn, entry).await?;
        Ok(())
    }

    async fn sync(&self, entries: &[NewEntry]) -> Result<usize, StoreError> {
        // Rows missing from the payload are left alone.
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            upsert(&mut *tx, entry).await?;
        }
        tx.commit().await?;
        Ok(entries.len())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("DELETE FROM food_entries WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
