use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use super::{DbConfig, DiaryStoreFactory, EntryStore, FoodEntry, NewEntry, StoreError};

/// How writes behave, mirroring the two database-backed stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Insert-only saves; bulk sync replaces the whole table.
    Replace,
    /// Upserts everywhere; bulk sync keeps rows not in the payload.
    Merge,
}

pub struct MemoryStore {
    policy: WritePolicy,
    rows: Mutex<HashMap<String, FoodEntry>>,
}

impl MemoryStore {
    pub fn new(policy: WritePolicy) -> Self {
        Self {
            policy,
            rows: Mutex::new(HashMap::new()),
        }
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<String, FoodEntry>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply(&self, rows: &mut HashMap<String, FoodEntry>, entry: &NewEntry) -> Result<(), StoreError> {
        let now = OffsetDateTime::now_utc();
        if let Some(existing) = rows.get_mut(&entry.id) {
            if self.policy == WritePolicy::Replace {
                return Err(StoreError::DuplicateId(entry.id.clone()));
            }
            existing.products = entry.products.clone();
            existing.entry_date = entry.entry_date;
            existing.has_allergy = entry.has_allergy;
            existing.updated_at = Some(match existing.updated_at {
                // keep updated_at strictly monotonic for back-to-back writes
                Some(prev) if prev >= now => prev + Duration::microseconds(1),
                _ => now,
            });
            return Ok(());
        }
        rows.insert(
            entry.id.clone(),
            FoodEntry {
                id: entry.id.clone(),
                products: entry.products.clone(),
                entry_date: entry.entry_date,
                has_allergy: entry.has_allergy,
                created_at: Some(now),
                updated_at: (self.policy == WritePolicy::Merge).then_some(now),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn list(&self) -> Result<Vec<FoodEntry>, StoreError> {
        let mut entries: Vec<FoodEntry> = self.rows().values().cloned().collect();
        entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
        Ok(entries)
    }

    async fn save(&self, entry: &NewEntry) -> Result<(), StoreError> {
        let mut rows = self.rows();
        self.apply(&mut rows, entry)
    }

    async fn sync(&self, entries: &[NewEntry]) -> Result<usize, StoreError> {
        let mut rows = self.rows();
        // staged copy, committed only when every entry applies
        let mut staged = match self.policy {
            WritePolicy::Replace => HashMap::new(),
            WritePolicy::Merge => rows.clone(),
        };
        for entry in entries {
            self.apply(&mut staged, entry)?;
        }
        *rows = staged;
        Ok(entries.len())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.rows().remove(id);
        Ok(())
    }
}

/// Factory that counts how often a per-request store was opened.
pub struct MemoryStoreFactory {
    store: Arc<MemoryStore>,
    opened: AtomicUsize,
}

impl MemoryStoreFactory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl DiaryStoreFactory for MemoryStoreFactory {
    fn open(&self, _config: DbConfig) -> Arc<dyn EntryStore> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn entry(id: &str, products: serde_json::Value) -> NewEntry {
        NewEntry {
            id: id.into(),
            products: products.as_array().cloned().unwrap_or_default(),
            entry_date: datetime!(2024-05-01 12:00 UTC),
            has_allergy: false,
        }
    }

    #[tokio::test]
    async fn replace_policy_rejects_duplicate_ids() {
        let store = MemoryStore::new(WritePolicy::Replace);
        store.save(&entry("a", json!(["milk"]))).await.unwrap();
        let err = store.save(&entry("a", json!(["eggs"]))).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == "a"));
    }

    #[tokio::test]
    async fn failed_sync_leaves_rows_untouched() {
        let store = MemoryStore::new(WritePolicy::Replace);
        store.save(&entry("x", json!([]))).await.unwrap();
        let dup = [entry("a", json!([])), entry("a", json!([]))];
        assert!(store.sync(&dup).await.is_err());

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["x".to_string()]);
    }
}
