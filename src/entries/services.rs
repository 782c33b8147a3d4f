use serde::de::DeserializeOwned;
use tracing::info;

use crate::{
    entries::dto::{
        CreatedResponse, DeletedResponse, EntriesResponse, EntryPayload, EntryView,
        SyncRequest, SyncedResponse,
    },
    error::ApiError,
    store::{EntryStore, NewEntry},
};

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::validation(format!("Invalid request body: {}", e)))
}

pub async fn list_entries(store: &dyn EntryStore) -> Result<EntriesResponse, ApiError> {
    let entries = store.list().await?;
    Ok(EntriesResponse {
        entries: entries.into_iter().map(EntryView::from).collect(),
    })
}

pub async fn create_entry(store: &dyn EntryStore, body: &[u8]) -> Result<CreatedResponse, ApiError> {
    let payload: EntryPayload = parse_body(body)?;
    let entry = NewEntry::try_from(payload)?;
    store.save(&entry).await?;
    info!(id = %entry.id, products = entry.products.len(), "entry saved");
    Ok(CreatedResponse {
        success: true,
        id: entry.id,
    })
}

pub async fn sync_entries(store: &dyn EntryStore, body: &[u8]) -> Result<SyncedResponse, ApiError> {
    let request: SyncRequest = parse_body(body)?;
    let entries = request
        .entries
        .into_iter()
        .map(NewEntry::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let synced = store.sync(&entries).await?;
    info!(synced, "entries synced");
    Ok(SyncedResponse {
        success: true,
        synced,
    })
}

pub async fn delete_entry(store: &dyn EntryStore, id: Option<String>) -> Result<DeletedResponse, ApiError> {
    let id = id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("Missing entry ID"))?;
    store.delete(&id).await?;
    info!(%id, "entry deleted");
    Ok(DeletedResponse { success: true })
}
