use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    error::ApiError,
    store::{FoodEntry, NewEntry, MAX_ID_LEN},
};

/// Body of POST, and each item of a PUT.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPayload {
    pub id: String,
    #[serde(default)]
    pub products: Vec<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(default)]
    pub has_allergy: bool,
}

impl TryFrom<EntryPayload> for NewEntry {
    type Error = ApiError;

    fn try_from(p: EntryPayload) -> Result<Self, Self::Error> {
        if p.id.trim().is_empty() {
            return Err(ApiError::validation("Missing entry ID"));
        }
        if p.id.chars().count() > MAX_ID_LEN {
            return Err(ApiError::validation(format!(
                "Entry ID longer than {} characters",
                MAX_ID_LEN
            )));
        }
        Ok(Self {
            id: p.id,
            products: p.products,
            entry_date: p.date.to_offset(UtcOffset::UTC),
            has_allergy: p.has_allergy,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub entries: Vec<EntryPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: String,
    pub products: Vec<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub has_allergy: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<FoodEntry> for EntryView {
    fn from(e: FoodEntry) -> Self {
        Self {
            id: e.id,
            products: e.products,
            date: e.entry_date,
            has_allergy: e.has_allergy,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub entries: Vec<EntryView>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct SyncedResponse {
    pub success: bool,
    pub synced: usize,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
}
