use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;

use crate::{
    entries::{
        dto::{CreatedResponse, DeletedResponse, EntriesResponse, SyncedResponse},
        extractors::DiaryStore,
        services,
    },
    error::ApiError,
    state::AppState,
};

/// Upsert surface backed by the shared Postgres store.
pub fn sync_routes() -> Router<AppState> {
    Router::new().route(
        "/sync",
        get(list_synced)
            .post(save_synced)
            .put(sync_synced)
            .delete(delete_synced)
            .fallback(method_not_allowed),
    )
}

/// Insert/replace surface backed by the MySQL database named in `X-DB-Config`.
pub fn diary_routes() -> Router<AppState> {
    Router::new().route(
        "/food-diary",
        get(list_diary)
            .post(save_diary)
            .put(replace_diary)
            .delete(delete_diary)
            .fallback(method_not_allowed),
    )
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

// --- sync ---

#[instrument(skip(state))]
pub async fn list_synced(
    State(state): State<AppState>,
) -> Result<Json<EntriesResponse>, ApiError> {
    services::list_entries(state.entries.as_ref()).await.map(Json)
}

#[instrument(skip(state, body))]
pub async fn save_synced(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let created = services::create_entry(state.entries.as_ref(), &body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, body))]
pub async fn sync_synced(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SyncedResponse>, ApiError> {
    services::sync_entries(state.entries.as_ref(), &body).await.map(Json)
}

#[instrument(skip(state))]
pub async fn delete_synced(
    State(state): State<AppState>,
    Query(mut params): Query<HashMap<String, String>>,
) -> Result<Json<DeletedResponse>, ApiError> {
    services::delete_entry(state.entries.as_ref(), params.remove("id")).await.map(Json)
}

// --- food diary ---

#[instrument(skip(store))]
pub async fn list_diary(
    DiaryStore(store): DiaryStore,
) -> Result<Json<EntriesResponse>, ApiError> {
    services::list_entries(store.as_ref()).await.map(Json)
}

#[instrument(skip(store, body))]
pub async fn save_diary(
    DiaryStore(store): DiaryStore,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let created = services::create_entry(store.as_ref(), &body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Deletes every stored entry before inserting the payload.
#[instrument(skip(store, body))]
pub async fn replace_diary(
    DiaryStore(store): DiaryStore,
    body: Bytes,
) -> Result<Json<SyncedResponse>, ApiError> {
    services::sync_entries(store.as_ref(), &body).await.map(Json)
}

#[instrument(skip(store))]
pub async fn delete_diary(
    DiaryStore(store): DiaryStore,
    Query(mut params): Query<HashMap<String, String>>,
) -> Result<Json<DeletedResponse>, ApiError> {
    services::delete_entry(store.as_ref(), params.remove("id")).await.map(Json)
}
