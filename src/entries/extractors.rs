use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{
    error::{ApiError, ConfigError},
    state::AppState,
    store::{DbConfig, EntryStore},
};

/// Header carrying the diary database settings as a JSON object.
pub const DB_CONFIG_HEADER: &str = "x-db-config";

/// Store opened from the request's `X-DB-Config` header.
pub struct DiaryStore(pub Arc<dyn EntryStore>);

#[async_trait]
impl FromRequestParts<AppState> for DiaryStore {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // header names are case-insensitive
        let raw = parts
            .headers
            .get(DB_CONFIG_HEADER)
            .ok_or(ConfigError::Missing)?
            .to_str()
            .map_err(|_| ConfigError::Malformed)?;

        let config = DbConfig::from_header(raw)?;
        Ok(DiaryStore(state.diary.open(config)))
    }
}
