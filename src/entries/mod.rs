mod dto;
pub mod extractors;
pub mod handlers;
mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::sync_routes())
        .merge(handlers::diary_routes())
}
