mod dto;
pub mod handlers;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::read_router())
        .merge(handlers::write_router(max_image_bytes))
}
