pub mod aggregate;
pub mod calendar;
mod dto;
pub mod handlers;
pub mod insights;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::summary_routes())
}
