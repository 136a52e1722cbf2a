use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{FoodList, FoodListItem, ResolveRequest, ResolveResponse};
use crate::{error::AppError, extract::ApiJson, state::AppState};

pub fn food_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", get(list_foods))
        .route("/resolve", post(resolve_label))
}

#[instrument(skip(state))]
pub async fn list_foods(State(state): State<AppState>) -> Json<FoodList> {
    let table = state.resolver.table();
    Json(FoodList {
        version: table.version(),
        foods: table.iter().map(FoodListItem::from).collect(),
    })
}

#[instrument(skip(state, body))]
pub async fn resolve_label(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResolveRequest>,
) -> Result<Json<ResolveResponse>, AppError> {
    let label = body
        .label
        .ok_or_else(|| AppError::BadRequest("No label provided".into()))?;
    let resolution = state.resolver.resolve(&label);
    Ok(Json(ResolveResponse::new(label, resolution)))
}
