use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{AnalyzeResponse, CreatedEntryResponse, ImageRequest, PruneResponse};
use super::repo_types::{MacroGoals, ResolvedFoodEntry};
use super::services;
use crate::summary::aggregate::{entries_on, today};
use crate::{error::AppError, extract::ApiJson, state::AppState};

// --- public routers ---

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries))
        .route("/entries/today", get(today_entries))
        .route("/entries/:id", get(get_entry))
        .route("/goals", get(get_goals).put(put_goals))
        .route("/entries/expired", delete(prune_entries))
}

pub fn write_router(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/analyze-food", post(analyze_food))
        .route("/entries", post(create_entry))
        .layer(DefaultBodyLimit::max(max_image_bytes))
}

// --- handlers ---

/// POST /analyze-food { image } -> nutrition estimate, nothing persisted
#[instrument(skip(state, body))]
pub async fn analyze_food(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ImageRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let analysis = services::analyze(&state, body.image.as_deref()).await?;
    Ok(Json(analysis.into()))
}

/// POST /entries { image } -> classify, resolve and append to the log
#[instrument(skip(state, body))]
pub async fn create_entry(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ImageRequest>,
) -> Result<(StatusCode, HeaderMap, Json<CreatedEntryResponse>), AppError> {
    let submission = services::submit(&state, body.image.as_deref()).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/entries/{}", submission.entry.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(submission.into())))
}

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResolvedFoodEntry>>, AppError> {
    Ok(Json(state.store.list().await?))
}

#[instrument(skip(state))]
pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResolvedFoodEntry>, AppError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest(format!("invalid entry id {:?}", id)))?;
    state
        .store
        .list()
        .await?
        .into_iter()
        .find(|e| e.id == id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("entry {} not found", id)))
}

#[instrument(skip(state))]
pub async fn today_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResolvedFoodEntry>>, AppError> {
    let offset = state.config.utc_offset;
    let entries = state.store.list().await?;
    Ok(Json(entries_on(&entries, today(offset), offset)))
}

#[instrument(skip(state))]
pub async fn get_goals(State(state): State<AppState>) -> Result<Json<MacroGoals>, AppError> {
    Ok(Json(state.store.goal().await?))
}

#[instrument(skip(state))]
pub async fn put_goals(
    State(state): State<AppState>,
    ApiJson(goal): ApiJson<MacroGoals>,
) -> Result<Json<MacroGoals>, AppError> {
    goal.validate().map_err(AppError::BadRequest)?;
    state.store.replace_goal(goal).await?;
    info!(calories = goal.calories, "goals replaced");
    Ok(Json(goal))
}

#[instrument(skip(state))]
pub async fn prune_entries(State(state): State<AppState>) -> Result<Json<PruneResponse>, AppError> {
    let removed = services::prune_expired(&state).await?;
    Ok(Json(PruneResponse { removed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime};

    #[tokio::test]
    async fn prune_drops_entries_outside_retention() {
        let state = AppState::fake();
        let now = OffsetDateTime::now_utc();
        let pizza = state.resolver.resolve("pizza");
        state
            .store
            .append(ResolvedFoodEntry::from_resolution("pizza", &pizza, now - Duration::days(45)))
            .await
            .unwrap();
        state
            .store
            .append(ResolvedFoodEntry::from_resolution("pizza", &pizza, now))
            .await
            .unwrap();

        let Json(resp) = prune_entries(State(state.clone())).await.unwrap();
        assert_eq!(resp.removed, 1);

        let Json(left) = list_entries(State(state.clone())).await.unwrap();
        assert_eq!(left.len(), 1);
        let Json(todays) = today_entries(State(state)).await.unwrap();
        assert_eq!(todays.len(), 1);
    }

    #[tokio::test]
    async fn entry_is_found_by_id() {
        let state = AppState::fake();
        let pizza = state.resolver.resolve("pizza");
        let entry = ResolvedFoodEntry::from_resolution("pizza", &pizza, OffsetDateTime::now_utc());
        state.store.append(entry.clone()).await.unwrap();

        let Json(found) = get_entry(State(state.clone()), Path(entry.id.to_string()))
            .await
            .unwrap();
        assert_eq!(found, entry);

        let missing = get_entry(State(state.clone()), Path(Uuid::new_v4().to_string())).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
        let garbage = get_entry(State(state), Path("not-a-uuid".into())).await;
        assert!(matches!(garbage, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn goals_default_until_replaced() {
        let state = AppState::fake();
        let Json(goal) = get_goals(State(state.clone())).await.unwrap();
        assert_eq!(goal, MacroGoals::default());

        let err = put_goals(
            State(state),
            ApiJson(MacroGoals {
                fat: f64::NAN,
                ..MacroGoals::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
