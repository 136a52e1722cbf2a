use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use time::{OffsetDateTime, Time};
use tracing::instrument;

use super::aggregate::{daily_totals, entries_on, goal_met, local_day, progress};
use super::calendar::{month_view, CalendarMonth};
use super::dto::{CalendarQuery, DailyProgressResponse};
use super::insights::{insights, Insights};
use crate::{error::AppError, state::AppState};

pub fn summary_routes() -> Router<AppState> {
    Router::new()
        .route("/progress/today", get(today_progress))
        .route("/calendar", get(calendar))
        .route("/insights", get(get_insights))
}

#[instrument(skip(state))]
pub async fn today_progress(
    State(state): State<AppState>,
) -> Result<Json<DailyProgressResponse>, AppError> {
    let offset = state.config.utc_offset;
    let now = OffsetDateTime::now_utc();
    let today = local_day(now, offset);

    let entries = state.store.list().await?;
    let goal = state.store.goal().await?;
    let totals = daily_totals(&entries, today, offset);

    let seconds_left = today
        .next_day()
        .map(|d| (d.with_time(Time::MIDNIGHT).assume_offset(offset) - now).whole_seconds())
        .unwrap_or(0);

    Ok(Json(DailyProgressResponse {
        date: today.to_string(),
        entries: entries_on(&entries, today, offset).len(),
        totals,
        goal,
        progress: progress(&totals, &goal),
        goal_met: goal_met(&totals, &goal),
        seconds_left,
    }))
}

#[instrument(skip(state))]
pub async fn calendar(
    State(state): State<AppState>,
    Query(q): Query<CalendarQuery>,
) -> Result<Json<CalendarMonth>, AppError> {
    let offset = state.config.utc_offset;
    let today = local_day(OffsetDateTime::now_utc(), offset);
    let year = q.year.unwrap_or(today.year());
    let month = q.month.unwrap_or(u8::from(today.month()));

    let entries = state.store.list().await?;
    let goal = state.store.goal().await?;
    let view = month_view(&entries, &goal, year, month, offset).map_err(AppError::BadRequest)?;
    Ok(Json(view))
}

#[instrument(skip(state))]
pub async fn get_insights(State(state): State<AppState>) -> Result<Json<Insights>, AppError> {
    let entries = state.store.list().await?;
    let view = insights(&entries, state.config.utc_offset, &mut rand::thread_rng());
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::repo_types::{MacroGoals, ResolvedFoodEntry};
    use crate::nutrition::Source;
    use crate::summary::calendar::DayStatus;
    use uuid::Uuid;

    fn entry_now(calories: f64) -> ResolvedFoodEntry {
        ResolvedFoodEntry {
            id: Uuid::new_v4(),
            description: "biryani".into(),
            calories,
            protein: 19.0,
            carbs: 25.0,
            fat: 14.0,
            confidence: 1.0,
            source: Source::Local,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn progress_reflects_todays_entries() {
        let state = AppState::fake();
        state.store.append(entry_now(1200.0)).await.unwrap();
        state.store.append(entry_now(900.0)).await.unwrap();

        let Json(p) = today_progress(State(state)).await.unwrap();
        assert_eq!(p.entries, 2);
        assert_eq!(p.totals.calories, 2100.0);
        assert!(p.goal_met);
        assert_eq!(p.progress.calories, 100.0);
        assert!(p.seconds_left > 0 && p.seconds_left <= 86_400);
    }

    #[tokio::test]
    async fn calendar_defaults_to_current_month() {
        let state = AppState::fake();
        state
            .store
            .replace_goal(MacroGoals {
                calories: 5000.0,
                ..MacroGoals::default()
            })
            .await
            .unwrap();
        state.store.append(entry_now(300.0)).await.unwrap();

        let Json(view) = calendar(State(state), Query(CalendarQuery { year: None, month: None }))
            .await
            .unwrap();
        let today = OffsetDateTime::now_utc().date();
        let cell = &view.days[usize::from(today.day()) - 1];
        assert_eq!(cell.status, DayStatus::Missed);
        assert_eq!(cell.calories, 300.0);
    }

    #[tokio::test]
    async fn calendar_rejects_bad_month() {
        let state = AppState::fake();
        let err = calendar(
            State(state),
            Query(CalendarQuery {
                year: Some(2024),
                month: Some(14),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
