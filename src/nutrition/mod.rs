mod dto;
pub mod handlers;
pub mod macros;
pub mod reference;
pub mod resolver;

use crate::state::AppState;
use axum::Router;

pub use macros::MacroPercentages;
pub use reference::{NutritionRecord, ReferenceFood, ReferenceTable};
pub use resolver::{Resolution, Resolver, Source};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::food_routes())
}
