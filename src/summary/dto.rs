use serde::{Deserialize, Serialize};

use super::aggregate::{DailyTotals, Progress};
use crate::entries::repo_types::MacroGoals;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgressResponse {
    pub date: String,
    pub entries: usize,
    pub totals: DailyTotals,
    pub goal: MacroGoals,
    pub progress: Progress,
    pub goal_met: bool,
    /// Seconds until the local day rolls over.
    pub seconds_left: i64,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u8>,
}
