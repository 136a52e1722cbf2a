use serde::{Deserialize, Serialize};

use super::repo_types::ResolvedFoodEntry;
use super::services::{Analysis, Submission};
use crate::nutrition::{MacroPercentages, Source};
use crate::summary::aggregate::DailyTotals;

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub image: Option<String>,
}

/// Success body of the classifier boundary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub description: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub confidence: f64,
    pub source: Source,
    pub macro_percentages: MacroPercentages,
}

impl From<Analysis> for AnalyzeResponse {
    fn from(a: Analysis) -> Self {
        let macro_percentages = MacroPercentages::from(&a.resolution.record);
        let record = a.resolution.record;
        Self {
            description: a.classification.label,
            calories: record.calories,
            protein: record.protein,
            carbs: record.carbs,
            fat: record.fat,
            region: record.region,
            confidence: a.resolution.confidence,
            source: a.resolution.source,
            macro_percentages,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEntryResponse {
    pub entry: ResolvedFoodEntry,
    pub macro_percentages: MacroPercentages,
    pub totals: DailyTotals,
    pub goal_met: bool,
}

impl From<Submission> for CreatedEntryResponse {
    fn from(s: Submission) -> Self {
        let macro_percentages =
            MacroPercentages::from_grams(s.entry.protein, s.entry.carbs, s.entry.fat);
        Self {
            entry: s.entry,
            macro_percentages,
            totals: s.totals,
            goal_met: s.goal_met,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PruneResponse {
    pub removed: usize,
}
