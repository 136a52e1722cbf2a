use serde::{Deserialize, Serialize};

use super::macros::MacroPercentages;
use super::reference::ReferenceFood;
use super::resolver::{Resolution, Source};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodListItem {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub macro_percentages: MacroPercentages,
}

impl From<&ReferenceFood> for FoodListItem {
    fn from(f: &ReferenceFood) -> Self {
        Self {
            name: f.name.clone(),
            calories: f.record.calories,
            protein: f.record.protein,
            carbs: f.record.carbs,
            fat: f.record.fat,
            region: f.record.region.clone(),
            macro_percentages: MacroPercentages::from(&f.record),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FoodList {
    pub version: u32,
    pub foods: Vec<FoodListItem>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
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

impl ResolveResponse {
    pub fn new(label: String, r: Resolution) -> Self {
        let macro_percentages = MacroPercentages::from(&r.record);
        Self {
            label,
            matched: r.matched,
            calories: r.record.calories,
            protein: r.record.protein,
            carbs: r.record.carbs,
            fat: r.record.fat,
            region: r.record.region,
            confidence: r.confidence,
            source: r.source,
            macro_percentages,
        }
    }
}
