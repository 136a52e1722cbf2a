use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::{Resolution, Source};

/// Namespace for ids derived from legacy entries that were stored without one.
const LEGACY_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6e75_7472_696c_656e_735f_656e_7472_7900);

/// One tracked food, as persisted in the entry log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredEntry")]
pub struct ResolvedFoodEntry {
    pub id: Uuid,
    pub description: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub confidence: f64,
    pub source: Source,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// On-disk form; older logs have no `id`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    id: Option<Uuid>,
    description: String,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    confidence: f64,
    source: Source,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

impl From<StoredEntry> for ResolvedFoodEntry {
    fn from(e: StoredEntry) -> Self {
        // same content, same id, on every read
        let id = e.id.unwrap_or_else(|| {
            let name = format!(
                "{}|{}|{}",
                e.timestamp.unix_timestamp_nanos(),
                e.description,
                e.calories
            );
            Uuid::new_v5(&LEGACY_ID_NAMESPACE, name.as_bytes())
        });
        Self {
            id,
            description: e.description,
            calories: e.calories,
            protein: e.protein,
            carbs: e.carbs,
            fat: e.fat,
            confidence: e.confidence,
            source: e.source,
            timestamp: e.timestamp,
        }
    }
}

impl ResolvedFoodEntry {
    pub fn from_resolution(
        description: impl Into<String>,
        resolution: &Resolution,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            calories: resolution.record.calories,
            protein: resolution.record.protein,
            carbs: resolution.record.carbs,
            fat: resolution.record.fat,
            confidence: resolution.confidence,
            source: resolution.source,
            timestamp,
        }
    }
}

/// Daily targets. Replaced as a whole value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroGoals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Default for MacroGoals {
    fn default() -> Self {
        Self {
            calories: 2000.0,
            protein: 150.0,
            carbs: 250.0,
            fat: 70.0,
        }
    }
}

impl MacroGoals {
    pub fn validate(&self) -> Result<(), String> {
        for (field, v) in [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("{} must be a non-negative number", field));
            }
        }
        Ok(())
    }
}
