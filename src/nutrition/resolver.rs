use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::reference::{NutritionRecord, ReferenceFood, ReferenceTable};

pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;
pub const PARTIAL_MATCH_CONFIDENCE: f64 = 0.8;
/// Discount applied to the classifier confidence when no reference food matches.
pub const FALLBACK_CONFIDENCE_FACTOR: f64 = 0.8;

/// Estimate used when a label matches nothing in the reference table.
pub const FALLBACK_RECORD: NutritionRecord = NutritionRecord {
    calories: 200.0,
    protein: 10.0,
    carbs: 25.0,
    fat: 8.0,
    region: None,
};

/// Where the macro values of a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Local,
    #[serde(alias = "ai")]
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Partial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub record: NutritionRecord,
    /// Reference key that matched, `None` for the fallback.
    pub matched: Option<String>,
    pub confidence: f64,
    pub source: Source,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    table: Arc<ReferenceTable>,
}

impl Resolver {
    pub fn new(table: Arc<ReferenceTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    /// Resolve a bare label, as if the classifier were fully certain.
    pub fn resolve(&self, label: &str) -> Resolution {
        self.resolve_scored(label, 1.0)
    }

    /// Resolve a label and scale the match confidence by the classifier's own.
    pub fn resolve_scored(&self, label: &str, classifier_confidence: f64) -> Resolution {
        let classifier_confidence = clamp_unit(classifier_confidence);
        match self.find(label) {
            Some((food, kind)) => {
                let match_confidence = match kind {
                    MatchKind::Exact => EXACT_MATCH_CONFIDENCE,
                    MatchKind::Partial => PARTIAL_MATCH_CONFIDENCE,
                };
                debug!(label, matched = %food.name, ?kind, "reference match");
                Resolution {
                    record: food.record.clone(),
                    matched: Some(food.name.clone()),
                    confidence: match_confidence * classifier_confidence,
                    source: Source::Local,
                }
            }
            None => {
                debug!(label, "no reference match, using fallback estimate");
                Resolution {
                    record: FALLBACK_RECORD,
                    matched: None,
                    confidence: FALLBACK_CONFIDENCE_FACTOR * classifier_confidence,
                    source: Source::Default,
                }
            }
        }
    }

    /// First reference food matching `label`: an exact pass over the whole
    /// table, then a substring pass in either direction, both in table order.
    pub fn find(&self, label: &str) -> Option<(&ReferenceFood, MatchKind)> {
        let normalized = label.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(food) = self.table.get(&normalized) {
            return Some((food, MatchKind::Exact));
        }

        self.table
            .iter()
            .find(|f| normalized.contains(f.name.as_str()) || f.name.contains(normalized.as_str()))
            .map(|food| (food, MatchKind::Partial))
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
