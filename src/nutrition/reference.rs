use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

const BUILTIN_TABLE: &str = include_str!("../../data/reference_foods.json");

/// Calories (kcal) and macros (grams) for one serving of a food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceFood {
    pub name: String,
    #[serde(flatten)]
    pub record: NutritionRecord,
}

#[derive(Debug, Deserialize)]
struct TableAsset {
    version: u32,
    foods: Vec<ReferenceFood>,
}

/// The reference nutrition table. Entries keep their declaration order,
/// which is also the order the resolver tries them in.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    version: u32,
    foods: Vec<ReferenceFood>,
}

impl ReferenceTable {
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_json(BUILTIN_TABLE).context("parse built-in reference table")
    }

    /// Load the table from `path` when given, otherwise the compiled-in asset.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let table = match path {
            Some(p) => {
                let raw = tokio::fs::read_to_string(p)
                    .await
                    .with_context(|| format!("read reference table {}", p.display()))?;
                Self::from_json(&raw)
                    .with_context(|| format!("parse reference table {}", p.display()))?
            }
            None => Self::builtin()?,
        };
        info!(version = table.version, foods = table.len(), "reference table loaded");
        Ok(table)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let asset: TableAsset = serde_json::from_str(raw)?;
        Self::new(asset.version, asset.foods)
    }

    pub fn new(version: u32, foods: Vec<ReferenceFood>) -> anyhow::Result<Self> {
        let mut seen = HashSet::with_capacity(foods.len());
        let mut normalized = Vec::with_capacity(foods.len());
        for mut food in foods {
            food.name = food.name.trim().to_lowercase();
            anyhow::ensure!(!food.name.is_empty(), "reference food with empty name");
            anyhow::ensure!(
                seen.insert(food.name.clone()),
                "duplicate reference food {:?}",
                food.name
            );
            let r = &food.record;
            for (field, v) in [
                ("calories", r.calories),
                ("protein", r.protein),
                ("carbs", r.carbs),
                ("fat", r.fat),
            ] {
                anyhow::ensure!(
                    v.is_finite() && v >= 0.0,
                    "{} of {:?} must be a non-negative number",
                    field,
                    food.name
                );
            }
            normalized.push(food);
        }
        anyhow::ensure!(!normalized.is_empty(), "reference table is empty");
        Ok(Self {
            version,
            foods: normalized,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceFood> {
        self.foods.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceFood> {
        self.foods.iter().find(|f| f.name == name)
    }
}
