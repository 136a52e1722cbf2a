use serde::Serialize;

use super::reference::NutritionRecord;

pub const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
pub const KCAL_PER_GRAM_CARBS: f64 = 4.0;
pub const KCAL_PER_GRAM_FAT: f64 = 9.0;

/// Share of energy contributed by each macro, as rounded whole percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacroPercentages {
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

impl MacroPercentages {
    pub fn from_grams(protein: f64, carbs: f64, fat: f64) -> Self {
        let protein_kcal = protein.max(0.0) * KCAL_PER_GRAM_PROTEIN;
        let carbs_kcal = carbs.max(0.0) * KCAL_PER_GRAM_CARBS;
        let fat_kcal = fat.max(0.0) * KCAL_PER_GRAM_FAT;
        let total = protein_kcal + carbs_kcal + fat_kcal;

        if !(total.is_finite() && total > 0.0) {
            return Self {
                protein: 0,
                carbs: 0,
                fat: 0,
            };
        }

        let pct = |kcal: f64| (kcal / total * 100.0).round() as u32;
        Self {
            protein: pct(protein_kcal),
            carbs: pct(carbs_kcal),
            fat: pct(fat_kcal),
        }
    }

    pub fn sum(&self) -> u32 {
        self.protein + self.carbs + self.fat
    }
}

impl From<&NutritionRecord> for MacroPercentages {
    fn from(r: &NutritionRecord) -> Self {
        Self::from_grams(r.protein, r.carbs, r.fat)
    }
}
