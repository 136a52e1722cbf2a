use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use time::{UtcOffset, Weekday};

use super::aggregate::local_day;
use crate::entries::repo_types::ResolvedFoodEntry;

const WEEKEND_FACTOR: f64 = 1.2;
const RECENT_MEALS: usize = 3;

pub const WEEKEND_HEAVY: &str = "You tend to consume more calories on weekends. \
Consider meal prepping for weekends to stay on track!";
pub const CONSISTENT: &str = "Your calorie intake is fairly consistent throughout the week. \
Great job maintaining consistency!";

pub const NEED_PROTEIN: &str =
    "Consider adding a protein-rich meal like grilled chicken or fish with vegetables.";
pub const NEED_CARBS: &str =
    "You might benefit from complex carbs like quinoa or sweet potatoes in your next meal.";
pub const NEED_FAT: &str = "Try adding healthy fats like avocado or nuts to balance your macros.";
pub const BALANCED: &str = "Your recent meals are well-balanced! Keep up the good work!";

const FACTS: &[&str] = &[
    "The word 'protein' comes from the Greek 'protos', meaning 'first', a nod to its place in nutrition.",
    "Carbohydrates are your brain's preferred source of energy.",
    "Your body can store enough carbohydrates to fuel about 2,000 calories of physical activity.",
    "Healthy fats are needed to absorb vitamins A, D, E and K.",
    "The body can only store protein for a short time, which is why regular intake matters.",
];

#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub pattern: Option<&'static str>,
    pub suggestion: Option<&'static str>,
    pub fact: &'static str,
}

pub fn insights<R: Rng + ?Sized>(
    entries: &[ResolvedFoodEntry],
    offset: UtcOffset,
    rng: &mut R,
) -> Insights {
    Insights {
        pattern: meal_pattern(entries, offset),
        suggestion: next_meal(entries),
        fact: FACTS.choose(rng).copied().unwrap_or(FACTS[0]),
    }
}

/// Compares the average calories per weekend entry with the weekday average.
pub fn meal_pattern(entries: &[ResolvedFoodEntry], offset: UtcOffset) -> Option<&'static str> {
    if entries.is_empty() {
        return None;
    }

    let (mut weekend, mut weekday) = ((0.0, 0usize), (0.0, 0usize));
    for e in entries {
        let bucket = match local_day(e.timestamp, offset).weekday() {
            Weekday::Saturday | Weekday::Sunday => &mut weekend,
            _ => &mut weekday,
        };
        bucket.0 += e.calories;
        bucket.1 += 1;
    }

    if weekend.1 == 0 || weekday.1 == 0 {
        return Some(CONSISTENT);
    }
    let weekend_avg = weekend.0 / weekend.1 as f64;
    let weekday_avg = weekday.0 / weekday.1 as f64;
    if weekend_avg > weekday_avg * WEEKEND_FACTOR {
        Some(WEEKEND_HEAVY)
    } else {
        Some(CONSISTENT)
    }
}

/// Looks at the last few entries in log order and points at the weakest macro.
pub fn next_meal(entries: &[ResolvedFoodEntry]) -> Option<&'static str> {
    if entries.is_empty() {
        return None;
    }
    let recent = &entries[entries.len().saturating_sub(RECENT_MEALS)..];
    let protein: f64 = recent.iter().map(|e| e.protein).sum();
    let carbs: f64 = recent.iter().map(|e| e.carbs).sum();
    let fat: f64 = recent.iter().map(|e| e.fat).sum();

    Some(if protein < 50.0 {
        NEED_PROTEIN
    } else if carbs < 100.0 {
        NEED_CARBS
    } else if fat < 30.0 {
        NEED_FAT
    } else {
        BALANCED
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::Source;
    use rand::{rngs::StdRng, SeedableRng};
    use time::macros::datetime;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn entry(ts: OffsetDateTime, kcal: f64, p: f64, c: f64, f: f64) -> ResolvedFoodEntry {
        ResolvedFoodEntry {
            id: Uuid::new_v4(),
            description: "meal".into(),
            calories: kcal,
            protein: p,
            carbs: c,
            fat: f,
            confidence: 1.0,
            source: Source::Local,
            timestamp: ts,
        }
    }

    // 2024-12-07 is a Saturday, 2024-12-09 a Monday
    const SAT: OffsetDateTime = datetime!(2024-12-07 12:00 UTC);
    const MON: OffsetDateTime = datetime!(2024-12-09 12:00 UTC);

    #[test]
    fn empty_log_has_only_a_fact() {
        let mut rng = StdRng::seed_from_u64(7);
        let i = insights(&[], UtcOffset::UTC, &mut rng);
        assert!(i.pattern.is_none());
        assert!(i.suggestion.is_none());
        assert!(FACTS.contains(&i.fact));
    }

    #[test]
    fn heavy_weekends_are_flagged() {
        let entries = vec![entry(SAT, 900.0, 0.0, 0.0, 0.0), entry(MON, 500.0, 0.0, 0.0, 0.0)];
        assert_eq!(meal_pattern(&entries, UtcOffset::UTC), Some(WEEKEND_HEAVY));

        let entries = vec![entry(SAT, 550.0, 0.0, 0.0, 0.0), entry(MON, 500.0, 0.0, 0.0, 0.0)];
        assert_eq!(meal_pattern(&entries, UtcOffset::UTC), Some(CONSISTENT));
    }

    #[test]
    fn one_sided_week_is_consistent() {
        let entries = vec![entry(MON, 3000.0, 0.0, 0.0, 0.0)];
        assert_eq!(meal_pattern(&entries, UtcOffset::UTC), Some(CONSISTENT));
    }

    #[test]
    fn suggestion_uses_last_three_entries() {
        let heavy = entry(MON, 0.0, 100.0, 200.0, 50.0);
        let light = entry(MON, 0.0, 20.0, 40.0, 12.0);

        assert_eq!(next_meal(&[light.clone()]), Some(NEED_PROTEIN));
        // the early heavy entry is outside the window
        let log = vec![heavy.clone(), light.clone(), light.clone(), light.clone()];
        assert_eq!(next_meal(&log), Some(NEED_PROTEIN));

        let protein_ok = entry(MON, 0.0, 60.0, 50.0, 40.0);
        assert_eq!(next_meal(&[protein_ok]), Some(NEED_CARBS));
        let fat_low = entry(MON, 0.0, 60.0, 150.0, 10.0);
        assert_eq!(next_meal(&[fat_low]), Some(NEED_FAT));
        assert_eq!(next_meal(&[heavy]), Some(BALANCED));
    }
}
