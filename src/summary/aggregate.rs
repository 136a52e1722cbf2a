//! Pure aggregation over the entry log.
//!
//! Macro values are summed as integer thousandths so that totals are the
//! same for any ordering of the input.

use std::collections::BTreeMap;

use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::entries::repo_types::{MacroGoals, ResolvedFoodEntry};

const SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MilliTotals {
    calories: i64,
    protein: i64,
    carbs: i64,
    fat: i64,
}

impl MilliTotals {
    fn add(&mut self, e: &ResolvedFoodEntry) {
        self.calories += to_milli(e.calories);
        self.protein += to_milli(e.protein);
        self.carbs += to_milli(e.carbs);
        self.fat += to_milli(e.fat);
    }

    fn finish(self) -> DailyTotals {
        DailyTotals {
            calories: self.calories as f64 / SCALE,
            protein: self.protein as f64 / SCALE,
            carbs: self.carbs as f64 / SCALE,
            fat: self.fat as f64 / SCALE,
        }
    }
}

fn to_milli(v: f64) -> i64 {
    if v.is_finite() {
        (v * SCALE).round() as i64
    } else {
        0
    }
}

/// Calendar day of `ts` in the user's local time.
pub fn local_day(ts: OffsetDateTime, offset: UtcOffset) -> Date {
    ts.to_offset(offset).date()
}

pub fn today(offset: UtcOffset) -> Date {
    local_day(OffsetDateTime::now_utc(), offset)
}

pub fn entries_on(
    entries: &[ResolvedFoodEntry],
    day: Date,
    offset: UtcOffset,
) -> Vec<ResolvedFoodEntry> {
    entries
        .iter()
        .filter(|e| local_day(e.timestamp, offset) == day)
        .cloned()
        .collect()
}

pub fn daily_totals(entries: &[ResolvedFoodEntry], day: Date, offset: UtcOffset) -> DailyTotals {
    let mut acc = MilliTotals::default();
    for e in entries.iter().filter(|e| local_day(e.timestamp, offset) == day) {
        acc.add(e);
    }
    acc.finish()
}

pub fn totals_by_day(entries: &[ResolvedFoodEntry], offset: UtcOffset) -> BTreeMap<Date, DailyTotals> {
    let mut days: BTreeMap<Date, MilliTotals> = BTreeMap::new();
    for e in entries {
        days.entry(local_day(e.timestamp, offset)).or_default().add(e);
    }
    days.into_iter().map(|(d, t)| (d, t.finish())).collect()
}

pub fn goal_met(totals: &DailyTotals, goal: &MacroGoals) -> bool {
    totals.calories >= goal.calories
}

/// Progress towards each goal, capped at 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

pub fn progress(totals: &DailyTotals, goal: &MacroGoals) -> Progress {
    let pct = |current: f64, target: f64| {
        if target > 0.0 {
            (current / target * 100.0).min(100.0)
        } else {
            0.0
        }
    };
    Progress {
        calories: pct(totals.calories, goal.calories),
        protein: pct(totals.protein, goal.protein),
        carbs: pct(totals.carbs, goal.carbs),
        fat: pct(totals.fat, goal.fat),
    }
}
