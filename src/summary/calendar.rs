use serde::Serialize;
use time::{Date, Month, UtcOffset};

use super::aggregate::{goal_met, totals_by_day};
use crate::entries::repo_types::{MacroGoals, ResolvedFoodEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Achieved,
    Missed,
    /// Nothing was tracked that day.
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub day: u8,
    pub date: String,
    pub calories: f64,
    pub status: DayStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u8,
    /// Blank cells before the 1st in a Sunday-first grid.
    pub leading_blanks: u8,
    pub days: Vec<CalendarDay>,
}

/// Goal attainment for every day of `year`-`month`, judged against the
/// current goal.
pub fn month_view(
    entries: &[ResolvedFoodEntry],
    goal: &MacroGoals,
    year: i32,
    month: u8,
    offset: UtcOffset,
) -> Result<CalendarMonth, String> {
    let m = Month::try_from(month).map_err(|_| format!("invalid month {}", month))?;
    let first = Date::from_calendar_date(year, m, 1).map_err(|e| e.to_string())?;
    let totals = totals_by_day(entries, offset);

    let days = (1..=time::util::days_in_year_month(year, m))
        .map(|day| {
            let date = first.replace_day(day).map_err(|e| e.to_string())?;
            let cell = match totals.get(&date) {
                Some(t) => CalendarDay {
                    day,
                    date: date.to_string(),
                    calories: t.calories,
                    status: if goal_met(t, goal) {
                        DayStatus::Achieved
                    } else {
                        DayStatus::Missed
                    },
                },
                None => CalendarDay {
                    day,
                    date: date.to_string(),
                    calories: 0.0,
                    status: DayStatus::None,
                },
            };
            Ok(cell)
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(CalendarMonth {
        year,
        month,
        leading_blanks: first.weekday().number_days_from_sunday(),
        days,
    })
}
