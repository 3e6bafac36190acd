//! Consecutive-day streak statistics.
//!
//! A streak is the number of consecutive calendar days, ending today or
//! yesterday, that each have at least one study log. Days are compared in the
//! local calendar so a late-evening log never lands on the wrong day.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{StudyLog, DATE_FORMAT};

/// Source of "today" for streak computation.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Reads today's date from the local calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always reports the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Streak summary for one participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakStats {
    pub streak: u32,
    pub total_logs: usize,
}

/// Computes streak statistics from raw `YYYY-MM-DD` date strings.
///
/// Every input counts toward `total_logs`. Duplicate dates extend the streak
/// once, and malformed strings never match a calendar day.
pub fn compute_stats<'a, I>(dates: I, today: NaiveDate) -> StreakStats
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total_logs = 0;
    let mut date_set = HashSet::new();
    for date in dates {
        total_logs += 1;
        date_set.insert(date);
    }

    let has_log = |day: NaiveDate| {
        let formatted = day.format(DATE_FORMAT).to_string();
        date_set.contains(formatted.as_str())
    };

    let mut cursor = if has_log(today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut streak = 0;
    while let Some(day) = cursor.filter(|day| has_log(*day)) {
        streak += 1;
        cursor = day.pred_opt();
    }

    StreakStats { streak, total_logs }
}

/// Streak calculator bound to a clock.
#[derive(Debug, Clone)]
pub struct StreakCalculator<C> {
    clock: C,
}

impl<C: Clock> StreakCalculator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn stats(&self, logs: &[StudyLog]) -> StreakStats {
        compute_stats(logs.iter().map(|log| log.date.as_str()), self.clock.today())
    }
}
