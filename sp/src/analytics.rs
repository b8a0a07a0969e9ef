//! Dashboard statistics over the task collection

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, TimeDelta, Timelike};

use crate::domain::{Category, Priority, Task};

/// Window for upcoming deadlines
const UPCOMING_DAYS: i64 = 3;

/// Summary numbers for `sp stats`
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    /// Completed share, rounded to a whole percent
    pub completion_rate: u32,
    /// Scheduled hours per category, rounded to one decimal
    pub hours_by_category: BTreeMap<Category, f64>,
    /// Task count per priority, high first
    pub tasks_by_priority: Vec<(Priority, usize)>,
    /// Incomplete tasks ending within the next three days, soonest first
    pub upcoming: Vec<Task>,
    /// For each local hour of the day, how many tasks touch it
    pub busy_hours: [usize; 24],
}

impl TaskStats {
    /// Hour with the most tasks, if any task exists
    pub fn busiest_hour(&self) -> Option<usize> {
        let (hour, count) = self
            .busy_hours
            .iter()
            .enumerate()
            .max_by_key(|(hour, count)| (**count, std::cmp::Reverse(*hour)))?;
        (*count > 0).then_some(hour)
    }
}

/// Compute statistics as seen at `now` (its offset defines local hours)
pub fn compute(tasks: &[Task], now: DateTime<FixedOffset>) -> TaskStats {
    let offset = *now.offset();

    let mut hours_by_category: BTreeMap<Category, f64> = BTreeMap::new();
    for task in tasks {
        let hours = task.duration().num_seconds() as f64 / 3600.0;
        *hours_by_category.entry(task.category).or_default() += hours;
    }
    for hours in hours_by_category.values_mut() {
        *hours = (*hours * 10.0).round() / 10.0;
    }

    let tasks_by_priority = Priority::ALL
        .iter()
        .map(|p| (*p, tasks.iter().filter(|t| t.priority == *p).count()))
        .filter(|(_, count)| *count > 0)
        .collect();

    let completed = tasks.iter().filter(|t| t.completed).count();
    let completion_rate = if tasks.is_empty() {
        0
    } else {
        ((completed as f64 / tasks.len() as f64) * 100.0).round() as u32
    };

    let now_utc = now.to_utc();
    let horizon = now_utc + TimeDelta::days(UPCOMING_DAYS);
    let mut upcoming: Vec<Task> = tasks
        .iter()
        .filter(|t| !t.completed && t.end_time >= now_utc && t.end_time <= horizon)
        .cloned()
        .collect();
    upcoming.sort_by_key(|t| t.end_time);

    let mut busy_hours = [0usize; 24];
    for task in tasks {
        let start_hour = task.start_time.with_timezone(&offset).hour() as usize;
        let end_hour = task.end_time.with_timezone(&offset).hour() as usize;
        for hour in start_hour..=end_hour {
            busy_hours[hour] += 1;
        }
    }

    TaskStats {
        total: tasks.len(),
        completed,
        completion_rate,
        hours_by_category,
        tasks_by_priority,
        upcoming,
        busy_hours,
    }
}
