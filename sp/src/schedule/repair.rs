//! Post-parse distribution repair
//!
//! Generated schedules only get the distribution rules as advice. This pass
//! enforces the two that can be fixed locally: no single-category day, and
//! weekend days limited to personal/other when the user asked for weekend time.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate};
use tracing::{debug, info};

use super::fallback::is_weekend;
use crate::domain::{Category, Task};

/// Repair a candidate in place and return how many tasks changed category
pub fn repair_distribution(tasks: &mut [Task], weekend_prompt: bool, offset: FixedOffset) -> usize {
    let mut days: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, task) in tasks.iter().enumerate() {
        days.entry(task.local_date(offset)).or_default().push(i);
    }

    let mut changed = 0;
    for (date, mut indices) in days {
        indices.sort_by_key(|&i| tasks[i].start_time);
        let weekend_day = weekend_prompt && is_weekend(date);

        if weekend_day {
            let mut next = 0;
            for &i in &indices {
                if !tasks[i].category.is_weekend_friendly() {
                    tasks[i].category = Category::WEEKEND[next % Category::WEEKEND.len()];
                    next += 1;
                    changed += 1;
                }
            }
        }

        if indices.len() < 2 {
            continue;
        }
        let first = tasks[indices[0]].category;
        if indices.iter().any(|&i| tasks[i].category != first) {
            continue;
        }

        debug!(%date, category = %first, "repair_distribution: monolithic day");
        let pool: &[Category] = if weekend_day {
            &Category::WEEKEND
        } else {
            &Category::ROTATION
        };
        let alternatives: Vec<Category> = pool.iter().copied().filter(|c| *c != first).collect();
        for (n, &i) in indices.iter().skip(1).step_by(2).enumerate() {
            tasks[i].category = alternatives[n % alternatives.len()];
            changed += 1;
        }
    }

    if changed > 0 {
        info!(changed, "Repaired schedule distribution");
    }
    changed
}
