//! Fallback schedule synthesis
//!
//! Builds candidate schedules locally when the generative backend fails or
//! returns something unusable. Never fails.

use chrono::{Datelike, Days, NaiveDate, NaiveTime, TimeDelta, Weekday};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::{debug, info};

use super::GenerationContext;
use crate::config::ScheduleConfig;
use crate::domain::{Category, Priority, Task};

/// First task of the day starts at this local hour
const DAY_START_HOUR: u32 = 8;

/// Hours between task starts within a day
const SLOT_SPACING_HOURS: u32 = 3;

fn phrases(category: Category) -> &'static [&'static str] {
    match category {
        Category::Study => &[
            "Study Session",
            "Review Lecture Notes",
            "Practice Problems",
            "Read Course Material",
            "Exam Prep",
        ],
        Category::Work => &["Project Work", "Coding Session", "Assignment Work", "Portfolio Update"],
        Category::Personal => &["Gym Workout", "Meal Prep", "Evening Walk", "Reading for Fun"],
        Category::Extracurricular => &["Club Meeting", "Music Practice", "Volunteering"],
        Category::Other => &["Errands", "Free Time", "Plan the Week", "Catch Up"],
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Generates locally built schedules
#[derive(Debug, Clone)]
pub struct FallbackSynthesizer {
    days: u32,
    candidates: usize,
}

impl FallbackSynthesizer {
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            days: config.fallback_days.max(1),
            candidates: config.fallback_candidates.max(1),
        }
    }

    /// Build the candidate schedules, each covering `days` days from today
    pub fn synthesize(&self, prompt: &str, ctx: &mut GenerationContext) -> Vec<Vec<Task>> {
        let weekend_prompt = prompt.to_lowercase().contains("weekend");
        debug!(weekend_prompt, days = self.days, candidates = self.candidates, "synthesize: called");

        let today = ctx.today();
        let candidates: Vec<Vec<Task>> = (0..self.candidates)
            .map(|_| {
                (0..self.days)
                    .filter_map(|d| today.checked_add_days(Days::new(d.into())))
                    .flat_map(|date| self.day(date, weekend_prompt, ctx))
                    .collect()
            })
            .collect();

        info!(
            candidates = candidates.len(),
            tasks = candidates.iter().map(Vec::len).sum::<usize>(),
            "Synthesized fallback schedules"
        );
        candidates
    }

    fn day(&self, date: NaiveDate, weekend_prompt: bool, ctx: &mut GenerationContext) -> Vec<Task> {
        let offset = ctx.offset();
        let rng = ctx.rng();
        let count = rng.random_range(3..=4usize);
        let weekend_day = weekend_prompt && is_weekend(date);

        let categories: Vec<Category> = if weekend_day {
            let first = rng.random_range(0..Category::WEEKEND.len());
            (0..count)
                .map(|i| Category::WEEKEND[(first + i) % Category::WEEKEND.len()])
                .collect()
        } else {
            let mut rotation = Category::ROTATION;
            rotation.shuffle(rng);
            rotation[..count].to_vec()
        };

        categories
            .into_iter()
            .enumerate()
            .filter_map(|(slot, category)| {
                let hour = DAY_START_HOUR + slot as u32 * SLOT_SPACING_HOURS;
                let start = date
                    .and_time(NaiveTime::from_hms_opt(hour, 0, 0)?)
                    .and_local_timezone(offset)
                    .single()?
                    .to_utc();
                let end = start + TimeDelta::hours(rng.random_range(1..=2));

                let phrase = phrases(category).choose(rng).copied().unwrap_or("Focus Time");
                let title = if weekend_day {
                    format!("Weekend {}", phrase)
                } else {
                    phrase.to_string()
                };
                let priority = Priority::ALL.choose(rng).copied().unwrap_or_default();

                Some(
                    Task::new(title, start, end)
                        .with_description(format!("Suggested {} time", category))
                        .with_priority(priority)
                        .with_category(category),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet, HashSet};

    fn synthesizer() -> FallbackSynthesizer {
        FallbackSynthesizer::new(&ScheduleConfig::default())
    }

    fn ctx_at(date: NaiveDate, offset_hours: i32, seed: u64) -> GenerationContext {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        let now: DateTime<FixedOffset> = offset
            .from_local_datetime(&date.and_hms_opt(6, 0, 0).unwrap())
            .single()
            .unwrap();
        GenerationContext::with_clock(now, seed)
    }

    fn by_day(tasks: &[Task], offset: FixedOffset) -> BTreeMap<NaiveDate, Vec<&Task>> {
        let mut days: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
        for task in tasks {
            days.entry(task.local_date(offset)).or_default().push(task);
        }
        days
    }

    #[test]
    fn test_three_candidates_covering_seven_days() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut ctx = ctx_at(monday, 0, 1);
        let schedules = synthesizer().synthesize("Plan a week of gym and coding", &mut ctx);

        assert_eq!(schedules.len(), 3);
        for tasks in &schedules {
            let days = by_day(tasks, ctx.offset());
            assert_eq!(days.len(), 7);
            assert_eq!(*days.keys().next().unwrap(), monday);
            for day_tasks in days.values() {
                assert!((3..=4).contains(&day_tasks.len()));
            }
        }
    }

    #[test]
    fn test_slots_start_at_eight_spaced_three_hours() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut ctx = ctx_at(monday, 2, 9);
        let offset = ctx.offset();
        let schedules = synthesizer().synthesize("Plan a week of revision", &mut ctx);

        for tasks in by_day(&schedules[0], offset).values() {
            for (slot, task) in tasks.iter().enumerate() {
                let local = task.start_time.with_timezone(&offset);
                assert_eq!(local.format("%H:%M").to_string(), format!("{:02}:00", 8 + slot * 3));
                let hours = task.duration().num_hours();
                assert!(hours == 1 || hours == 2);
            }
        }
    }

    #[test]
    fn test_weekend_titles_prefixed() {
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let mut ctx = ctx_at(saturday, 0, 3);
        let schedules = synthesizer().synthesize("Weekend projects and chores", &mut ctx);

        let days = by_day(&schedules[0], ctx.offset());
        for task in &days[&saturday] {
            assert!(task.title.starts_with("Weekend "));
        }
        let monday = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        for task in &days[&monday] {
            assert!(!task.title.starts_with("Weekend "));
        }
    }

    #[test]
    fn test_same_seed_same_schedule_shape() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let a = synthesizer().synthesize("Plan my week please", &mut ctx_at(monday, 0, 11));
        let b = synthesizer().synthesize("Plan my week please", &mut ctx_at(monday, 0, 11));

        let shape = |s: &Vec<Vec<Task>>| -> Vec<(String, Category, i64)> {
            s.iter()
                .flatten()
                .map(|t| (t.title.clone(), t.category, t.start_time.timestamp()))
                .collect()
        };
        assert_eq!(shape(&a), shape(&b));
    }

    proptest! {
        #[test]
        fn prop_fallback_invariants(
            seed in any::<u64>(),
            day_offset in 0u64..28,
            offset_hours in -11i32..=12,
            weekend in any::<bool>(),
        ) {
            let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Days::new(day_offset);
            let mut ctx = ctx_at(start, offset_hours, seed);
            let offset = ctx.offset();
            let prompt = if weekend { "Relaxing weekend with friends" } else { "Busy week of exams" };

            let schedules = synthesizer().synthesize(prompt, &mut ctx);
            prop_assert_eq!(schedules.len(), 3);

            let mut ids = HashSet::new();
            for tasks in &schedules {
                for (date, day_tasks) in by_day(tasks, offset) {
                    let categories: BTreeSet<Category> = day_tasks.iter().map(|t| t.category).collect();
                    prop_assert!(categories.len() > 1, "monolithic day {}", date);

                    if weekend && is_weekend(date) {
                        prop_assert!(categories.iter().all(|c| c.is_weekend_friendly()));
                    }
                }
                for task in tasks {
                    prop_assert!(task.start_time < task.end_time);
                    prop_assert!(ids.insert(task.id.clone()));
                }
            }
        }
    }
}
