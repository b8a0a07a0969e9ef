//! Raw task records to canonical tasks

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use tracing::{debug, warn};

use super::parser::RawTask;
use crate::domain::{Category, Priority, Task};

/// Naive layouts accepted when the model leaves out the UTC offset
const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO 8601 timestamp; naive times are read in `offset`
pub fn parse_timestamp(s: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .and_then(|naive| naive.and_local_timezone(offset).single())
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Turn one raw record into a Task with a fresh id
///
/// Inverted times are swapped. Records with no title, unreadable times or
/// zero length are dropped.
pub fn normalize_task(raw: &RawTask, offset: FixedOffset) -> Option<Task> {
    let title = raw.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        warn!("Dropping generated task without a title");
        return None;
    }

    let start = raw.start_time.as_deref().and_then(|s| parse_timestamp(s, offset));
    let end = raw.end_time.as_deref().and_then(|s| parse_timestamp(s, offset));
    let (Some(mut start), Some(mut end)) = (start, end) else {
        warn!(
            title,
            start = ?raw.start_time,
            end = ?raw.end_time,
            "Dropping generated task with missing or unreadable times"
        );
        return None;
    };

    if end < start {
        debug!(title, "normalize_task: swapping inverted times");
        std::mem::swap(&mut start, &mut end);
    }
    if start == end {
        warn!(title, "Dropping zero-length generated task");
        return None;
    }

    let mut task = Task::new(title, start, end)
        .with_priority(Priority::from_lenient(raw.priority.as_deref()))
        .with_category(Category::from_lenient(raw.category.as_deref()));
    if let Some(description) = raw.description.as_deref() {
        task = task.with_description(description.trim());
    }
    task.completed = raw.completed.unwrap_or(false);
    Some(task)
}

/// Normalize a whole candidate, keeping input order
pub fn normalize_all(raws: &[RawTask], offset: FixedOffset) -> Vec<Task> {
    let tasks: Vec<Task> = raws.iter().filter_map(|raw| normalize_task(raw, offset)).collect();
    debug!(input = raws.len(), kept = tasks.len(), "normalize_all: done");
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn raw(title: &str, start: &str, end: &str) -> RawTask {
        RawTask {
            title: Some(title.to_string()),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2025-03-10T09:00:00+02:00", utc()).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 10, 7, 0, 0).unwrap());
        assert!(parse_timestamp("2025-03-10T09:00:00.000Z", utc()).is_some());
    }

    #[test]
    fn test_parse_timestamp_naive_uses_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let dt = parse_timestamp("2025-03-10T09:00", ist).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 10, 3, 30, 0).unwrap());
        assert!(parse_timestamp("2025-03-10 09:00:00", ist).is_some());
    }

    #[test]
    fn test_parse_timestamp_garbage() {
        assert!(parse_timestamp("next tuesday", utc()).is_none());
        assert!(parse_timestamp("", utc()).is_none());
    }

    #[test]
    fn test_normalize_defaults_and_lenient_enums() {
        let mut r = raw("  Gym  ", "2025-03-10T07:00:00Z", "2025-03-10T08:00:00Z");
        r.priority = Some("urgent".to_string());
        r.category = Some("academic".to_string());

        let task = normalize_task(&r, utc()).unwrap();
        assert_eq!(task.title, "Gym");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, Category::Study);
        assert!(!task.completed);
        assert!(task.description.is_empty());
    }

    #[test]
    fn test_normalize_swaps_inverted_times() {
        let task = normalize_task(&raw("Read", "2025-03-10T10:00:00Z", "2025-03-10T09:00:00Z"), utc()).unwrap();
        assert!(task.has_valid_times());
        assert_eq!(task.start_time, Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_normalize_drops_bad_records() {
        let zero = raw("Nap", "2025-03-10T10:00:00Z", "2025-03-10T10:00:00Z");
        let untitled = raw("   ", "2025-03-10T10:00:00Z", "2025-03-10T11:00:00Z");
        let unreadable = raw("Gym", "tomorrow", "2025-03-10T11:00:00Z");
        let missing = RawTask {
            title: Some("Gym".to_string()),
            ..Default::default()
        };

        for r in [zero, untitled, unreadable, missing] {
            assert!(normalize_task(&r, utc()).is_none(), "{:?}", r);
        }
    }

    #[test]
    fn test_normalize_all_assigns_unique_ids() {
        let raws: Vec<RawTask> = (0..20)
            .map(|i| raw("Same", &format!("2025-03-10T{:02}:00:00Z", i), &format!("2025-03-10T{:02}:30:00Z", i)))
            .collect();
        let tasks = normalize_all(&raws, utc());
        assert_eq!(tasks.len(), 20);
        let ids: HashSet<_> = tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), 20);
    }
}
