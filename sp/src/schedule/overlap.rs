//! Overlap detection for merging schedules into the store

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Task, TaskId};
use crate::store::StoreError;

/// What to do when an incoming task overlaps another task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Append everything and report the overlaps
    #[default]
    Allow,
    /// Refuse the whole merge if anything overlaps
    Reject,
    /// Move overlapping incoming tasks later, keeping their duration
    Shift,
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Reject => write!(f, "reject"),
            Self::Shift => write!(f, "shift"),
        }
    }
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "reject" => Ok(Self::Reject),
            "shift" => Ok(Self::Shift),
            _ => Err(format!("Unknown merge policy: {}. Use: allow, reject, or shift", s)),
        }
    }
}

/// One intersecting pair; `incoming` is always a task being merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    pub incoming: TaskId,
    pub incoming_title: String,
    pub conflicting: TaskId,
    pub conflicting_title: String,
}

/// Result of a successful merge
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub added: usize,
    /// Overlaps left in place (only under `allow`)
    pub overlaps: Vec<Overlap>,
    /// Tasks moved later (only under `shift`)
    pub shifted: usize,
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("{count} incoming task(s) overlap existing tasks; nothing was added")]
    Rejected { count: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Every pair of intersecting `[start, end)` intervals that involves at least
/// one incoming task, found with a sweep over start times
pub fn find_overlaps(existing: &[Task], incoming: &[Task]) -> Vec<Overlap> {
    let mut events: Vec<(&Task, bool)> = existing
        .iter()
        .map(|t| (t, false))
        .chain(incoming.iter().map(|t| (t, true)))
        .collect();
    events.sort_by_key(|(t, _)| (t.start_time, t.end_time));

    let mut active: Vec<(&Task, bool)> = Vec::new();
    let mut overlaps = Vec::new();
    for (task, is_incoming) in events {
        active.retain(|(a, _)| a.end_time > task.start_time);
        for &(other, other_incoming) in &active {
            if !task.overlaps(other) {
                continue;
            }
            let pair = match (is_incoming, other_incoming) {
                (true, _) => Some((task, other)),
                (false, true) => Some((other, task)),
                (false, false) => None,
            };
            if let Some((inc, conflicting)) = pair {
                overlaps.push(Overlap {
                    incoming: inc.id.clone(),
                    incoming_title: inc.title.clone(),
                    conflicting: conflicting.id.clone(),
                    conflicting_title: conflicting.title.clone(),
                });
            }
        }
        active.push((task, is_incoming));
    }

    debug!(count = overlaps.len(), "find_overlaps: done");
    overlaps
}

/// Move incoming tasks forward until none intersects an existing task or an
/// earlier incoming task. Returns how many moved.
pub fn shift_past_conflicts(existing: &[Task], incoming: &mut [Task]) -> usize {
    let mut placed: Vec<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)> =
        existing.iter().map(|t| (t.start_time, t.end_time)).collect();

    let mut order: Vec<usize> = (0..incoming.len()).collect();
    order.sort_by_key(|&i| incoming[i].start_time);

    let mut shifted = 0;
    for i in order {
        let duration = incoming[i].duration();
        let (mut start, mut end) = (incoming[i].start_time, incoming[i].end_time);
        let mut moved = false;

        // Each pass pushes start to a later end time, so this terminates
        while let Some(&(_, blocker_end)) = placed.iter().find(|(s, e)| start < *e && *s < end) {
            start = blocker_end;
            end = start + duration;
            moved = true;
        }

        if moved {
            debug!(title = %incoming[i].title, %start, "shift_past_conflicts: moved task");
            incoming[i].start_time = start;
            incoming[i].end_time = end;
            shifted += 1;
        }
        placed.push((start, end));
    }
    shifted
}
