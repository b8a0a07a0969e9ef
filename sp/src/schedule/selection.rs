//! Candidate presentation, selection and commit

use thiserror::Error;
use tracing::{debug, info, warn};

use super::overlap::{MergeError, MergePolicy, MergeReport, find_overlaps, shift_past_conflicts};
use crate::domain::Task;
use crate::store::TaskStore;

/// Label and blurb for the candidate at `index`
fn presentation(index: usize) -> (String, String) {
    match index {
        0 => ("Balanced".into(), "Equal distribution of study and breaks".into()),
        1 => (
            "Intensive Focus".into(),
            "Concentrated study blocks with shorter breaks".into(),
        ),
        2 => ("Flexible".into(), "Adaptable schedule with buffer time".into()),
        n => (format!("Option {}", n + 1), "Alternative schedule".into()),
    }
}

/// One alternative schedule
#[derive(Debug, Clone)]
pub struct Candidate {
    pub label: String,
    pub description: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("No candidate {index}; choose 1 to {count}")]
    OutOfRange { index: usize, count: usize },
}

/// Mutually exclusive candidate schedules awaiting a choice
#[derive(Debug, Clone)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    /// Label schedules by position
    pub fn from_schedules(schedules: Vec<Vec<Task>>) -> Self {
        let candidates = schedules
            .into_iter()
            .enumerate()
            .map(|(i, tasks)| {
                let (label, description) = presentation(i);
                Candidate {
                    label,
                    description,
                    tasks,
                }
            })
            .collect();
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    /// Take the tasks of one candidate (zero-based), dropping the rest
    pub fn select(mut self, index: usize) -> Result<Vec<Task>, SelectionError> {
        if index >= self.candidates.len() {
            return Err(SelectionError::OutOfRange {
                index: index + 1,
                count: self.candidates.len(),
            });
        }
        let chosen = self.candidates.swap_remove(index);
        debug!(label = %chosen.label, tasks = chosen.tasks.len(), "select: chosen");
        Ok(chosen.tasks)
    }

    /// Drop every candidate without touching the store
    pub fn dismiss(self) {
        debug!(count = self.candidates.len(), "dismiss: called");
    }
}

/// Append tasks to the store under a merge policy
pub fn commit(store: &mut dyn TaskStore, mut tasks: Vec<Task>, policy: MergePolicy) -> Result<MergeReport, MergeError> {
    let existing = store.list()?;
    let mut report = MergeReport::default();

    match policy {
        MergePolicy::Allow => {
            report.overlaps = find_overlaps(&existing, &tasks);
            for overlap in &report.overlaps {
                warn!(
                    incoming = %overlap.incoming_title,
                    conflicting = %overlap.conflicting_title,
                    "Committed task overlaps another task"
                );
            }
        }
        MergePolicy::Reject => {
            let overlaps = find_overlaps(&existing, &tasks);
            if !overlaps.is_empty() {
                let mut incoming: Vec<_> = overlaps.iter().map(|o| &o.incoming).collect();
                incoming.sort();
                incoming.dedup();
                return Err(MergeError::Rejected { count: incoming.len() });
            }
        }
        MergePolicy::Shift => {
            report.shifted = shift_past_conflicts(&existing, &mut tasks);
        }
    }

    report.added = store.extend(tasks)?;
    info!(added = report.added, %policy, overlaps = report.overlaps.len(), shifted = report.shifted, "Committed schedule");
    Ok(report)
}
