//! Schedule generation and reconciliation
//!
//! - prompt: validation, horizon detection, instruction envelope
//! - adapter: one call to the generative backend
//! - parser / normalize: raw text to canonical tasks
//! - fallback: local candidate synthesis
//! - repair: distribution rules enforced after parsing
//! - selection / overlap: choosing a candidate and merging it into the store
//! - pipeline: orchestration with a single in-flight slot

mod adapter;
mod context;
mod embedded;
mod error;
mod fallback;
mod normalize;
mod overlap;
mod parser;
mod pipeline;
mod prompt;
mod repair;
mod selection;

pub use adapter::ScheduleBackend;
pub use context::GenerationContext;
pub use error::GenerationError;
pub use fallback::{FallbackSynthesizer, is_weekend};
pub use normalize::{normalize_all, normalize_task, parse_timestamp};
pub use overlap::{MergeError, MergePolicy, MergeReport, Overlap, find_overlaps, shift_past_conflicts};
pub use parser::{ParsedSchedule, RawTask, ResponseParser};
pub use pipeline::{GenerationOutcome, Schedule, SchedulePipeline, ScheduleSource};
pub use prompt::{DateRange, GenerationRequest, Horizon, InstructionEnvelope, PromptInterpreter};
pub use repair::repair_distribution;
pub use selection::{Candidate, CandidateSet, SelectionError, commit};
