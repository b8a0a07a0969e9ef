//! studyplan - student schedule planner
//!
//! Keeps a collection of timed tasks and turns a plain-language request
//! ("gym every morning, coding after class, projects on the weekend") into
//! schedule candidates via an LLM, with a local generator standing in
//! whenever the model is unavailable or answers with something unusable.
//!
//! # Modules
//!
//! - [`domain`] - Task, TaskId, Priority, Category
//! - [`store`] - Task persistence (in-memory and JSON file)
//! - [`llm`] - LLM client trait with Gemini and Anthropic implementations
//! - [`schedule`] - Generation pipeline, fallback, repair, selection and merge
//! - [`analytics`] - Dashboard statistics
//! - [`academics`] - Courses and assignments
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod academics;
pub mod analytics;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod schedule;
pub mod store;

// Re-export commonly used types
pub use academics::{AcademicPlanner, AcademicsError, Assignment, Course, JsonAcademicStore};
pub use config::{Config, LlmConfig, ScheduleConfig, StorageConfig};
pub use domain::{Category, Priority, RecordId, Task, TaskId, TaskPatch};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, GeminiClient, LlmClient, LlmError};
pub use schedule::{
    CandidateSet, GenerationContext, GenerationError, GenerationOutcome, GenerationRequest, Horizon, MergePolicy,
    MergeReport, Schedule, SchedulePipeline, ScheduleSource,
};
pub use store::{JsonTaskStore, MemoryTaskStore, StoreError, TaskStore};
