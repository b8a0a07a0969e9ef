//! Domain types for studyplan
//!
//! - Task: the atomic schedulable unit
//! - RecordId / TaskId: opaque unique identifier
//! - Priority / Category: fixed enumerations

mod category;
mod id;
mod priority;
mod task;

pub use category::Category;
pub use id::{RecordId, TaskId, resolve_prefix};
pub use priority::Priority;
pub use task::{Task, TaskPatch};
