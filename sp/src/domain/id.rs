//! Record identifiers
//!
//! Ids are UUIDv7 strings, so ids minted later sort later. Tasks, courses
//! and assignments all use the same id type.

use serde::{Deserialize, Serialize};

/// Opaque unique identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

pub type TaskId = RecordId;

impl RecordId {
    /// Mint a fresh id
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Get the full id string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for terminal output (first 8 chars of the random tail)
    pub fn short(&self) -> &str {
        let tail = self.0.rsplit('-').next().unwrap_or(&self.0);
        tail.char_indices().nth(8).map_or(tail, |(i, _)| &tail[..i])
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve a full id or a unique prefix of the full or short form
///
/// `Ok(None)` when nothing matches; `Err(count)` when the prefix is ambiguous.
pub fn resolve_prefix<'a>(ids: impl IntoIterator<Item = &'a RecordId>, prefix: &str) -> Result<Option<RecordId>, usize> {
    let prefix = prefix.trim();
    let ids: Vec<&RecordId> = ids.into_iter().collect();
    if let Some(id) = ids.iter().find(|id| id.as_str() == prefix) {
        return Ok(Some((*id).clone()));
    }

    let matches: Vec<&&RecordId> = ids
        .iter()
        .filter(|id| !prefix.is_empty() && (id.as_str().starts_with(prefix) || id.short().starts_with(prefix)))
        .collect();
    match matches.as_slice() {
        [only] => Ok(Some((**only).clone())),
        [] => Ok(None),
        many => Err(many.len()),
    }
}
