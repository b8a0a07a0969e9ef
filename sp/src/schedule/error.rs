//! Schedule generation errors

use thiserror::Error;

/// The only failures a generation request surfaces to the caller
///
/// Backend and parse failures never appear here; they turn into a fallback
/// schedule instead.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(
        "Your prompt is too short ({len} characters). Please describe the schedule you need in at least {min} characters, e.g. \"Plan a week with morning gym, evening coding sessions, and weekend projects\""
    )]
    PromptTooShort { len: usize, min: usize },

    #[error("A schedule is already being generated")]
    Busy,

    #[error("Prompt template error: {0}")]
    Template(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_too_short_has_guidance() {
        let err = GenerationError::PromptTooShort { len: 3, min: 10 };
        let msg = err.to_string();
        assert!(msg.contains("too short"));
        assert!(msg.contains("10"));
    }
}
