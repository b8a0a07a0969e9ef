//! Generative backend adapter

use std::sync::Arc;

use tracing::{debug, info};

use super::prompt::InstructionEnvelope;
use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message, StopReason};

/// Sends instruction envelopes to an LLM and hands back the raw reply text
#[derive(Clone)]
pub struct ScheduleBackend {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
    temperature: f32,
}

impl ScheduleBackend {
    pub fn new(llm: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self {
            llm,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// One completion call; no retries beyond what the client itself does
    pub async fn fetch(&self, envelope: &InstructionEnvelope) -> Result<String, LlmError> {
        debug!(nonce = %envelope.nonce, "fetch: called");
        let request = CompletionRequest {
            system_prompt: envelope.system_prompt.clone(),
            messages: vec![Message::user(envelope.user_prompt.clone())],
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
        };

        let response = self.llm.complete(request).await?;
        if response.stop_reason == StopReason::MaxTokens {
            // Truncated JSON usually fails to parse; the fallback covers it
            debug!("fetch: response hit max tokens");
        }

        match response.content {
            Some(text) if !text.trim().is_empty() => {
                info!(
                    chars = text.len(),
                    output_tokens = response.usage.output_tokens,
                    "Received schedule response"
                );
                Ok(text)
            }
            _ => {
                debug!(stop_reason = ?response.stop_reason, "fetch: empty response");
                Err(LlmError::EmptyResponse)
            }
        }
    }
}
