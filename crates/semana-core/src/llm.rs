//! LLM collaborator call shape.
//!
//! The provider integration lives outside this crate; these types fix the
//! single request/response shape the engine exchanges with it, plus a trait
//! seam so tests can substitute a canned provider.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// One completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Logical caller, e.g. "weekly_summary"; used for provider-side metrics
    pub function_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmRequest {
    pub fn new(
        function_name: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            function_name: function_name.into(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// One completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model_used: String,
    pub tokens_used: u32,
    pub response_time_ms: u64,
}

/// Provider seam. Implementations live with whatever hosts this library.
pub trait CompletionProvider {
    /// Send a prompt and receive the completion text.
    ///
    /// # Errors
    /// Returns a classified [`LlmError`]; callers map it to user-facing text
    /// via [`LlmError::user_message`].
    fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned;

    impl CompletionProvider for Canned {
        fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                content: format!("eco: {}", request.user_prompt),
                model_used: "canned".to_string(),
                tokens_used: 7,
                response_time_ms: 1,
            })
        }
    }

    #[test]
    fn test_provider_seam_round_trip() {
        let response = Canned
            .complete(&LlmRequest::new("resumen", "sistema", "hola"))
            .unwrap();
        assert_eq!(response.content, "eco: hola");
    }
}
