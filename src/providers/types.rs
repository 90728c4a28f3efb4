// Provider-neutral request/response types
//
// The dispatcher speaks these; each provider maps them onto its own wire
// format.

use crate::conversation::Turn;

/// One generation request: prior turns, system instruction and token budget
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Conversation turns, oldest first; the last one is the new user message
    pub contents: Vec<Turn>,

    /// Model name (empty = provider default)
    pub model: String,

    /// Upper bound on reply length
    pub max_tokens: u32,

    /// System instruction
    pub system: Option<String>,
}

impl ProviderRequest {
    /// Create a new request from turns
    pub fn new(contents: Vec<Turn>) -> Self {
        Self {
            contents,
            model: String::new(),
            max_tokens: crate::config::constants::DEFAULT_MAX_OUTPUT_TOKENS,
            system: None,
        }
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set system instruction
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// One alternative completion
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Concatenated text parts
    pub text: String,
    /// Why generation stopped, if reported
    pub finish_reason: Option<String>,
}

/// Unified response: zero or more candidates
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub candidates: Vec<Candidate>,

    /// Model that generated the response
    pub model: String,

    /// Provider name (e.g., "gemini")
    pub provider: String,
}

impl ProviderResponse {
    /// Text of the first candidate, if there is one with any text
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .map(|c| c.text.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}
