// Generative backend abstraction
//
// The dispatcher only sees `LlmProvider`; Gemini is the shipped
// implementation and tests substitute their own.

use anyhow::Result;
use async_trait::async_trait;

pub mod gemini;
pub mod retry;
pub mod types;

pub use gemini::GeminiProvider;
pub use retry::{with_retry, with_retry_policy, RetryPolicy};
pub use types::{Candidate, ProviderRequest, ProviderResponse};

/// Trait for generative backends
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one request and wait for the complete response.
    ///
    /// A single round trip; implementations must not retry, since a repeated
    /// request could produce a second model turn.
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Verify the credentials and default model are usable.
    ///
    /// Idempotent, so callers may wrap it in [`with_retry`].
    async fn check_model(&self) -> Result<()> {
        Ok(())
    }

    /// Get the provider name (e.g., "gemini")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;
}
