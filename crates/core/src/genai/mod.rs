//! # Text Generation
//!
//! Port for the hosted generation service. The orchestrator only ever needs
//! one operation: send a prompt, get text back, optionally constrained to a
//! JSON-parseable completion. Providers live behind [`TextGenerator`] so the
//! pipeline can run against the real Gemini client or a scripted stand-in.

use async_trait::async_trait;

pub mod gemini;

pub use gemini::GeminiClient;

/// Failure modes of a generation request.
///
/// Parse failures of structured output are not represented here: the caller
/// owns the schema and surfaces those through `serde_json`.
#[derive(Debug, thiserror::Error)]
pub enum GenAiError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation quota exhausted")]
    Quota,

    #[error("generation returned no candidates")]
    Empty,
}

/// Request/response seam to the text generation service.
///
/// Every call is attempted exactly once; there is no retry policy anywhere
/// in the pipeline.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`. When `structured` is set the provider is
    /// asked to return a JSON document instead of free text.
    async fn generate(&self, prompt: &str, structured: bool) -> Result<String, GenAiError>;
}
