pub mod cache;
pub mod claude;
pub mod compress;
pub mod dispatch;
pub mod prompt;

use crate::error::Result;
use async_trait::async_trait;

/// Temperature for diff compression; the same chunk should always compress the same way
pub const COMPRESSION_TEMPERATURE: f32 = 0.0;

/// Default temperature for human-facing narratives
pub const NARRATIVE_TEMPERATURE: f32 = 0.7;

/// Sampling options for a single completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
}

impl CompletionOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self { temperature }
    }

    /// Deterministic options used for chunk compression
    pub fn compression() -> Self {
        Self::with_temperature(COMPRESSION_TEMPERATURE)
    }

    pub fn is_deterministic(&self) -> bool {
        self.temperature == 0.0
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::with_temperature(NARRATIVE_TEMPERATURE)
    }
}

/// A text-completion service that turns an instruction plus user text into a summary
///
/// Implementations return `DeltascapeError::Summarization` when the service
/// fails or answers with no usable content.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        system: &str,
        user: &str,
        options: CompletionOptions,
    ) -> Result<String>;
}
