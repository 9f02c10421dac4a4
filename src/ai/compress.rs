use crate::ai::dispatch::dispatch;
use crate::ai::prompt::COMPRESS_DIFF_SYSTEM;
use crate::ai::{CompletionOptions, Summarizer};
use crate::diff::{chunk::char_len, plan_chunks};
use crate::error::Result;
use tracing::{debug, warn};

/// Input budget of the model, in tokens
pub const MODEL_MAX_TOKENS: usize = 4096;

/// Rough number of diff characters per model token
pub const DIFF_CHARS_PER_TOKEN: usize = 2;

/// Maximum number of chunk requests in flight for one diff
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Joins packed fragments and compressed chunks
pub const CHUNK_SEPARATOR: &str = "\n";

/// Settings for reducing one diff to one compressed text
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    /// Maximum chunk length in characters
    pub max_chunk_size: usize,
    pub concurrency: usize,
    pub temperature: f32,
}

impl CompressionConfig {
    /// Derive the chunk size from the model's token budget
    pub fn from_token_budget(max_tokens: usize, chars_per_token: usize, concurrency: usize) -> Self {
        Self {
            max_chunk_size: max_tokens * chars_per_token,
            concurrency,
            temperature: CompletionOptions::compression().temperature,
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self::from_token_budget(MODEL_MAX_TOKENS, DIFF_CHARS_PER_TOKEN, DEFAULT_CONCURRENCY)
    }
}

/// Reduces a raw diff to a few sentences per chunk
#[derive(Debug, Clone, Default)]
pub struct DiffCompressor {
    config: CompressionConfig,
}

impl DiffCompressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Compress a diff: segment, pack, summarize each chunk, join in order
    ///
    /// Chunks that fail to summarize are left out of the result. An empty
    /// diff returns an empty string without calling the summarizer.
    pub async fn compress(&self, summarizer: &dyn Summarizer, diff: &str) -> Result<String> {
        let chunks = plan_chunks(diff, self.config.max_chunk_size, CHUNK_SEPARATOR)?;
        if chunks.is_empty() {
            return Ok(String::new());
        }

        let compressed = dispatch(
            summarizer,
            COMPRESS_DIFF_SYSTEM,
            &chunks,
            self.config.concurrency,
            CompletionOptions::with_temperature(self.config.temperature),
        )
        .await;

        let dropped = compressed.iter().filter(|c| c.is_none()).count();
        if dropped > 0 {
            warn!(dropped, total = chunks.len(), "Diff compressed with missing chunks");
        }

        let joined = compressed
            .into_iter()
            .flatten()
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);

        debug!(
            chunks = chunks.len(),
            diff_chars = char_len(diff),
            compressed_chars = char_len(&joined),
            "Diff compressed"
        );

        Ok(joined)
    }
}
