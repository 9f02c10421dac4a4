use thiserror::Error;

/// Main error type for deltascape
#[derive(Error, Debug)]
pub enum DeltascapeError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    /// The language model errored or returned no usable content
    #[error("Summarization failed: {0}")]
    Summarization(String),

    /// GitHub (or diff download) request failed
    #[error("Fetch failed: {0}")]
    ExternalFetch(String),

    /// Pull request was closed without being merged
    #[error("Pull request {owner}/{repo}#{number} is not merged")]
    NotMerged {
        owner: String,
        repo: String,
        number: u64,
    },

    /// Segmenter or packer produced output that breaks the chunk contract
    #[error("Segmentation invariant violated: {0}")]
    SegmentationInvariant(String),

    /// Nothing to roll up for the requested week
    #[error("No activity to summarize for {0}")]
    NoActivity(String),

    /// Missing configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),
}

/// Result type alias for deltascape operations
pub type Result<T> = std::result::Result<T, DeltascapeError>;

impl DeltascapeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new summarization error
    pub fn summarization<S: Into<String>>(msg: S) -> Self {
        Self::Summarization(msg.into())
    }

    /// Create a new fetch error
    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        Self::ExternalFetch(msg.into())
    }

    /// Whether a PR run failing with this error should be skipped quietly
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::NotMerged { .. })
    }
}
