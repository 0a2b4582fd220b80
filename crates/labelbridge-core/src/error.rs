//! Error types for labelbridge

/// Result type alias using labelbridge's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for labelbridge operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model's task type is not handled by the requested operation
    #[error("unsupported model type {actual}; supported model types are [{}]", .supported.join(", "))]
    UnsupportedModel {
        actual: String,
        supported: Vec<String>,
    },

    /// Model forward pass or predict loop errors
    #[error("inference error: {0}")]
    Inference(String),

    /// Sample collection errors
    #[error("collection error: {0}")]
    Collection(String),

    /// Number of values does not match the number of samples or frames
    #[error("field '{field}' expects {expected} values, got {actual}")]
    FieldLength {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Field name cannot be resolved against the collection
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// Embeddings could not be stacked into an array
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Startup exceeded the hard latency threshold
    #[error("{0}")]
    StartupTooSlow(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Tensor errors
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new unsupported model error
    pub fn unsupported_model<S: ToString>(actual: impl Into<String>, supported: &[S]) -> Self {
        Self::UnsupportedModel {
            actual: actual.into(),
            supported: supported.iter().map(ToString::to_string).collect(),
        }
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new collection error
    pub fn collection(msg: impl Into<String>) -> Self {
        Self::Collection(msg.into())
    }

    /// Create a new invalid field error
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
