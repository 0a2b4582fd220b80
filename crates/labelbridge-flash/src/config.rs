//! Configuration for applying models and computing embeddings

use labelbridge_core::{Error, Result, StartupThresholds};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for `apply_model`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyOptions {
    /// Field to store predictions in. For video collections the `frames.`
    /// prefix is optional
    #[serde(default = "default_label_field")]
    pub label_field: String,

    /// Confidence threshold for applicable labels
    #[serde(default)]
    pub confidence_thresh: Option<f32>,

    /// Store logits alongside classifier predictions
    #[serde(default)]
    pub store_logits: bool,

    /// Batch size; the data module default is used when absent
    #[serde(default)]
    pub batch_size: Option<usize>,

    /// Number of concurrent preprocessing workers
    #[serde(default)]
    pub num_workers: Option<usize>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            label_field: default_label_field(),
            confidence_thresh: None,
            store_logits: false,
            batch_size: None,
            num_workers: None,
        }
    }
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = field.into();
        self
    }

    pub fn with_confidence_thresh(mut self, thresh: f32) -> Self {
        self.confidence_thresh = Some(thresh);
        self
    }

    pub fn with_store_logits(mut self, store: bool) -> Self {
        self.store_logits = store;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_num_workers(mut self, workers: usize) -> Self {
        self.num_workers = Some(workers);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(thresh) = self.confidence_thresh {
            if !(0.0..=1.0).contains(&thresh) {
                return Err(Error::config(format!(
                    "confidence_thresh must be within [0, 1], got {thresh}"
                )));
            }
        }
        validate_batch_size(self.batch_size)
    }
}

/// Options for `compute_embeddings`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbeddingOptions {
    /// Field to store embeddings in; embeddings are returned when absent
    #[serde(default)]
    pub embeddings_field: Option<String>,

    #[serde(default)]
    pub batch_size: Option<usize>,

    #[serde(default)]
    pub num_workers: Option<usize>,
}

impl EmbeddingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embeddings_field(mut self, field: impl Into<String>) -> Self {
        self.embeddings_field = Some(field.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_num_workers(mut self, workers: usize) -> Self {
        self.num_workers = Some(workers);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_batch_size(self.batch_size)
    }
}

/// Top-level adapter configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Defaults for `apply_model`
    #[serde(default)]
    pub apply: ApplyOptions,

    /// Defaults for `compute_embeddings`
    #[serde(default)]
    pub embeddings: EmbeddingOptions,

    /// Startup latency thresholds
    #[serde(default)]
    pub startup: StartupThresholds,

    /// Log a progress line every N batches (0 disables)
    #[serde(default)]
    pub progress_every_n_batches: usize,
}

impl AdapterConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.apply.validate()?;
        self.embeddings.validate()?;
        self.startup.validate()
    }
}

fn validate_batch_size(batch_size: Option<usize>) -> Result<()> {
    if batch_size == Some(0) {
        return Err(Error::config("batch_size must be at least 1"));
    }
    Ok(())
}

fn default_label_field() -> String {
    "predictions".to_string()
}
