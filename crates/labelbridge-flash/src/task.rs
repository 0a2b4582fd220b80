//! Task model trait and common types

use crate::data_pipeline::{DataPipeline, ModelInput};
use crate::serializer::Serializer;
use async_trait::async_trait;
use labelbridge_core::{ImageMetadata, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for all task models
///
/// Implementations own the forward pass. Everything around it (data
/// loading, batching, label conversion, writing back to the collection) is
/// handled by the trainer and the adapter.
#[async_trait]
pub trait Task: Send + Sync {
    /// Get the model name
    fn name(&self) -> &str;

    /// Get the declared task type
    fn kind(&self) -> TaskKind;

    /// Class names indexed by class id
    fn labels(&self) -> &[String] {
        &[]
    }

    /// Length of the vectors produced by an embedder
    fn embedding_dim(&self) -> Option<usize> {
        None
    }

    /// Current serializer and data pipeline
    fn attributes(&self) -> &TaskAttributes;

    /// Mutable access to the serializer and data pipeline
    fn attributes_mut(&mut self) -> &mut TaskAttributes;

    /// Run the model on one batch, returning one raw prediction per input
    async fn forward(&self, batch: &[ModelInput]) -> Result<Vec<RawPrediction>>;
}

/// Closed set of supported task types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Classifier,
    Detector,
    Segmenter,
    Embedder,
}

impl TaskKind {
    /// Task types accepted by `apply_model`
    pub const LABELERS: [TaskKind; 3] = [Self::Classifier, Self::Detector, Self::Segmenter];

    /// Task types accepted by `compute_embeddings`
    pub const EMBEDDERS: [TaskKind; 1] = [Self::Embedder];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classifier => "classifier",
            Self::Detector => "detector",
            Self::Segmenter => "segmenter",
            Self::Embedder => "embedder",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model attributes that are swapped for the duration of a call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskAttributes {
    /// Converts raw outputs into field values
    #[serde(default)]
    pub serializer: Serializer,

    /// Input preprocessing
    #[serde(default)]
    pub data_pipeline: Option<DataPipeline>,
}

impl TaskAttributes {
    pub fn new(serializer: Serializer) -> Self {
        Self {
            serializer,
            data_pipeline: None,
        }
    }

    pub fn with_data_pipeline(mut self, pipeline: DataPipeline) -> Self {
        self.data_pipeline = Some(pipeline);
        self
    }
}

/// A single detection in absolute pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: usize,
    pub score: f32,

    /// `[x1, y1, x2, y2]` in pixels
    pub bbox: [f32; 4],
}

/// Unconverted model output for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawPrediction {
    /// Per-class logits
    Logits { logits: Vec<f32> },

    /// Detected boxes and the size of the image they refer to
    Boxes {
        detections: Vec<RawDetection>,
        image_size: ImageMetadata,
    },

    /// Per-pixel class logits laid out as `C x H x W`
    SegmentationLogits {
        num_classes: usize,
        height: usize,
        width: usize,
        data: Vec<f32>,
    },

    /// Plain numeric vector (embeddings)
    Vector { values: Vec<f32> },
}

impl RawPrediction {
    pub fn logits(logits: Vec<f32>) -> Self {
        Self::Logits { logits }
    }

    pub fn vector(values: Vec<f32>) -> Self {
        Self::Vector { values }
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Logits { .. } => "logits",
            Self::Boxes { .. } => "boxes",
            Self::SegmentationLogits { .. } => "segmentation logits",
            Self::Vector { .. } => "vector",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_display() {
        assert_eq!(TaskKind::Segmenter.to_string(), "segmenter");
        assert!(TaskKind::LABELERS.contains(&TaskKind::Detector));
        assert!(!TaskKind::LABELERS.contains(&TaskKind::Embedder));
    }

    #[test]
    fn test_default_attributes() {
        let attrs = TaskAttributes::default();
        assert_eq!(attrs.serializer, Serializer::Raw);
        assert!(attrs.data_pipeline.is_none());
    }
}
