//! Mock models for testing
//!
//! Provides configurable implementations of the Task trait for exercising
//! the adapter, serializer selection, and attribute restoration.

#![allow(dead_code)]

use async_trait::async_trait;
use labelbridge_core::{Dataset, ImageMetadata, MediaType, Result, Sample};
use labelbridge_flash::{
    DataPipeline, ModelInput, RawDetection, RawPrediction, Serializer, Task, TaskAttributes,
    TaskKind,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

pub const CLASSES: [&str; 3] = ["cat", "dog", "bird"];

/// Numeric suffix of a sample id (`"s12"` -> 12)
pub fn sample_index(input: &ModelInput) -> usize {
    input
        .item
        .sample_id
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(0)
}

/// A configurable mock model
///
/// Outputs are deterministic functions of the sample index (plus frame
/// number for video), so tests can check ordering after batching.
pub struct MockModel {
    name: String,
    kind: TaskKind,
    labels: Vec<String>,
    attrs: TaskAttributes,
    embedding_dim: usize,
    call_count: AtomicU32,
    seen_serializers: Mutex<Vec<Serializer>>,
}

impl MockModel {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            name: format!("mock-{kind}"),
            kind,
            labels: CLASSES.iter().map(|s| s.to_string()).collect(),
            attrs: TaskAttributes::default().with_data_pipeline(DataPipeline::default().with_resize(32, 32)),
            embedding_dim: 4,
            call_count: AtomicU32::new(0),
            seen_serializers: Mutex::new(Vec::new()),
        }
    }

    pub fn classifier() -> Self {
        Self::new(TaskKind::Classifier)
    }

    pub fn detector() -> Self {
        Self::new(TaskKind::Detector)
    }

    pub fn segmenter() -> Self {
        Self::new(TaskKind::Segmenter)
    }

    pub fn embedder() -> Self {
        Self::new(TaskKind::Embedder)
    }

    /// Set the serializer the model starts with
    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.attrs.serializer = serializer;
        self
    }

    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Number of forward calls
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Serializers installed on the model during forward calls
    pub fn seen_serializers(&self) -> Vec<Serializer> {
        self.seen_serializers.lock().unwrap().clone()
    }

    fn predict_one(&self, input: &ModelInput) -> RawPrediction {
        let idx = sample_index(input) + input.item.frame_number.unwrap_or(0);

        match self.kind {
            TaskKind::Classifier => {
                let mut logits = vec![0.0; self.labels.len()];
                logits[idx % self.labels.len()] = 4.0;
                RawPrediction::logits(logits)
            }
            TaskKind::Detector => RawPrediction::Boxes {
                detections: vec![
                    RawDetection {
                        class_id: idx % self.labels.len(),
                        score: 0.9,
                        bbox: [0.0, 0.0, 16.0, 16.0],
                    },
                    RawDetection {
                        class_id: 0,
                        score: 0.3,
                        bbox: [8.0, 8.0, 32.0, 32.0],
                    },
                ],
                image_size: input.input_size.unwrap_or(ImageMetadata { width: 32, height: 32 }),
            },
            TaskKind::Segmenter => {
                // class 1 wins on the diagonal of a 2x2 mask
                RawPrediction::SegmentationLogits {
                    num_classes: 2,
                    height: 2,
                    width: 2,
                    data: vec![0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0],
                }
            }
            TaskKind::Embedder => {
                RawPrediction::vector((0..self.embedding_dim).map(|d| (idx * 10 + d) as f32).collect())
            }
        }
    }
}

#[async_trait]
impl Task for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn embedding_dim(&self) -> Option<usize> {
        (self.kind == TaskKind::Embedder).then_some(self.embedding_dim)
    }

    fn attributes(&self) -> &TaskAttributes {
        &self.attrs
    }

    fn attributes_mut(&mut self) -> &mut TaskAttributes {
        &mut self.attrs
    }

    async fn forward(&self, batch: &[ModelInput]) -> Result<Vec<RawPrediction>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.seen_serializers
            .lock()
            .unwrap()
            .push(self.attrs.serializer.clone());

        Ok(batch.iter().map(|input| self.predict_one(input)).collect())
    }
}

/// A model that always fails - for testing error paths
pub struct FailingModel {
    kind: TaskKind,
    attrs: TaskAttributes,
    error_message: String,
}

impl FailingModel {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            attrs: TaskAttributes::default().with_data_pipeline(DataPipeline::default()),
            error_message: "Simulated inference failure".to_string(),
        }
    }

    /// Set a custom error message
    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.attrs.serializer = serializer;
        self
    }
}

#[async_trait]
impl Task for FailingModel {
    fn name(&self) -> &str {
        "failing"
    }

    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn attributes(&self) -> &TaskAttributes {
        &self.attrs
    }

    fn attributes_mut(&mut self) -> &mut TaskAttributes {
        &mut self.attrs
    }

    async fn forward(&self, _batch: &[ModelInput]) -> Result<Vec<RawPrediction>> {
        Err(labelbridge_core::Error::inference(&self.error_message))
    }
}

/// Image dataset with samples `s0..sN`
pub fn image_dataset(n: usize) -> Dataset {
    Dataset::new("images", MediaType::Image)
        .with_samples((0..n).map(|i| {
            Sample::new(format!("s{i}"), format!("/data/images/{i}.jpg")).with_metadata(64, 48)
        }))
        .unwrap()
}

/// Video dataset with samples `v0..vN`, sample `i` having `i + 1` frames
pub fn video_dataset(n: usize) -> Dataset {
    Dataset::new("videos", MediaType::Video)
        .with_samples((0..n).map(|i| Sample::new(format!("v{i}"), format!("/data/videos/{i}.mp4")).with_frames(i + 1)))
        .unwrap()
}
