//! labelbridge Flash
//!
//! Applies task models to sample collections and writes the results back.
//!
//! Supported task types:
//! - Classifier, Detector, Segmenter: [`apply_model`] converts raw outputs
//!   into labels with a serializer chosen per call
//! - Embedder: [`compute_embeddings`] stores vectors on the samples or
//!   returns them stacked into a tensor
//!
//! Models implement [`Task`]; the forward pass is theirs, everything around
//! it (batching, preprocessing, label conversion, writing back) lives here.

pub mod adapter;
pub mod attributes;
pub mod config;
pub mod data_pipeline;
pub mod datamodule;
pub mod serializer;
pub mod task;
pub mod trainer;

pub use adapter::{apply_model, compute_embeddings, select_serializer, stack_embeddings, FlashAdapter};
pub use attributes::{AttributeOverrides, SetAttributes};
pub use config::{AdapterConfig, ApplyOptions, EmbeddingOptions};
pub use data_pipeline::{DataPipeline, ModelInput};
pub use datamodule::{DataModule, DEFAULT_BATCH_SIZE};
pub use serializer::{ClassificationSerializer, DetectionSerializer, Serializer};
pub use task::{RawDetection, RawPrediction, Task, TaskAttributes, TaskKind};
pub use trainer::Trainer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::adapter::{apply_model, compute_embeddings, FlashAdapter};
    pub use crate::config::{ApplyOptions, EmbeddingOptions};
    pub use crate::data_pipeline::{DataPipeline, ModelInput};
    pub use crate::serializer::Serializer;
    pub use crate::task::{RawPrediction, Task, TaskAttributes, TaskKind};
}
