//! Apply task models to sample collections
//!
//! [`apply_model`] writes labels from classifiers, detectors and segmenters
//! to a field; [`compute_embeddings`] writes or returns embedder output.
//! Both install temporary model attributes through [`SetAttributes`], so a
//! model always leaves a call with the serializer and data pipeline it
//! entered with, even when inference fails.

use crate::attributes::{AttributeOverrides, SetAttributes};
use crate::config::{AdapterConfig, ApplyOptions, EmbeddingOptions};
use crate::datamodule::DataModule;
use crate::serializer::{ClassificationSerializer, DetectionSerializer, Serializer};
use crate::task::{Task, TaskKind};
use crate::trainer::Trainer;
use candle_core::{Device, Tensor};
use labelbridge_core::{Error, FieldPath, FieldValue, Result, SampleCollection};
use std::path::Path;
use tracing::info;

/// Apply a classifier, detector or segmenter to every sample (or frame) and
/// store the predictions in `options.label_field`.
///
/// Unsupported task types are rejected before anything is loaded or written.
/// Errors raised by the model propagate unchanged.
pub async fn apply_model<C, M>(samples: &mut C, model: &mut M, options: &ApplyOptions) -> Result<()>
where
    C: SampleCollection + ?Sized,
    M: Task + ?Sized,
{
    apply_model_with(samples, model, options, &Trainer::new()).await
}

async fn apply_model_with<C, M>(
    samples: &mut C,
    model: &mut M,
    options: &ApplyOptions,
    trainer: &Trainer,
) -> Result<()>
where
    C: SampleCollection + ?Sized,
    M: Task + ?Sized,
{
    let serializer = select_serializer(&*model, options.confidence_thresh, options.store_logits)?;
    options.validate()?;
    let field = FieldPath::resolve(&options.label_field, samples.media_type())?;

    info!(
        model = %model.name(),
        task = %model.kind(),
        field = %field,
        serializer = serializer.name(),
        "Applying model"
    );

    let predictions = {
        let model = SetAttributes::new(model, AttributeOverrides::new().serializer(serializer));
        predict_flat(&*samples, &*model, options.batch_size, options.num_workers, trainer).await?
    };

    samples.set_values(&options.label_field, predictions)
}

/// Compute embeddings for every sample (or frame) with an embedder.
///
/// When `options.embeddings_field` is set the embeddings are written there
/// and `None` is returned; otherwise they are returned as a
/// `num_samples x num_dims` tensor.
pub async fn compute_embeddings<C, M>(
    samples: &mut C,
    model: &mut M,
    options: &EmbeddingOptions,
) -> Result<Option<Tensor>>
where
    C: SampleCollection + ?Sized,
    M: Task + ?Sized,
{
    compute_embeddings_with(samples, model, options, &Trainer::new()).await
}

async fn compute_embeddings_with<C, M>(
    samples: &mut C,
    model: &mut M,
    options: &EmbeddingOptions,
    trainer: &Trainer,
) -> Result<Option<Tensor>>
where
    C: SampleCollection + ?Sized,
    M: Task + ?Sized,
{
    let kind = model.kind();
    if !TaskKind::EMBEDDERS.contains(&kind) {
        return Err(Error::unsupported_model(kind.as_str(), &TaskKind::EMBEDDERS));
    }
    options.validate()?;
    if let Some(field) = &options.embeddings_field {
        FieldPath::resolve(field, samples.media_type())?;
    }

    info!(model = %model.name(), field = ?options.embeddings_field, "Computing embeddings");

    let embeddings = {
        let model = SetAttributes::new(model, AttributeOverrides::new());
        predict_flat(&*samples, &*model, options.batch_size, options.num_workers, trainer).await?
    };

    match &options.embeddings_field {
        Some(field) => {
            samples.set_values(field, embeddings)?;
            Ok(None)
        }
        None => stack_embeddings(&embeddings, model.embedding_dim()).map(Some),
    }
}

/// Pick the serializer for a labeling model.
///
/// Classifiers keep the `multi_label` setting and threshold of their current
/// classification serializer; an explicit `confidence_thresh` wins over the
/// model's threshold.
pub fn select_serializer<M: Task + ?Sized>(
    model: &M,
    confidence_thresh: Option<f32>,
    store_logits: bool,
) -> Result<Serializer> {
    match model.kind() {
        TaskKind::Classifier => {
            let (multi_label, threshold) = match &model.attributes().serializer {
                Serializer::Classification(prev) => (prev.multi_label, prev.threshold),
                _ => (false, None),
            };
            Ok(Serializer::Classification(ClassificationSerializer {
                multi_label,
                store_logits,
                threshold: confidence_thresh.or(threshold),
            }))
        }
        TaskKind::Detector => Ok(Serializer::Detection(DetectionSerializer {
            threshold: confidence_thresh,
        })),
        TaskKind::Segmenter => Ok(Serializer::Segmentation),
        TaskKind::Embedder => Err(Error::unsupported_model(
            TaskKind::Embedder.as_str(),
            &TaskKind::LABELERS,
        )),
    }
}

/// Stack per-sample vectors into a `rows x dims` tensor.
///
/// Every value must be a vector of the same length, matching
/// `expected_dim` when the model reports one.
pub fn stack_embeddings(values: &[FieldValue], expected_dim: Option<usize>) -> Result<Tensor> {
    let first = values
        .first()
        .ok_or_else(|| Error::embedding("no embeddings to stack"))?;
    let dims = first
        .as_vector()
        .ok_or_else(|| Error::embedding(format!("expected vector output, got {}", first.kind())))?
        .len();

    if let Some(expected) = expected_dim {
        if expected != dims {
            return Err(Error::embedding(format!(
                "model reports {expected} dimensions but produced {dims}"
            )));
        }
    }

    let mut flat = Vec::with_capacity(values.len() * dims);
    for (row, value) in values.iter().enumerate() {
        let vector = value.as_vector().ok_or_else(|| {
            Error::embedding(format!("row {row}: expected vector output, got {}", value.kind()))
        })?;
        if vector.len() != dims {
            return Err(Error::embedding(format!(
                "row {row}: expected {dims} dimensions, got {}",
                vector.len()
            )));
        }
        flat.extend_from_slice(vector);
    }

    Ok(Tensor::from_vec(flat, (values.len(), dims), &Device::Cpu)?)
}

async fn predict_flat<C, M>(
    samples: &C,
    model: &M,
    batch_size: Option<usize>,
    num_workers: Option<usize>,
    trainer: &Trainer,
) -> Result<Vec<FieldValue>>
where
    C: SampleCollection + ?Sized,
    M: Task + ?Sized,
{
    let pipeline = model.attributes().data_pipeline.clone().unwrap_or_default();
    let datamodule = DataModule::from_collection(samples, &pipeline, batch_size, num_workers).await?;
    let batches = trainer.predict(model, &datamodule).await?;
    Ok(batches.into_iter().flatten().collect())
}

/// Configured entry point bundling defaults and a trainer
#[derive(Debug, Clone, Default)]
pub struct FlashAdapter {
    config: AdapterConfig,
    trainer: Trainer,
}

impl FlashAdapter {
    pub fn new(config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        let trainer = Trainer::new().with_progress(config.progress_every_n_batches);
        Ok(Self { config, trainer })
    }

    /// Load configuration from a YAML file
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(AdapterConfig::from_file(path)?)
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// [`apply_model`] with the configured defaults
    pub async fn apply<C, M>(&self, samples: &mut C, model: &mut M) -> Result<()>
    where
        C: SampleCollection + ?Sized,
        M: Task + ?Sized,
    {
        apply_model_with(samples, model, &self.config.apply, &self.trainer).await
    }

    /// [`apply_model`] with explicit options
    pub async fn apply_with<C, M>(&self, samples: &mut C, model: &mut M, options: &ApplyOptions) -> Result<()>
    where
        C: SampleCollection + ?Sized,
        M: Task + ?Sized,
    {
        apply_model_with(samples, model, options, &self.trainer).await
    }

    /// [`compute_embeddings`] with the configured defaults
    pub async fn embed<C, M>(&self, samples: &mut C, model: &mut M) -> Result<Option<Tensor>>
    where
        C: SampleCollection + ?Sized,
        M: Task + ?Sized,
    {
        compute_embeddings_with(samples, model, &self.config.embeddings, &self.trainer).await
    }
}
