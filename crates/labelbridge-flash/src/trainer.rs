//! Prediction loop
//!
//! Runs a model over a [`DataModule`] batch by batch and converts each raw
//! output with the serializer currently installed on the model.

use crate::datamodule::DataModule;
use crate::task::Task;
use labelbridge_core::{Error, FieldValue, Result};
use std::time::Instant;
use tracing::{debug, info};

/// Runs inference for a model over a data module
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    /// Log a progress line every N batches (0 disables)
    log_every_n_batches: usize,
}

impl Trainer {
    /// Create a new trainer
    pub fn new() -> Self {
        Self::default()
    }

    /// Log progress every `n` batches
    pub fn with_progress(mut self, n: usize) -> Self {
        self.log_every_n_batches = n;
        self
    }

    /// Predict every batch, returning one list of values per batch.
    ///
    /// Errors from the model's forward pass are returned as-is.
    pub async fn predict<M: Task + ?Sized>(
        &self,
        model: &M,
        datamodule: &DataModule,
    ) -> Result<Vec<Vec<FieldValue>>> {
        let start = Instant::now();
        let serializer = &model.attributes().serializer;
        let labels = model.labels();
        let kind = model.kind().as_str();
        let total = datamodule.num_batches();

        info!(
            model = %model.name(),
            task = kind,
            serializer = serializer.name(),
            batches = total,
            "Starting prediction"
        );

        let mut outputs = Vec::with_capacity(total);
        for (idx, batch) in datamodule.batches().iter().enumerate() {
            let batch_start = Instant::now();
            let raw = model.forward(batch).await?;

            if raw.len() != batch.len() {
                return Err(Error::inference(format!(
                    "model '{}' returned {} predictions for a batch of {}",
                    model.name(),
                    raw.len(),
                    batch.len()
                )));
            }

            let values = raw
                .into_iter()
                .map(|prediction| serializer.serialize(prediction, labels))
                .collect::<Result<Vec<_>>>()?;

            let latency_us = u64::try_from(batch_start.elapsed().as_micros()).unwrap_or(u64::MAX);
            metrics::histogram!("labelbridge_batch_latency_us", "task" => kind).record(latency_us as f64);
            metrics::counter!("labelbridge_predictions_total", "task" => kind).increment(values.len() as u64);
            debug!(batch = idx, size = values.len(), latency_us, "Predicted batch");

            if self.log_every_n_batches > 0 && (idx + 1) % self.log_every_n_batches == 0 {
                info!("Predicted {}/{} batches", idx + 1, total);
            }

            outputs.push(values);
        }

        info!(
            model = %model.name(),
            items = datamodule.num_items(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prediction complete"
        );

        Ok(outputs)
    }
}
