//! Batched data loading from sample collections

use crate::data_pipeline::{DataPipeline, ModelInput};
use futures::stream::{self, StreamExt, TryStreamExt};
use labelbridge_core::{Error, Result, SampleCollection};
use tracing::debug;

/// Batch size used when the caller does not provide one
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// Preprocessed inputs grouped into ordered batches
#[derive(Debug, Clone)]
pub struct DataModule {
    batches: Vec<Vec<ModelInput>>,
    num_items: usize,
    batch_size: usize,
}

impl DataModule {
    /// Load every item of `samples` through `pipeline`.
    ///
    /// `num_workers` bounds how many items are in flight in the loading
    /// stream. Preprocessing itself is synchronous CPU work on the calling
    /// task, so it does not run in parallel. Output order always follows the
    /// collection's iteration order.
    pub async fn from_collection<C: SampleCollection + ?Sized>(
        samples: &C,
        pipeline: &DataPipeline,
        batch_size: Option<usize>,
        num_workers: Option<usize>,
    ) -> Result<Self> {
        let batch_size = batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        pipeline.validate()?;

        let workers = num_workers.unwrap_or(0).max(1);
        let items = samples.items()?;
        let num_items = items.len();

        let inputs: Vec<ModelInput> = stream::iter(items)
            .map(|item| async move { pipeline.preprocess(item) })
            .buffered(workers)
            .try_collect()
            .await?;

        let batches: Vec<Vec<ModelInput>> = inputs
            .chunks(batch_size)
            .map(<[ModelInput]>::to_vec)
            .collect();

        debug!(
            items = num_items,
            batches = batches.len(),
            batch_size,
            workers,
            "Built data module"
        );

        Ok(Self {
            batches,
            num_items,
            batch_size,
        })
    }

    /// Batches in iteration order
    pub fn batches(&self) -> &[Vec<ModelInput>] {
        &self.batches
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelbridge_core::{Dataset, MediaType, Sample};

    fn dataset(n: usize) -> Dataset {
        Dataset::new("images", MediaType::Image)
            .with_samples((0..n).map(|i| Sample::new(format!("s{i}"), format!("/data/{i}.jpg"))))
            .unwrap()
    }

    #[tokio::test]
    async fn test_batches_preserve_order() {
        let dm = DataModule::from_collection(&dataset(10), &DataPipeline::default(), Some(3), Some(4))
            .await
            .unwrap();

        assert_eq!(dm.num_items(), 10);
        assert_eq!(dm.num_batches(), 4);
        assert_eq!(dm.batches()[3].len(), 1);

        let ids: Vec<_> = dm
            .batches()
            .iter()
            .flatten()
            .map(|input| input.item.sample_id.clone())
            .collect();
        let expected: Vec<_> = (0..10).map(|i| format!("s{i}")).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_default_batch_size() {
        let dm = DataModule::from_collection(&dataset(5), &DataPipeline::default(), None, None)
            .await
            .unwrap();
        assert_eq!(dm.batch_size(), DEFAULT_BATCH_SIZE);
        assert_eq!(dm.num_batches(), 2);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let result = DataModule::from_collection(&dataset(1), &DataPipeline::default(), Some(0), None).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let dm = DataModule::from_collection(&dataset(0), &DataPipeline::default(), None, None)
            .await
            .unwrap();
        assert_eq!(dm.num_batches(), 0);
    }
}
