//! Input preprocessing

use labelbridge_core::{Error, ImageMetadata, Result, SampleItem};
use serde::{Deserialize, Serialize};

/// Preprocessing applied to every item before it reaches the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPipeline {
    /// Resize every input to this size; inputs keep their own size otherwise
    #[serde(default)]
    pub resize: Option<ImageMetadata>,

    /// Per-channel mean for normalization
    #[serde(default = "default_mean")]
    pub mean: [f32; 3],

    /// Per-channel standard deviation for normalization
    #[serde(default = "default_std")]
    pub std: [f32; 3],
}

impl Default for DataPipeline {
    fn default() -> Self {
        Self {
            resize: None,
            mean: default_mean(),
            std: default_std(),
        }
    }
}

/// A preprocessed item ready for the model's forward pass
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    /// Source sample or frame
    pub item: SampleItem,

    /// Size the model sees, if known
    pub input_size: Option<ImageMetadata>,

    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl DataPipeline {
    /// Pipeline that resizes every input
    pub fn with_resize(mut self, width: u32, height: u32) -> Self {
        self.resize = Some(ImageMetadata { width, height });
        self
    }

    pub fn with_normalization(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    /// Check the pipeline can be applied at all
    pub fn validate(&self) -> Result<()> {
        if self.std.iter().any(|s| *s <= 0.0 || !s.is_finite()) {
            return Err(Error::config(format!(
                "normalization std must be positive, got {:?}",
                self.std
            )));
        }
        if let Some(size) = self.resize {
            if size.width == 0 || size.height == 0 {
                return Err(Error::config(format!(
                    "resize target must be non-empty, got {}x{}",
                    size.width, size.height
                )));
            }
        }
        Ok(())
    }

    /// Prepare a single item
    pub fn preprocess(&self, item: SampleItem) -> Result<ModelInput> {
        if item.filepath.as_os_str().is_empty() {
            return Err(Error::collection(format!(
                "sample '{}' has no filepath",
                item.sample_id
            )));
        }

        let input_size = self.resize.or(item.metadata);

        Ok(ModelInput {
            item,
            input_size,
            mean: self.mean,
            std: self.std,
        })
    }
}

fn default_mean() -> [f32; 3] {
    [0.485, 0.456, 0.406]
}

fn default_std() -> [f32; 3] {
    [0.229, 0.224, 0.225]
}
