//! Sample collections
//!
//! The [`SampleCollection`] trait is the only surface the model adapter needs:
//! enumerate inference items in order and write one value back per item.
//! [`Dataset`] is an in-memory implementation used by tests and embedders
//! that do not have their own storage.

use crate::field::{FieldPath, MediaType};
use crate::{Error, FieldValue, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Width and height of an image or video frame in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
}

/// One unit of inference: an image sample, or one frame of a video sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleItem {
    /// Id of the owning sample
    pub sample_id: String,

    /// Media path on disk
    pub filepath: PathBuf,

    /// 1-based frame number for video frames
    pub frame_number: Option<usize>,

    /// Known dimensions, if any
    pub metadata: Option<ImageMetadata>,
}

/// Ordered collection of samples that predictions can be written back to
pub trait SampleCollection: Send + Sync {
    /// Media type of the samples
    fn media_type(&self) -> MediaType;

    /// Number of samples in the collection
    fn len(&self) -> usize;

    /// Whether the collection has no samples
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items in iteration order: one per sample for images, one per frame
    /// (sample-major) for videos
    fn items(&self) -> Result<Vec<SampleItem>>;

    /// Assign one value per sample (or per frame) in iteration order.
    ///
    /// Fails with [`Error::FieldLength`] without writing anything when
    /// `values` does not match the number of items.
    fn set_values(&mut self, field: &str, values: Vec<FieldValue>) -> Result<()>;
}

/// A video frame and its fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub frame_number: usize,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

/// A single sample and its fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,
    pub filepath: PathBuf,

    #[serde(default)]
    pub metadata: Option<ImageMetadata>,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,

    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl Sample {
    /// Create a new sample
    pub fn new(id: impl Into<String>, filepath: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            filepath: filepath.into(),
            metadata: None,
            fields: BTreeMap::new(),
            frames: Vec::new(),
        }
    }

    /// Set image dimensions
    pub fn with_metadata(mut self, width: u32, height: u32) -> Self {
        self.metadata = Some(ImageMetadata { width, height });
        self
    }

    /// Append `count` empty frames numbered from 1
    pub fn with_frames(mut self, count: usize) -> Self {
        let start = self.frames.len();
        self.frames.extend((start..start + count).map(|i| Frame {
            frame_number: i + 1,
            fields: BTreeMap::new(),
        }));
        self
    }

    /// Get a sample-level field
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

/// In-memory sample collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub media_type: MediaType,
    samples: Vec<Sample>,
}

impl Dataset {
    /// Create a new empty dataset
    pub fn new(name: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            name: name.into(),
            media_type,
            samples: Vec::new(),
        }
    }

    /// Load a dataset from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let dataset: Self = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Add a sample
    pub fn add_sample(&mut self, sample: Sample) -> Result<()> {
        if self.media_type == MediaType::Image && !sample.frames.is_empty() {
            return Err(Error::collection(format!(
                "sample '{}' has frames but dataset '{}' is an image dataset",
                sample.id, self.name
            )));
        }
        if self.samples.iter().any(|s| s.id == sample.id) {
            return Err(Error::collection(format!("duplicate sample id '{}'", sample.id)));
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Builder-style variant of [`Dataset::add_sample`]
    pub fn with_samples(mut self, samples: impl IntoIterator<Item = Sample>) -> Result<Self> {
        for sample in samples {
            self.add_sample(sample)?;
        }
        Ok(self)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Look up a sample by id
    pub fn sample(&self, id: &str) -> Option<&Sample> {
        self.samples.iter().find(|s| s.id == id)
    }

    /// Total number of frames across all samples
    pub fn frame_count(&self) -> usize {
        self.samples.iter().map(|s| s.frames.len()).sum()
    }

    /// Read a field back in the same order [`SampleCollection::set_values`]
    /// writes it. Missing values read as [`FieldValue::None`].
    pub fn values(&self, field: &str) -> Result<Vec<FieldValue>> {
        let path = FieldPath::resolve(field, self.media_type)?;
        let values = match &path {
            FieldPath::Sample(name) => self
                .samples
                .iter()
                .map(|s| s.fields.get(name).cloned().unwrap_or_default())
                .collect(),
            FieldPath::Frame(name) => self
                .samples
                .iter()
                .flat_map(|s| s.frames.iter())
                .map(|f| f.fields.get(name).cloned().unwrap_or_default())
                .collect(),
        };
        Ok(values)
    }

    /// Whether any sample or frame holds `field`
    pub fn has_field(&self, field: &str) -> bool {
        match FieldPath::resolve(field, self.media_type) {
            Ok(FieldPath::Sample(name)) => self.samples.iter().any(|s| s.fields.contains_key(&name)),
            Ok(FieldPath::Frame(name)) => self
                .samples
                .iter()
                .flat_map(|s| s.frames.iter())
                .any(|f| f.fields.contains_key(&name)),
            Err(_) => false,
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for sample in &self.samples {
            if !seen.insert(sample.id.as_str()) {
                return Err(Error::collection(format!("duplicate sample id '{}'", sample.id)));
            }
            if self.media_type == MediaType::Image && !sample.frames.is_empty() {
                return Err(Error::collection(format!(
                    "sample '{}' has frames but dataset '{}' is an image dataset",
                    sample.id, self.name
                )));
            }
        }
        Ok(())
    }
}

impl SampleCollection for Dataset {
    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn items(&self) -> Result<Vec<SampleItem>> {
        let items = match self.media_type {
            MediaType::Image => self
                .samples
                .iter()
                .map(|s| SampleItem {
                    sample_id: s.id.clone(),
                    filepath: s.filepath.clone(),
                    frame_number: None,
                    metadata: s.metadata,
                })
                .collect(),
            MediaType::Video => self
                .samples
                .iter()
                .flat_map(|s| {
                    s.frames.iter().map(move |f| SampleItem {
                        sample_id: s.id.clone(),
                        filepath: s.filepath.clone(),
                        frame_number: Some(f.frame_number),
                        metadata: s.metadata,
                    })
                })
                .collect(),
        };
        Ok(items)
    }

    fn set_values(&mut self, field: &str, values: Vec<FieldValue>) -> Result<()> {
        let path = FieldPath::resolve(field, self.media_type)?;

        let expected = match path {
            FieldPath::Sample(_) => self.samples.len(),
            FieldPath::Frame(_) => self.frame_count(),
        };
        if values.len() != expected {
            return Err(Error::FieldLength {
                field: path.to_string(),
                expected,
                actual: values.len(),
            });
        }

        debug!(dataset = %self.name, field = %path, count = expected, "Setting field values");

        match path {
            FieldPath::Sample(name) => {
                for (sample, value) in self.samples.iter_mut().zip(values) {
                    sample.fields.insert(name.clone(), value);
                }
            }
            FieldPath::Frame(name) => {
                let frames = self.samples.iter_mut().flat_map(|s| s.frames.iter_mut());
                for (frame, value) in frames.zip(values) {
                    frame.fields.insert(name.clone(), value);
                }
            }
        }

        Ok(())
    }
}
