//! Label and field value types stored on samples

use serde::{Deserialize, Serialize};

/// A single class prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Class label
    pub label: String,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Raw model logits, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logits: Option<Vec<f32>>,
}

impl Classification {
    /// Create a new classification
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            logits: None,
        }
    }

    /// Attach logits to this classification
    pub fn with_logits(mut self, logits: Vec<f32>) -> Self {
        self.logits = Some(logits);
        self
    }
}

/// Multi-label classification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Classifications {
    /// Classes that passed the threshold
    pub classifications: Vec<Classification>,

    /// Raw model logits, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logits: Option<Vec<f32>>,
}

/// A single detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label
    pub label: String,

    /// Relative `[top-left-x, top-left-y, width, height]` in `[0, 1]`
    pub bounding_box: [f32; 4],

    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

/// All detections for one image or frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Detections {
    pub detections: Vec<Detection>,
}

impl Detections {
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// Semantic segmentation mask of class indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub height: usize,
    pub width: usize,

    /// Row-major class index per pixel
    pub mask: Vec<u32>,
}

impl Segmentation {
    /// Class index at `(row, col)`
    pub fn at(&self, row: usize, col: usize) -> Option<u32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.mask.get(row * self.width + col).copied()
    }
}

/// Structured label recognized by sample collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_cls", rename_all = "snake_case")]
pub enum Label {
    Classification(Classification),
    Classifications(Classifications),
    Detections(Detections),
    Segmentation(Segmentation),
}

/// A value assigned to one sample or frame field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value (e.g. prediction filtered by a threshold)
    #[default]
    None,

    /// Structured label
    Label(Label),

    /// Numeric vector (embeddings, raw logits)
    Vector(Vec<f32>),

    /// Free-form JSON value
    Json(serde_json::Value),
}

impl FieldValue {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Borrow the label, if this value holds one
    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }

    /// Borrow the vector, if this value holds one
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Label(Label::Classification(_)) => "classification",
            Self::Label(Label::Classifications(_)) => "classifications",
            Self::Label(Label::Detections(_)) => "detections",
            Self::Label(Label::Segmentation(_)) => "segmentation",
            Self::Vector(_) => "vector",
            Self::Json(_) => "json",
        }
    }
}

impl From<Label> for FieldValue {
    fn from(label: Label) -> Self {
        Self::Label(label)
    }
}

impl From<Vec<f32>> for FieldValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Vector(v)
    }
}
