//! labelbridge Core
//!
//! Core types, traits, and utilities shared across labelbridge components.
//!
//! This crate provides:
//! - Label and field value types written back to samples
//! - The sample collection trait and an in-memory dataset
//! - Field path resolution for sample and frame fields
//! - Error types and result handling
//! - Startup latency checks

pub mod collection;
pub mod error;
pub mod field;
pub mod startup;
pub mod types;

pub use collection::{Dataset, Frame, ImageMetadata, Sample, SampleCollection, SampleItem};
pub use error::{Error, Result};
pub use field::{FieldPath, MediaType};
pub use startup::{StartupCheck, StartupThresholds};
pub use types::{
    Classification, Classifications, Detection, Detections, FieldValue, Label, Segmentation,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collection::{Dataset, Sample, SampleCollection, SampleItem};
    pub use crate::error::{Error, Result};
    pub use crate::field::MediaType;
    pub use crate::types::{FieldValue, Label};
}
