//! Field path resolution for sample and frame fields

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that addresses frame-level fields of video samples
pub const FRAMES_PREFIX: &str = "frames.";

/// Media type of a sample collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// A resolved write destination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPath {
    /// Top-level field on each sample
    Sample(String),

    /// Field on each frame of each video sample
    Frame(String),
}

impl FieldPath {
    /// Resolve a user-supplied field name against a collection's media type.
    ///
    /// Video collections always write per frame, so `"frames.x"` and `"x"`
    /// resolve to the same frame field. Image collections have no frames.
    pub fn resolve(field: &str, media_type: MediaType) -> Result<Self> {
        let (has_prefix, name) = match field.strip_prefix(FRAMES_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, field),
        };

        if name.is_empty() {
            return Err(Error::invalid_field(field, "field name is empty"));
        }

        match media_type {
            MediaType::Video => Ok(Self::Frame(name.to_string())),
            MediaType::Image if has_prefix => Err(Error::invalid_field(
                field,
                "frame fields are only available on video collections",
            )),
            MediaType::Image => Ok(Self::Sample(name.to_string())),
        }
    }

    /// Bare field name without any prefix
    pub fn name(&self) -> &str {
        match self {
            Self::Sample(name) | Self::Frame(name) => name,
        }
    }

    pub fn is_frame_field(&self) -> bool {
        matches!(self, Self::Frame(_))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample(name) => write!(f, "{name}"),
            Self::Frame(name) => write!(f, "{FRAMES_PREFIX}{name}"),
        }
    }
}
