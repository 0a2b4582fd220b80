//! Serializers convert raw model output into labels
//!
//! A serializer is picked once per call based on the model's task type and
//! the caller's options, installed on the model for the duration of the
//! call, and applied by the trainer to every raw prediction.

use crate::task::{RawDetection, RawPrediction};
use labelbridge_core::{
    Classification, Classifications, Detection, Detections, Error, FieldValue, ImageMetadata,
    Label, Result, Segmentation,
};
use serde::{Deserialize, Serialize};

/// Threshold used for multi-label classification when none is configured
pub const DEFAULT_MULTI_LABEL_THRESHOLD: f32 = 0.5;

/// Output converter installed on a model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Serializer {
    /// Pass numeric output through unchanged
    #[default]
    Raw,

    /// Logits to `Classification` / `Classifications`
    Classification(ClassificationSerializer),

    /// Absolute boxes to relative `Detections`
    Detection(DetectionSerializer),

    /// Per-pixel logits to a class index mask
    Segmentation,
}

/// Options for classification output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationSerializer {
    #[serde(default)]
    pub multi_label: bool,

    #[serde(default)]
    pub store_logits: bool,

    #[serde(default)]
    pub threshold: Option<f32>,
}

/// Options for detection output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionSerializer {
    /// Detections below this confidence are dropped; `None` keeps all
    #[serde(default)]
    pub threshold: Option<f32>,
}

impl Serializer {
    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Classification(_) => "classification",
            Self::Detection(_) => "detection",
            Self::Segmentation => "segmentation",
        }
    }

    /// Convert one raw prediction. `labels` maps class ids to names.
    pub fn serialize(&self, raw: RawPrediction, labels: &[String]) -> Result<FieldValue> {
        match (self, raw) {
            (Self::Raw, raw) => serialize_raw(raw),
            (Self::Classification(s), RawPrediction::Logits { logits }) => s.serialize(logits, labels),
            (Self::Detection(s), RawPrediction::Boxes { detections, image_size }) => {
                s.serialize(detections, image_size, labels)
            }
            (
                Self::Segmentation,
                RawPrediction::SegmentationLogits {
                    num_classes,
                    height,
                    width,
                    data,
                },
            ) => serialize_segmentation(num_classes, height, width, &data),
            (serializer, raw) => Err(Error::inference(format!(
                "{} serializer cannot handle {} output",
                serializer.name(),
                raw.kind()
            ))),
        }
    }
}

impl ClassificationSerializer {
    fn serialize(&self, logits: Vec<f32>, labels: &[String]) -> Result<FieldValue> {
        if logits.is_empty() {
            return Err(Error::inference("classifier produced empty logits"));
        }

        if self.multi_label {
            let threshold = self.threshold.unwrap_or(DEFAULT_MULTI_LABEL_THRESHOLD);
            let classifications = logits
                .iter()
                .enumerate()
                .map(|(idx, logit)| (idx, sigmoid(*logit)))
                .filter(|(_, prob)| *prob >= threshold)
                .map(|(idx, prob)| Classification::new(label_name(labels, idx), prob))
                .collect();

            let label = Classifications {
                classifications,
                logits: self.store_logits.then_some(logits),
            };
            return Ok(Label::Classifications(label).into());
        }

        let probs = softmax(&logits);
        let (idx, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });

        if let Some(threshold) = self.threshold {
            if confidence < threshold {
                return Ok(FieldValue::None);
            }
        }

        let mut classification = Classification::new(label_name(labels, idx), confidence);
        if self.store_logits {
            classification = classification.with_logits(logits);
        }
        Ok(Label::Classification(classification).into())
    }
}

impl DetectionSerializer {
    fn serialize(
        &self,
        raw: Vec<RawDetection>,
        image_size: ImageMetadata,
        labels: &[String],
    ) -> Result<FieldValue> {
        if image_size.width == 0 || image_size.height == 0 {
            return Err(Error::inference(format!(
                "detector reported empty image size {}x{}",
                image_size.width, image_size.height
            )));
        }

        let w = image_size.width as f32;
        let h = image_size.height as f32;

        let detections = raw
            .into_iter()
            .filter(|d| self.threshold.map_or(true, |t| d.score >= t))
            .map(|d| {
                if !d.bbox.iter().all(|v| v.is_finite()) {
                    return Err(Error::inference(format!(
                        "detector produced non-finite box {:?} for class {}",
                        d.bbox, d.class_id
                    )));
                }

                let [x1, y1, x2, y2] = d.bbox;
                let x = (x1 / w).clamp(0.0, 1.0);
                let y = (y1 / h).clamp(0.0, 1.0);
                let bw = ((x2 - x1) / w).clamp(0.0, 1.0 - x);
                let bh = ((y2 - y1) / h).clamp(0.0, 1.0 - y);
                Ok(Detection {
                    label: label_name(labels, d.class_id),
                    bounding_box: [x, y, bw, bh],
                    confidence: d.score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Label::Detections(Detections { detections }).into())
    }
}

fn serialize_segmentation(
    num_classes: usize,
    height: usize,
    width: usize,
    data: &[f32],
) -> Result<FieldValue> {
    let plane = height * width;
    if num_classes == 0 || data.len() != num_classes * plane {
        return Err(Error::inference(format!(
            "segmentation logits have {} values, expected {}x{}x{}",
            data.len(),
            num_classes,
            height,
            width
        )));
    }

    let mask = (0..plane)
        .map(|px| {
            let mut best = 0usize;
            for class in 1..num_classes {
                if data[class * plane + px] > data[best * plane + px] {
                    best = class;
                }
            }
            best as u32
        })
        .collect();

    Ok(Label::Segmentation(Segmentation { height, width, mask }).into())
}

fn serialize_raw(raw: RawPrediction) -> Result<FieldValue> {
    match raw {
        RawPrediction::Logits { logits: values } | RawPrediction::Vector { values } => {
            Ok(FieldValue::Vector(values))
        }
        other => Ok(FieldValue::Json(serde_json::to_value(other)?)),
    }
}

fn label_name(labels: &[String], idx: usize) -> String {
    labels.get(idx).cloned().unwrap_or_else(|| idx.to_string())
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
