//! Scoped attribute overrides
//!
//! [`SetAttributes`] snapshots a model's [`TaskAttributes`], installs
//! temporary values, and puts the snapshot back when dropped. Restoration
//! therefore happens on every exit path: normal return, `?` propagation,
//! unwinding, and cancellation of the enclosing future.

use crate::data_pipeline::DataPipeline;
use crate::serializer::Serializer;
use crate::task::{Task, TaskAttributes};
use std::ops::{Deref, DerefMut};
use tracing::trace;

/// Values to install for the duration of a [`SetAttributes`] scope
#[derive(Debug, Clone, Default)]
pub struct AttributeOverrides {
    serializer: Option<Serializer>,
    data_pipeline: Option<Option<DataPipeline>>,
}

impl AttributeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install this serializer
    pub fn serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Install this data pipeline (`None` clears it)
    pub fn data_pipeline(mut self, pipeline: Option<DataPipeline>) -> Self {
        self.data_pipeline = Some(pipeline);
        self
    }
}

/// Guard that restores a model's attributes on drop
pub struct SetAttributes<'a, M: Task + ?Sized> {
    model: &'a mut M,
    saved: Option<TaskAttributes>,
}

impl<'a, M: Task + ?Sized> SetAttributes<'a, M> {
    /// Snapshot the current attributes and apply `overrides`
    pub fn new(model: &'a mut M, overrides: AttributeOverrides) -> Self {
        let saved = model.attributes().clone();

        let attrs = model.attributes_mut();
        if let Some(serializer) = overrides.serializer {
            attrs.serializer = serializer;
        }
        if let Some(pipeline) = overrides.data_pipeline {
            attrs.data_pipeline = pipeline;
        }

        trace!(model = %model.name(), "Installed temporary model attributes");

        Self {
            model,
            saved: Some(saved),
        }
    }

    /// Attributes that will be restored
    pub fn saved(&self) -> Option<&TaskAttributes> {
        self.saved.as_ref()
    }
}

impl<M: Task + ?Sized> Deref for SetAttributes<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        &*self.model
    }
}

impl<M: Task + ?Sized> DerefMut for SetAttributes<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut *self.model
    }
}

impl<M: Task + ?Sized> Drop for SetAttributes<'_, M> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.model.attributes_mut() = saved;
            trace!(model = %self.model.name(), "Restored model attributes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_pipeline::ModelInput;
    use crate::serializer::DetectionSerializer;
    use crate::task::{RawPrediction, TaskKind};
    use async_trait::async_trait;
    use labelbridge_core::Result;

    struct Stub {
        attrs: TaskAttributes,
    }

    #[async_trait]
    impl Task for Stub {
        fn name(&self) -> &str {
            "stub"
        }

        fn kind(&self) -> TaskKind {
            TaskKind::Detector
        }

        fn attributes(&self) -> &TaskAttributes {
            &self.attrs
        }

        fn attributes_mut(&mut self) -> &mut TaskAttributes {
            &mut self.attrs
        }

        async fn forward(&self, _batch: &[ModelInput]) -> Result<Vec<RawPrediction>> {
            Ok(Vec::new())
        }
    }

    fn stub() -> Stub {
        Stub {
            attrs: TaskAttributes::default().with_data_pipeline(DataPipeline::default().with_resize(8, 8)),
        }
    }

    #[test]
    fn test_overrides_visible_inside_scope() {
        let mut model = stub();
        let detection = Serializer::Detection(DetectionSerializer { threshold: Some(0.4) });

        {
            let guard = SetAttributes::new(&mut model, AttributeOverrides::new().serializer(detection.clone()));
            assert_eq!(guard.attributes().serializer, detection);
            assert_eq!(guard.saved().unwrap().serializer, Serializer::Raw);
        }

        assert_eq!(model.attributes().serializer, Serializer::Raw);
    }

    #[test]
    fn test_restores_mutations_made_inside_scope() {
        let mut model = stub();
        let before = model.attributes().clone();

        {
            let mut guard = SetAttributes::new(&mut model, AttributeOverrides::new());
            guard.attributes_mut().data_pipeline = None;
            guard.attributes_mut().serializer = Serializer::Segmentation;
        }

        assert_eq!(model.attributes(), &before);
    }

    #[test]
    fn test_restores_on_panic() {
        let mut model = stub();
        let before = model.attributes().clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = SetAttributes::new(
                &mut model,
                AttributeOverrides::new()
                    .serializer(Serializer::Segmentation)
                    .data_pipeline(None),
            );
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(model.attributes(), &before);
    }
}
