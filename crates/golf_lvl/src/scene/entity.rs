use super::{LightmapSection, Movement, Transform};
use crate::{assets::ModelHandle, format::EntityTag, gpu::GpuContext};
use glam::Mat4;

/// A placeable level object.
pub struct Entity {
    /// Inactive entities stay in the level, but gameplay code is expected to skip them.
    pub active: bool,
    pub kind: EntityKind,
}

pub enum EntityKind {
    Model(ModelEntity),
    BallStart { transform: Transform },
    Hole { transform: Transform },
}

/// A static or moving model instance.
pub struct ModelEntity {
    pub transform: Transform,
    pub model_path: String,
    /// Resolved lazily, see [`crate::Level::resolve_assets`]
    pub model: Option<ModelHandle>,
    pub lightmap_section: LightmapSection,
    pub movement: Movement,
}

impl Entity {
    pub fn model(
        transform: Transform,
        model_path: impl Into<String>,
        lightmap_section: LightmapSection,
        movement: Movement,
    ) -> Self {
        Self {
            active: true,
            kind: EntityKind::Model(ModelEntity {
                transform,
                model_path: model_path.into(),
                model: None,
                lightmap_section,
                movement,
            }),
        }
    }

    pub fn ball_start(transform: Transform) -> Self {
        Self {
            active: true,
            kind: EntityKind::BallStart { transform },
        }
    }

    pub fn hole(transform: Transform) -> Self {
        Self {
            active: true,
            kind: EntityKind::Hole { transform },
        }
    }

    pub fn kind_tag(&self) -> EntityTag {
        match &self.kind {
            EntityKind::Model(_) => EntityTag::Model,
            EntityKind::BallStart { .. } => EntityTag::BallStart,
            EntityKind::Hole { .. } => EntityTag::Hole,
        }
    }

    /// Deep copy of the entity. The lightmap UVs get their own GPU buffer, while the model
    /// handle is shared with the original.
    pub fn make_copy(&self, gpu: &mut dyn GpuContext) -> Self {
        let kind = match &self.kind {
            EntityKind::Model(model) => EntityKind::Model(ModelEntity {
                transform: model.transform,
                model_path: model.model_path.clone(),
                model: model.model.clone(),
                lightmap_section: model.lightmap_section.make_copy(gpu),
                movement: model.movement,
            }),
            EntityKind::BallStart { transform } => EntityKind::BallStart {
                transform: *transform,
            },
            EntityKind::Hole { transform } => EntityKind::Hole {
                transform: *transform,
            },
        };

        Self {
            active: self.active,
            kind,
        }
    }

    /// The base transform, without movement applied.
    pub fn transform(&self) -> &Transform {
        match &self.kind {
            EntityKind::Model(model) => &model.transform,
            EntityKind::BallStart { transform } | EntityKind::Hole { transform } => transform,
        }
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        match &mut self.kind {
            EntityKind::Model(model) => &mut model.transform,
            EntityKind::BallStart { transform } | EntityKind::Hole { transform } => transform,
        }
    }

    /// The transform with movement applied.
    pub fn world_transform(&self) -> Transform {
        match &self.kind {
            EntityKind::Model(model) => model.movement.apply(model.transform),
            _ => *self.transform(),
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.world_transform().model_matrix()
    }

    pub fn as_model(&self) -> Option<&ModelEntity> {
        match &self.kind {
            EntityKind::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_model_mut(&mut self) -> Option<&mut ModelEntity> {
        match &mut self.kind {
            EntityKind::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn movement(&self) -> Option<&Movement> {
        self.as_model().map(|model| &model.movement)
    }

    pub fn movement_mut(&mut self) -> Option<&mut Movement> {
        self.as_model_mut().map(|model| &mut model.movement)
    }

    pub fn lightmap_section(&self) -> Option<&LightmapSection> {
        self.as_model().map(|model| &model.lightmap_section)
    }

    pub fn lightmap_section_mut(&mut self) -> Option<&mut LightmapSection> {
        self.as_model_mut().map(|model| &mut model.lightmap_section)
    }

    pub fn model_path(&self) -> Option<&str> {
        self.as_model().map(|model| model.model_path.as_str())
    }

    /// The resolved model handle. [`None`] for markers, or if the model wasn't resolved yet.
    pub fn model_handle(&self) -> Option<&ModelHandle> {
        self.as_model().and_then(|model| model.model.as_ref())
    }

    pub(crate) fn release_gpu(&mut self, gpu: &mut dyn GpuContext) {
        if let Some(section) = self.lightmap_section_mut() {
            section.release_gpu(gpu);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessGpu;
    use glam::{Vec2, Vec3};

    #[test]
    fn marker_accessors() {
        let mut hole = Entity::hole(Transform::IDENTITY);
        assert_eq!(hole.kind_tag(), EntityTag::Hole);
        assert!(hole.movement().is_none());
        assert!(hole.lightmap_section().is_none());
        assert!(hole.model_path().is_none());
        assert!(hole.model_handle().is_none());

        hole.transform_mut().position = Vec3::new(0.0, 0.0, 5.0);
        assert_eq!(hole.world_transform().position, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn world_transform_applies_movement() {
        let mut entity = Entity::model(
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            "models/gate.obj",
            LightmapSection::none(),
            Movement::linear(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 1.0),
        );
        assert_eq!(entity.transform().position, Vec3::new(0.0, 1.0, 0.0));

        entity.movement_mut().unwrap().advance(0.5);
        assert_eq!(entity.world_transform().position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(entity.model_path(), Some("models/gate.obj"));
    }

    #[test]
    fn copies_are_independent() {
        let mut gpu = HeadlessGpu::new();
        let section = LightmapSection::from_uvs(&mut gpu, "lm0", vec![Vec2::ZERO, Vec2::ONE]);
        let mut original = Entity::model(
            Transform::IDENTITY,
            "models/tree.obj",
            section,
            Movement::none(),
        );

        let mut copy = original.make_copy(&mut gpu);
        assert_eq!(gpu.live_buffers(), 2);

        copy.lightmap_section_mut().unwrap().uvs_mut()[1] = Vec2::splat(0.25);
        copy.transform_mut().position = Vec3::X;
        assert_eq!(original.lightmap_section().unwrap().uvs()[1], Vec2::ONE);
        assert_eq!(original.transform().position, Vec3::ZERO);

        original.release_gpu(&mut gpu);
        copy.release_gpu(&mut gpu);
        assert_eq!(gpu.live_buffers(), 0);
    }
}
