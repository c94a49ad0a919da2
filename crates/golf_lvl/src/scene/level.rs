use super::{
    Entity, EntityKind, LightmapImage, LightmapSection, LinearMovement, Material, MaterialKind,
    ModelEntity, Movement,
};
use crate::{
    assets::{AssetResolver, Resolution},
    format::{
        to_c_string, EntityKindRecord, EntityRecord, LevelFile, LightmapImageInfo,
        LightmapImageRecord, LightmapSectionRecord, MaterialKindRecord, MaterialRecord,
        ModelRecord, MovementRecord, MovementTag, UvList,
    },
    gpu::GpuContext,
    storage::Storage,
    FormatError, LevelError,
};
use log::{debug, trace, warn};
use std::{fmt, mem};

/// The aggregate root of a single hole.
///
/// Collections keep their insertion order, which is also the order of records in saved files.
/// Nothing is ever compacted, so indices stay stable for the level's lifetime. Removing things
/// is done by clearing their `active` flags.
///
/// The level owns the GPU resources created for its lightmaps, and they must be released with
/// [`Level::unload`] before the level is dropped.
#[derive(Default)]
pub struct Level {
    pub lightmap_images: Vec<LightmapImage>,
    pub materials: Vec<Material>,
    pub entities: Vec<Entity>,
}

/// A reason why a level can't be played, reported by [`Level::check_playable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayabilityIssue {
    MissingBallStart,
    MultipleBallStarts(usize),
    MissingHole,
    /// A model entity refers to a lightmap image that doesn't exist, or is inactive.
    MissingLightmap { entity: usize, lightmap_name: String },
}

impl fmt::Display for PlayabilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayabilityIssue::MissingBallStart => write!(f, "no ball start"),
            PlayabilityIssue::MultipleBallStarts(count) => write!(f, "{count} ball starts"),
            PlayabilityIssue::MissingHole => write!(f, "no hole"),
            PlayabilityIssue::MissingLightmap {
                entity,
                lightmap_name,
            } => write!(f, "entity #{entity} uses missing lightmap `{lightmap_name}`"),
        }
    }
}

impl Level {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lightmap_images.is_empty() && self.materials.is_empty() && self.entities.is_empty()
    }

    /// Finds the first active material with the given name.
    pub fn get_material(&self, name: &str) -> Option<&Material> {
        self.material_index(name).map(|index| &self.materials[index])
    }

    pub fn get_material_mut(&mut self, name: &str) -> Option<&mut Material> {
        self.material_index(name)
            .map(|index| &mut self.materials[index])
    }

    pub fn material_index(&self, name: &str) -> Option<usize> {
        self.materials
            .iter()
            .position(|material| material.active && material.name == name)
    }

    /// Finds the first active lightmap image with the given name.
    pub fn get_lightmap_image(&self, name: &str) -> Option<&LightmapImage> {
        self.lightmap_images
            .iter()
            .find(|image| image.active && image.name == name)
    }

    /// Resolves a lightmap section's reference.
    pub fn lightmap_image_for(&self, section: &LightmapSection) -> Option<&LightmapImage> {
        if !section.has_lightmap() {
            return None;
        }
        self.get_lightmap_image(&section.lightmap_name)
    }

    /// Converts the level into file records. GPU and asset handles are left out.
    pub fn to_file(&self) -> Result<LevelFile, FormatError> {
        let lightmap_images = self
            .lightmap_images
            .iter()
            .map(|image| {
                Ok(LightmapImageRecord {
                    name: to_c_string("lightmap", &image.name)?,
                    info: LightmapImageInfo {
                        active: image.active,
                        resolution: image.resolution,
                        width: image.width(),
                        height: image.height(),
                    },
                    data: image.data().to_vec(),
                })
            })
            .collect::<Result<Vec<_>, FormatError>>()?;

        let materials = self
            .materials
            .iter()
            .map(|material| {
                Ok(MaterialRecord {
                    name: to_c_string("material", &material.name)?,
                    active: material.active,
                    friction: material.friction,
                    restitution: material.restitution,
                    kind: match &material.kind {
                        MaterialKind::Texture { path, .. } => {
                            MaterialKindRecord::Texture(to_c_string("texture", path)?)
                        }
                        MaterialKind::Color(rgb) => MaterialKindRecord::Color(*rgb),
                        MaterialKind::DiffuseColor(rgb) => MaterialKindRecord::DiffuseColor(*rgb),
                        MaterialKind::Environment => MaterialKindRecord::Environment,
                    },
                })
            })
            .collect::<Result<Vec<_>, FormatError>>()?;

        let entities = self
            .entities
            .iter()
            .map(|entity| {
                Ok(EntityRecord {
                    active: entity.active,
                    transform: *entity.transform(),
                    kind: match &entity.kind {
                        EntityKind::Model(model) => EntityKindRecord::Model(model_record(model)?),
                        EntityKind::BallStart { .. } => EntityKindRecord::BallStart,
                        EntityKind::Hole { .. } => EntityKindRecord::Hole,
                    },
                })
            })
            .collect::<Result<Vec<_>, FormatError>>()?;

        Ok(LevelFile {
            lightmap_images,
            materials,
            entities,
        })
    }

    /// Builds a level out of file records, creating GPU resources for it. Asset handles are
    /// left unresolved.
    pub fn from_file(gpu: &mut dyn GpuContext, file: LevelFile) -> Self {
        let lightmap_images = file
            .lightmap_images
            .into_iter()
            .map(|record| {
                let mut image = LightmapImage::new(
                    gpu,
                    record.name.to_string_lossy(),
                    record.info.resolution,
                    record.info.width,
                    record.info.height,
                    record.data,
                );
                image.active = record.info.active;
                image
            })
            .collect();

        let materials = file
            .materials
            .into_iter()
            .map(|record| Material {
                name: record.name.to_string_lossy().into_owned(),
                active: record.active,
                friction: record.friction,
                restitution: record.restitution,
                kind: match record.kind {
                    MaterialKindRecord::Texture(path) => MaterialKind::Texture {
                        path: path.to_string_lossy().into_owned(),
                        texture: None,
                    },
                    MaterialKindRecord::Color(rgb) => MaterialKind::Color(rgb),
                    MaterialKindRecord::DiffuseColor(rgb) => MaterialKind::DiffuseColor(rgb),
                    MaterialKindRecord::Environment => MaterialKind::Environment,
                },
            })
            .collect();

        let entities = file
            .entities
            .into_iter()
            .map(|record| {
                let mut entity = match record.kind {
                    EntityKindRecord::Model(model) => Entity::model(
                        record.transform,
                        model.model_path.to_string_lossy(),
                        LightmapSection::from_uvs(
                            gpu,
                            model.lightmap_section.lightmap_name.to_string_lossy(),
                            model.lightmap_section.uvs.0,
                        ),
                        movement_from_record(&model.movement),
                    ),
                    EntityKindRecord::BallStart => Entity::ball_start(record.transform),
                    EntityKindRecord::Hole => Entity::hole(record.transform),
                };
                entity.active = record.active;
                entity
            })
            .collect();

        Self {
            lightmap_images,
            materials,
            entities,
        }
    }

    /// Serializes the level into level file bytes.
    pub fn save_to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        self.to_file()?.to_bytes()
    }

    /// Serializes the level and writes it through the storage. Nothing is written if the level
    /// can't be serialized.
    pub fn save(&self, storage: &mut dyn Storage, path: &str) -> Result<(), LevelError> {
        let bytes = self.save_to_bytes()?;
        storage.write_all(path, &bytes)?;
        debug!(
            "Saved level `{path}` ({} lightmaps, {} materials, {} entities, {} bytes)",
            self.lightmap_images.len(),
            self.materials.len(),
            self.entities.len(),
            bytes.len()
        );
        Ok(())
    }

    /// Replaces the level's contents with the ones parsed out of `data`.
    ///
    /// The whole file is parsed and validated before anything else happens. On failure the
    /// level is left untouched. On success its previous contents are unloaded.
    pub fn load(
        &mut self,
        gpu: &mut dyn GpuContext,
        path: &str,
        data: &[u8],
    ) -> Result<(), LevelError> {
        let file = LevelFile::from_bytes(data).map_err(|error| {
            warn!("Couldn't load level `{path}`: {error}");
            error
        })?;

        let mut previous = mem::replace(self, Self::from_file(gpu, file));
        previous.unload(gpu);

        debug!(
            "Loaded level `{path}` ({} lightmaps, {} materials, {} entities)",
            self.lightmap_images.len(),
            self.materials.len(),
            self.entities.len()
        );
        Ok(())
    }

    /// Reads a level through the storage and loads it, see [`Level::load`].
    pub fn load_from(
        &mut self,
        storage: &dyn Storage,
        gpu: &mut dyn GpuContext,
        path: &str,
    ) -> Result<(), LevelError> {
        let data = storage.read_all(path)?;
        self.load(gpu, path, &data)
    }

    /// Recreates GPU resources of lightmaps and sections that were modified.
    pub fn refresh_gpu(&mut self, gpu: &mut dyn GpuContext) {
        for image in &mut self.lightmap_images {
            image.refresh_gpu(gpu);
        }
        for section in self
            .entities
            .iter_mut()
            .filter_map(Entity::lightmap_section_mut)
        {
            section.refresh_gpu(gpu);
        }
    }

    /// Destroys every GPU resource owned by the level, releases asset handles, and empties it.
    /// Calling it on an empty level does nothing.
    pub fn unload(&mut self, gpu: &mut dyn GpuContext) {
        if self.is_empty() {
            return;
        }

        for image in &mut self.lightmap_images {
            image.release_gpu(gpu);
        }
        for entity in &mut self.entities {
            entity.release_gpu(gpu);
        }

        trace!(
            "Unloaded {} lightmaps, {} materials and {} entities",
            self.lightmap_images.len(),
            self.materials.len(),
            self.entities.len()
        );

        self.lightmap_images.clear();
        self.materials.clear();
        self.entities.clear();
    }

    /// Asks the resolver for every unresolved texture and model. Returns the amount of assets
    /// that are still pending.
    pub fn resolve_assets(&mut self, resolver: &mut dyn AssetResolver) -> usize {
        let mut pending = 0;

        for material in &mut self.materials {
            if let MaterialKind::Texture {
                path,
                texture: texture @ None,
            } = &mut material.kind
            {
                match resolver.resolve_texture(path) {
                    Resolution::Ready(handle) => *texture = Some(handle),
                    Resolution::Pending => pending += 1,
                }
            }
        }

        for entity in &mut self.entities {
            if let EntityKind::Model(ModelEntity {
                model_path,
                model: model @ None,
                ..
            }) = &mut entity.kind
            {
                match resolver.resolve_model(model_path) {
                    Resolution::Ready(handle) => *model = Some(handle),
                    Resolution::Pending => pending += 1,
                }
            }
        }

        if pending > 0 {
            trace!("{pending} level assets still pending");
        }
        pending
    }

    /// Checks the obligations of a playable level: exactly one ball start, at least one hole,
    /// and existing lightmaps. Inactive entities are ignored.
    pub fn check_playable(&self) -> Vec<PlayabilityIssue> {
        let mut issues = vec![];
        let active = || self.entities.iter().enumerate().filter(|(_, e)| e.active);

        let ball_starts = active()
            .filter(|(_, e)| matches!(e.kind, EntityKind::BallStart { .. }))
            .count();
        match ball_starts {
            0 => issues.push(PlayabilityIssue::MissingBallStart),
            1 => {}
            count => issues.push(PlayabilityIssue::MultipleBallStarts(count)),
        }

        if !active().any(|(_, e)| matches!(e.kind, EntityKind::Hole { .. })) {
            issues.push(PlayabilityIssue::MissingHole);
        }

        for (index, entity) in active() {
            let Some(section) = entity.lightmap_section() else {
                continue;
            };
            if section.has_lightmap() && self.lightmap_image_for(section).is_none() {
                issues.push(PlayabilityIssue::MissingLightmap {
                    entity: index,
                    lightmap_name: section.lightmap_name.clone(),
                });
            }
        }

        issues
    }
}

fn model_record(model: &ModelEntity) -> Result<ModelRecord, FormatError> {
    Ok(ModelRecord {
        model_path: to_c_string("model", &model.model_path)?,
        movement: match model.movement {
            Movement::None => MovementRecord::NONE,
            Movement::Linear(linear) => {
                MovementRecord::linear(linear.p0, linear.p1, linear.length, linear.t)
            }
        },
        lightmap_section: LightmapSectionRecord {
            lightmap_name: to_c_string("lightmap", &model.lightmap_section.lightmap_name)?,
            uvs: UvList(model.lightmap_section.uvs().to_vec()),
        },
    })
}

fn movement_from_record(record: &MovementRecord) -> Movement {
    match record.kind {
        MovementTag::None => Movement::None,
        MovementTag::Linear => Movement::Linear(LinearMovement {
            p0: record.p0,
            p1: record.p1,
            length: record.length,
            t: record.t,
        }),
    }
}
