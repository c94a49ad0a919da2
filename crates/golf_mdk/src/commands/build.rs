use clap::Args;
use glam::{Quat, Vec2, Vec3};
use golf_lvl::{
    gpu::GpuContext, DirectoryStorage, Entity, HeadlessGpu, Level, LightmapImage, LightmapSection,
    Material, Movement, Transform,
};
use golf_utils::{ok, AnyResult, AnyhowResultExt};
use log::{info, warn};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Args)]
pub struct BuildCommand {
    /// Output file
    #[clap(long, short = 'o')]
    pub output: PathBuf,
    /// Specification file to use
    pub specification: PathBuf,
}

impl crate::Command for BuildCommand {
    fn run(self) -> AnyResult {
        let spec_text = fs::read_to_string(&self.specification)
            .for_path("read the specification", &self.specification)?;
        let spec = toml::from_str::<LevelSpecification>(&spec_text)
            .for_path("parse the specification", &self.specification)?;

        // Relative image paths are resolved against the specification's directory
        let spec_dir = self
            .specification
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut gpu = HeadlessGpu::new();
        let mut level = Level::new();
        let result = spec.build(&mut gpu, &spec_dir, &mut level).and_then(|_| {
            for issue in level.check_playable() {
                warn!("The level isn't playable: {issue}");
            }

            let (root, file_name) = split_output(&self.output)?;
            println!(" : Writing {}...", self.output.display());
            level
                .save(&mut DirectoryStorage::new(root), &file_name)
                .for_path("write", &self.output)
        });
        level.unload(&mut gpu);
        result
    }
}

fn split_output(output: &Path) -> AnyResult<(PathBuf, String)> {
    let file_name = output
        .file_name()
        .otherwise("the output path has no file name")?
        .to_string_lossy()
        .into_owned();
    let root = output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok((root, file_name))
}

#[derive(Debug, Error)]
pub enum SpecificationError {
    #[error("lightmap `{name}` is {width}x{height}, which is too large")]
    LightmapTooLarge { name: String, width: u32, height: u32 },
    #[error("lightmap `{0}` has negative dimensions")]
    NegativeLightmapSize(String),
    #[error("movement length must be positive, got {0}")]
    InvalidMovementLength(f32),
}

#[derive(Debug, Deserialize)]
struct LevelSpecification {
    #[serde(default)]
    lightmaps: Vec<LightmapSpecification>,
    #[serde(default)]
    materials: Vec<MaterialSpecification>,
    #[serde(default)]
    entities: Vec<EntitySpecification>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct LightmapSpecification {
    name: String,
    resolution: i32,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(flatten)]
    source: LightmapSource,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LightmapSource {
    /// Any image, converted to 8-bit luma
    Image { image: PathBuf },
    /// An image filled with a single value
    Fill {
        width: i32,
        height: i32,
        #[serde(default)]
        fill: u8,
    },
}

#[derive(Debug, Deserialize)]
struct MaterialSpecification {
    name: String,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default)]
    friction: f32,
    #[serde(default)]
    restitution: f32,
    #[serde(flatten)]
    kind: MaterialKindSpecification,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum MaterialKindSpecification {
    Texture { path: String },
    Color { rgb: [f32; 3] },
    DiffuseColor { rgb: [f32; 3] },
    Environment,
}

#[derive(Debug, Deserialize)]
struct EntitySpecification {
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default)]
    position: [f32; 3],
    /// Quaternion, xyzw
    rotation: Option<[f32; 4]>,
    scale: Option<[f32; 3]>,
    #[serde(flatten)]
    kind: EntityKindSpecification,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EntityKindSpecification {
    Model {
        model: String,
        lightmap: Option<SectionSpecification>,
        movement: Option<MovementSpecification>,
    },
    BallStart,
    Hole,
}

#[derive(Debug, Deserialize)]
struct SectionSpecification {
    name: String,
    uvs: Vec<[f32; 2]>,
}

#[derive(Debug, Deserialize)]
struct MovementSpecification {
    from: [f32; 3],
    to: [f32; 3],
    length: f32,
    #[serde(default)]
    t: f32,
}

impl LevelSpecification {
    fn build(&self, gpu: &mut dyn GpuContext, spec_dir: &Path, level: &mut Level) -> AnyResult {
        println!(" : Building lightmaps...");
        for lightmap in &self.lightmaps {
            println!("  - Building {}...", lightmap.name);
            let mut image = lightmap.build(gpu, spec_dir)?;
            image.active = lightmap.active;
            level.lightmap_images.push(image);
        }

        println!(" : Building materials...");
        for material in &self.materials {
            level.materials.push(material.build());
        }

        println!(" : Building entities...");
        for entity in &self.entities {
            level.entities.push(entity.build(gpu)?);
        }

        info!(
            "Built {} lightmaps, {} materials and {} entities",
            level.lightmap_images.len(),
            level.materials.len(),
            level.entities.len()
        );
        ok()
    }
}

impl LightmapSpecification {
    fn build(&self, gpu: &mut dyn GpuContext, spec_dir: &Path) -> AnyResult<LightmapImage> {
        let (width, height, data) = match &self.source {
            LightmapSource::Image { image: source } => {
                let path = spec_dir.join(source);
                let luma = image::open(&path)
                    .for_path("open lightmap image", &path)?
                    .into_luma8();

                let too_large = || SpecificationError::LightmapTooLarge {
                    name: self.name.clone(),
                    width: luma.width(),
                    height: luma.height(),
                };
                let width = i32::try_from(luma.width()).map_err(|_| too_large())?;
                let height = i32::try_from(luma.height()).map_err(|_| too_large())?;
                (width, height, luma.into_raw())
            }
            LightmapSource::Fill {
                width,
                height,
                fill,
            } => {
                if *width < 0 || *height < 0 {
                    return Err(SpecificationError::NegativeLightmapSize(self.name.clone()).into());
                }
                let pixels = *width as usize * *height as usize * golf_lvl::LIGHTMAP_CHANNELS;
                (*width, *height, vec![*fill; pixels])
            }
        };

        Ok(LightmapImage::new(
            gpu,
            self.name.as_str(),
            self.resolution,
            width,
            height,
            data,
        ))
    }
}

impl MaterialSpecification {
    fn build(&self) -> Material {
        let material = match &self.kind {
            MaterialKindSpecification::Texture { path } => Material::texture(path.as_str()),
            MaterialKindSpecification::Color { rgb } => Material::color(Vec3::from_array(*rgb)),
            MaterialKindSpecification::DiffuseColor { rgb } => {
                Material::diffuse_color(Vec3::from_array(*rgb))
            }
            MaterialKindSpecification::Environment => Material::environment(),
        };

        let mut material = material
            .named(self.name.as_str())
            .with_friction(self.friction)
            .with_restitution(self.restitution);
        material.active = self.active;
        material
    }
}

impl EntitySpecification {
    fn build(&self, gpu: &mut dyn GpuContext) -> AnyResult<Entity> {
        let mut transform = Transform::from_position(Vec3::from_array(self.position));
        if let Some(rotation) = self.rotation {
            transform.set_rotation(Quat::from_array(rotation));
        }
        if let Some(scale) = self.scale {
            transform.scale = Vec3::from_array(scale);
        }

        let mut entity = match &self.kind {
            EntityKindSpecification::Model {
                model,
                lightmap,
                movement,
            } => {
                let movement = match movement {
                    Some(movement) => {
                        if !(movement.length.is_finite() && movement.length > 0.0) {
                            return Err(
                                SpecificationError::InvalidMovementLength(movement.length).into()
                            );
                        }
                        let mut result = Movement::linear(
                            Vec3::from_array(movement.from),
                            Vec3::from_array(movement.to),
                            movement.length,
                        );
                        result.advance(movement.t);
                        result
                    }
                    None => Movement::none(),
                };

                // Nothing below may fail, a dropped section would leak its buffer
                let section = match lightmap {
                    Some(section) => LightmapSection::from_uvs(
                        gpu,
                        section.name.as_str(),
                        section.uvs.iter().copied().map(Vec2::from_array).collect(),
                    ),
                    None => LightmapSection::none(),
                };

                Entity::model(transform, model.as_str(), section, movement)
            }
            EntityKindSpecification::BallStart => Entity::ball_start(transform),
            EntityKindSpecification::Hole => Entity::hole(transform),
        };

        entity.active = self.active;
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use golf_lvl::{EntityKind, MaterialKind};

    const SPEC: &str = r#"
        [[lightmaps]]
        name = "lm0"
        resolution = 16
        width = 4
        height = 2
        fill = 128

        [[materials]]
        name = "grass"
        friction = 0.5
        kind = "color"
        rgb = [0.0, 1.0, 0.0]

        [[materials]]
        name = "sand"
        kind = "texture"
        path = "textures/sand.png"

        [[entities]]
        kind = "ball_start"
        position = [0.0, 0.0, 5.0]

        [[entities]]
        kind = "hole"

        [[entities]]
        kind = "model"
        model = "models/windmill.obj"
        scale = [2.0, 2.0, 2.0]
        lightmap = { name = "lm0", uvs = [[0.0, 0.0], [1.0, 1.0]] }
        movement = { from = [0.0, 0.0, 0.0], to = [0.0, 4.0, 0.0], length = 2.0, t = 1.0 }
    "#;

    #[test]
    fn specification_builds_a_level() {
        let spec: LevelSpecification = toml::from_str(SPEC).unwrap();

        let mut gpu = HeadlessGpu::new();
        let mut level = Level::new();
        spec.build(&mut gpu, Path::new("."), &mut level).unwrap();

        let lm0 = level.get_lightmap_image("lm0").unwrap();
        assert_eq!(lm0.data(), &[128; 8]);

        let grass = level.get_material("grass").unwrap();
        assert_eq!(grass.friction, 0.5);
        assert_eq!(grass.rgb(), Some(Vec3::new(0.0, 1.0, 0.0)));
        assert!(matches!(
            level.get_material("sand").unwrap().kind,
            MaterialKind::Texture { .. }
        ));

        assert!(matches!(level.entities[0].kind, EntityKind::BallStart { .. }));
        let windmill = &level.entities[2];
        assert_eq!(windmill.world_transform().position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(windmill.lightmap_section().unwrap().uvs().len(), 2);
        assert_eq!(gpu.live_buffers(), 1);
        assert!(level.check_playable().is_empty());

        level.unload(&mut gpu);
    }

    #[test]
    fn invalid_movement_is_rejected() {
        let spec: LevelSpecification = toml::from_str(
            r#"
            [[entities]]
            kind = "model"
            model = "models/gate.obj"
            movement = { from = [0.0, 0.0, 0.0], to = [1.0, 0.0, 0.0], length = 0.0 }
            lightmap = { name = "lm0", uvs = [[0.0, 0.0], [1.0, 1.0]] }
            "#,
        )
        .unwrap();

        let mut gpu = HeadlessGpu::new();
        let mut level = Level::new();
        let error = spec.build(&mut gpu, Path::new("."), &mut level).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<SpecificationError>(),
            Some(SpecificationError::InvalidMovementLength(_))
        ));
        assert_eq!(gpu.live_buffers(), 0);
        level.unload(&mut gpu);
    }

    #[test]
    fn output_path_is_split() {
        let (root, name) = split_output(Path::new("out/levels/hole1.lvl")).unwrap();
        assert_eq!(root, Path::new("out/levels"));
        assert_eq!(name, "hole1.lvl");

        let (root, name) = split_output(Path::new("hole1.lvl")).unwrap();
        assert_eq!(root, Path::new(""));
        assert_eq!(name, "hole1.lvl");
    }
}
