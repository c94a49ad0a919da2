use super::load_level;
use clap::Args;
use golf_lvl::{EntityKind, HeadlessGpu, Level, MaterialKind, Movement};
use golf_utils::{ok, AnyResult};
use itertools::Itertools;
use std::{fmt::Write, path::PathBuf};

#[derive(Args)]
pub struct InfoCommand {
    /// Level file to inspect
    pub file: PathBuf,
}

impl crate::Command for InfoCommand {
    fn run(self) -> AnyResult {
        let mut gpu = HeadlessGpu::new();
        let mut level = load_level(&self.file, &mut gpu)?;
        print!("{}", describe(&level)?);
        level.unload(&mut gpu);
        ok()
    }
}

/// Builds a human readable listing of everything in the level.
fn describe(level: &Level) -> AnyResult<String> {
    let mut out = String::new();
    let inactive = |active: bool| if active { "" } else { " (inactive)" };

    writeln!(out, "Lightmaps ({}):", level.lightmap_images.len())?;
    for (index, image) in level.lightmap_images.iter().enumerate() {
        writeln!(
            out,
            "  #{index} `{}`: {}x{}, resolution {}{}",
            image.name,
            image.width(),
            image.height(),
            image.resolution,
            inactive(image.active)
        )?;
    }

    writeln!(out, "Materials ({}):", level.materials.len())?;
    for (index, material) in level.materials.iter().enumerate() {
        let kind = match &material.kind {
            MaterialKind::Texture { path, .. } => format!("texture `{path}`"),
            MaterialKind::Color(rgb) => format!("color {}", rgb.to_array().iter().join(", ")),
            MaterialKind::DiffuseColor(rgb) => {
                format!("diffuse color {}", rgb.to_array().iter().join(", "))
            }
            MaterialKind::Environment => String::from("environment"),
        };
        writeln!(
            out,
            "  #{index} `{}`: {kind}, friction {}, restitution {}{}",
            material.name,
            material.friction,
            material.restitution,
            inactive(material.active)
        )?;
    }

    writeln!(out, "Entities ({}):", level.entities.len())?;
    for (index, entity) in level.entities.iter().enumerate() {
        let position = entity.transform().position;
        writeln!(
            out,
            "  #{index} {} at ({}, {}, {}){}",
            entity.kind_tag(),
            position.x,
            position.y,
            position.z,
            inactive(entity.active)
        )?;

        if let EntityKind::Model(model) = &entity.kind {
            writeln!(out, "      model `{}`", model.model_path)?;
            if model.lightmap_section.has_lightmap() {
                writeln!(
                    out,
                    "      lightmap `{}`, {} UVs",
                    model.lightmap_section.lightmap_name,
                    model.lightmap_section.uvs().len()
                )?;
            }
            if let Movement::Linear(linear) = &model.movement {
                writeln!(
                    out,
                    "      moves from {} to {} over {} (at {})",
                    linear.p0, linear.p1, linear.length, linear.t
                )?;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use golf_lvl::{Entity, LightmapImage, LightmapSection, Material, Transform};

    #[test]
    fn listing_mentions_everything() {
        let mut gpu = HeadlessGpu::new();
        let mut level = Level::new();
        level
            .lightmap_images
            .push(LightmapImage::new(&mut gpu, "lm0", 16, 2, 2, vec![0; 4]));
        level.materials.push(Material::environment().named("sky"));
        level.materials[0].active = false;
        level.entities.push(Entity::model(
            Transform::IDENTITY,
            "models/windmill.obj",
            LightmapSection::none(),
            Movement::linear(Vec3::ZERO, Vec3::X, 1.0),
        ));
        level.entities.push(Entity::hole(Transform::IDENTITY));

        let listing = describe(&level).unwrap();
        assert!(listing.contains("#0 `lm0`: 2x2, resolution 16"));
        assert!(listing.contains("`sky`: environment, friction 0, restitution 0 (inactive)"));
        assert!(listing.contains("model `models/windmill.obj`"));
        assert!(listing.contains("#1 Hole at (0, 0, 0)"));
        assert!(!listing.contains("lightmap `"));

        level.unload(&mut gpu);
    }
}
