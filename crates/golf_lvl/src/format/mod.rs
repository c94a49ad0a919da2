//! Raw level file records
//!
//! The types in this module mirror the node layout of a level file one to one, and are what
//! the scene model gets converted to and from while saving and loading. They don't hold any
//! GPU or asset handles.
//!
//! ## Layout
//! ```text
//! GLVL                  root node
//!   HEAD                LevelFileHeader, always the first child
//!   LMAP*               LightmapImageRecord
//!   MATL*               MaterialRecord
//!   ENTI*               EntityRecord
//! ```

use crate::{
    node::{
        read_node_children, read_node_header, NodeHeader, NodeName, NodeRead, NodeWrite,
        NodeWriter,
    },
    scene::Transform,
    FormatError, LEVEL_FORMAT_VERSION, LIGHTMAP_CHANNELS, LIGHTMAP_NAME_MAX, MATERIAL_NAME_MAX,
    PATH_MAX,
};
use golf_proc::PackedData;
use golf_utils::{ok, AnyResult};
use log::trace;
use std::{
    ffi::CString,
    io::{Cursor, Read, Seek, Write},
};

mod entity;
mod lightmap;
mod material;

pub use entity::*;
pub use lightmap::*;
pub use material::*;

/// Name of the root node of every level file.
pub const LEVEL_MAGIC: NodeName = NodeName::from_str("GLVL");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PackedData)]
pub struct LevelFileHeader {
    pub version: u32,
    pub lightmap_count: u32,
    pub material_count: u32,
    pub entity_count: u32,
}

/// Contents of a whole level file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelFile {
    pub lightmap_images: Vec<LightmapImageRecord>,
    pub materials: Vec<MaterialRecord>,
    pub entities: Vec<EntityRecord>,
}

impl LevelFile {
    /// Parses and validates a complete level file.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let mut r = Cursor::new(data);
        let root = read_node_header(&mut r).map_err(|e| FormatError::from_any(e.into()))?;

        if root.name != LEVEL_MAGIC {
            return Err(FormatError::BadMagic(root.name.to_string()));
        }

        let data_len = data.len() as u64;
        if root.payload_end() > data_len {
            return Err(FormatError::Truncated);
        }
        if root.payload_end() < data_len {
            return Err(FormatError::InconsistentLength(format!(
                "{} bytes of trailing data after the root node",
                data_len - root.payload_end()
            )));
        }

        let file = Self::read_node_at(&mut r, root).map_err(FormatError::from_any)?;
        file.validate()?;
        Ok(file)
    }

    /// Validates and serializes the level file.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        self.validate()?;

        let mut cursor = Cursor::new(Vec::new());
        let mut writer =
            NodeWriter::new(&mut cursor, LEVEL_MAGIC).map_err(FormatError::from_any)?;
        self.write_node(&mut writer)
            .and_then(|_| writer.finish())
            .map_err(FormatError::from_any)?;
        drop(writer);

        Ok(cursor.into_inner())
    }

    pub fn header(&self) -> LevelFileHeader {
        LevelFileHeader {
            version: LEVEL_FORMAT_VERSION,
            lightmap_count: self.lightmap_images.len() as u32,
            material_count: self.materials.len() as u32,
            entity_count: self.entities.len() as u32,
        }
    }

    /// Checks every constraint of the format that the node layout itself can't express.
    pub fn validate(&self) -> Result<(), FormatError> {
        for lightmap in &self.lightmap_images {
            validate_name("lightmap", &lightmap.name, LIGHTMAP_NAME_MAX)?;

            let info = &lightmap.info;
            if info.width < 0 || info.height < 0 {
                return Err(FormatError::Malformed(format!(
                    "lightmap `{}` has negative dimensions {}x{}",
                    lightmap.name.to_string_lossy(),
                    info.width,
                    info.height
                )));
            }

            let expected = info.width as usize * info.height as usize * LIGHTMAP_CHANNELS;
            if lightmap.data.len() != expected {
                return Err(FormatError::InconsistentLength(format!(
                    "lightmap `{}` is {}x{}, but has {} bytes of pixel data",
                    lightmap.name.to_string_lossy(),
                    info.width,
                    info.height,
                    lightmap.data.len()
                )));
            }
        }

        for material in &self.materials {
            validate_name("material", &material.name, MATERIAL_NAME_MAX)?;
            if let MaterialKindRecord::Texture(path) = &material.kind {
                validate_name("texture", path, PATH_MAX)?;
            }
        }

        for entity in &self.entities {
            validate_transform(&entity.transform)?;

            if let EntityKindRecord::Model(model) = &entity.kind {
                validate_name("model", &model.model_path, PATH_MAX)?;
                validate_name("lightmap", &model.lightmap_section.lightmap_name, LIGHTMAP_NAME_MAX)?;

                let movement = &model.movement;
                if movement.kind == MovementTag::Linear
                    && !(movement.length.is_finite() && movement.length > 0.0)
                {
                    return Err(FormatError::Malformed(format!(
                        "linear movement with invalid length {}",
                        movement.length
                    )));
                }
                if movement.kind == MovementTag::Linear
                    && !(movement.t.is_finite() && (0.0..=movement.length).contains(&movement.t))
                {
                    return Err(FormatError::Malformed(format!(
                        "linear movement progress {} is outside of 0..={}",
                        movement.t, movement.length
                    )));
                }
            }
        }

        ok()
    }
}

fn validate_transform(transform: &Transform) -> Result<(), FormatError> {
    let finite = transform.position.is_finite()
        && transform.rotation.is_finite()
        && transform.scale.is_finite();
    if !finite {
        return Err(FormatError::Malformed(format!(
            "transform has non-finite components: {transform:?}"
        )));
    }

    if !transform.rotation.is_normalized() {
        return Err(FormatError::Malformed(format!(
            "transform rotation {} isn't a unit quaternion",
            transform.rotation
        )));
    }

    ok()
}

fn validate_name(what: &'static str, name: &CString, max: usize) -> Result<(), FormatError> {
    let Ok(text) = name.to_str() else {
        return Err(FormatError::BadString(format!(
            "{what} name `{}` isn't valid UTF-8",
            name.to_string_lossy()
        )));
    };

    if text.len() > max {
        return Err(FormatError::NameTooLong {
            what,
            name: text.to_owned(),
            max,
        });
    }

    ok()
}

/// Converts a validated string into a C string, failing on interior NUL bytes.
pub(crate) fn to_c_string(what: &'static str, s: &str) -> Result<CString, FormatError> {
    CString::new(s).map_err(|_| FormatError::BadString(format!("{what} name `{s}` contains a NUL byte")))
}

impl NodeRead for LevelFile {
    fn read_node_payload<R: Read + Seek>(r: &mut R, meta: NodeHeader) -> AnyResult<Self> {
        let children = read_node_children(r, meta)?;

        let Some((first, rest)) = children.split_first() else {
            return Err(FormatError::MissingNode("HEAD").into());
        };
        if first.name != NodeName::from_str("HEAD") {
            return Err(FormatError::Malformed(format!(
                "expected `HEAD` as the first node, found `{}`",
                first.name
            ))
            .into());
        }

        let header = LevelFileHeader::read_node_at(r, *first)?;
        if header.version != LEVEL_FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: header.version,
                supported: LEVEL_FORMAT_VERSION,
            }
            .into());
        }

        let mut file = LevelFile::default();
        for child in rest {
            match child.name.as_bytes() {
                b"LMAP" => {
                    let lightmap = LightmapImageRecord::read_node_at(r, *child)?;
                    trace!("Read lightmap `{}`", lightmap.name.to_string_lossy());
                    file.lightmap_images.push(lightmap);
                }
                b"MATL" => {
                    let material = MaterialRecord::read_node_at(r, *child)?;
                    trace!("Read material `{}`", material.name.to_string_lossy());
                    file.materials.push(material);
                }
                b"ENTI" => {
                    let entity = EntityRecord::read_node_at(r, *child)?;
                    trace!("Read {} entity", entity.kind.tag());
                    file.entities.push(entity);
                }
                b"HEAD" => {
                    return Err(FormatError::Malformed("node `HEAD` duplicated".into()).into())
                }
                _ => trace!("Skipping unknown level node `{}`", child.name),
            }
        }

        let counts = [
            ("lightmap", header.lightmap_count, file.lightmap_images.len()),
            ("material", header.material_count, file.materials.len()),
            ("entity", header.entity_count, file.entities.len()),
        ];
        for (what, declared, found) in counts {
            if declared as usize != found {
                return Err(FormatError::InconsistentLength(format!(
                    "header declares {declared} {what} records, found {found}"
                ))
                .into());
            }
        }

        Ok(file)
    }
}

impl NodeWrite for LevelFile {
    fn write_node<W: Write + Seek>(&self, writer: &mut NodeWriter<W>) -> AnyResult {
        writer.write_node(b"HEAD", &self.header())?;
        for lightmap in &self.lightmap_images {
            writer.write_node(b"LMAP", lightmap)?;
        }
        for material in &self.materials {
            writer.write_node(b"MATL", material)?;
        }
        for entity in &self.entities {
            writer.write_node(b"ENTI", entity)?;
        }
        ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Transform;
    use glam::{Vec2, Vec3};

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn sample_file() -> LevelFile {
        LevelFile {
            lightmap_images: vec![LightmapImageRecord {
                name: c("lm0"),
                info: LightmapImageInfo {
                    active: true,
                    resolution: 16,
                    width: 2,
                    height: 2,
                },
                data: vec![0, 64, 128, 255],
            }],
            materials: vec![
                MaterialRecord {
                    name: c("grass"),
                    active: true,
                    friction: 0.5,
                    restitution: 0.1,
                    kind: MaterialKindRecord::Color(Vec3::new(0.0, 1.0, 0.0)),
                },
                MaterialRecord {
                    name: c("sky"),
                    active: false,
                    friction: 0.0,
                    restitution: 0.0,
                    kind: MaterialKindRecord::Environment,
                },
            ],
            entities: vec![
                EntityRecord {
                    active: true,
                    transform: Transform::from_position(Vec3::new(1.0, 0.0, 2.0)),
                    kind: EntityKindRecord::Model(ModelRecord {
                        model_path: c("models/windmill.obj"),
                        movement: MovementRecord::linear(Vec3::ZERO, Vec3::X, 2.0, 0.5),
                        lightmap_section: LightmapSectionRecord {
                            lightmap_name: c("lm0"),
                            uvs: UvList(vec![Vec2::ZERO, Vec2::ONE]),
                        },
                    }),
                },
                EntityRecord {
                    active: true,
                    transform: Transform::IDENTITY,
                    kind: EntityKindRecord::Hole,
                },
            ],
        }
    }

    #[test]
    fn file_round_trip() {
        let file = sample_file();
        let bytes = file.to_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"GLVL");
        assert_eq!(LevelFile::from_bytes(&bytes).unwrap(), file);
    }

    #[test]
    fn header_must_come_first() {
        let file = sample_file();
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = NodeWriter::new(&mut cursor, LEVEL_MAGIC).unwrap();
        writer.write_node(b"MATL", &file.materials[0]).unwrap();
        writer.write_node(b"HEAD", &file.header()).unwrap();
        writer.finish().unwrap();
        drop(writer);

        let error = LevelFile::from_bytes(&cursor.into_inner()).unwrap_err();
        assert!(matches!(error, FormatError::Malformed(_)));
    }

    #[test]
    fn unknown_nodes_are_skipped() {
        let file = LevelFile::default();
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = NodeWriter::new(&mut cursor, LEVEL_MAGIC).unwrap();
        writer.write_node(b"HEAD", &file.header()).unwrap();
        writer.write_node(b"XTRA", &42u32).unwrap();
        writer.finish().unwrap();
        drop(writer);

        assert_eq!(LevelFile::from_bytes(&cursor.into_inner()).unwrap(), file);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let file = sample_file();
        let mut header = file.header();
        header.entity_count = 5;

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = NodeWriter::new(&mut cursor, LEVEL_MAGIC).unwrap();
        writer.write_node(b"HEAD", &header).unwrap();
        for entity in &file.entities {
            writer.write_node(b"ENTI", entity).unwrap();
        }
        writer.finish().unwrap();
        drop(writer);

        let error = LevelFile::from_bytes(&cursor.into_inner()).unwrap_err();
        assert!(matches!(error, FormatError::InconsistentLength(_)));
    }

    #[test]
    fn long_names_are_rejected() {
        let mut file = sample_file();
        file.materials[0].name = c(&"a".repeat(MATERIAL_NAME_MAX + 1));
        assert!(matches!(
            file.to_bytes(),
            Err(FormatError::NameTooLong { what: "material", .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = sample_file().to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(
            LevelFile::from_bytes(&bytes),
            Err(FormatError::InconsistentLength(_))
        ));
    }

    #[test]
    fn empty_input_is_truncated() {
        assert_eq!(LevelFile::from_bytes(&[]), Err(FormatError::Truncated));
        assert_eq!(LevelFile::from_bytes(b"GLVL"), Err(FormatError::Truncated));
    }
}
