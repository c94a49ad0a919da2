use crate::{
    node::{read_node_children, read_node_once, NodeHeader, NodeRead, NodeWrite, NodeWriter},
    FormatError,
};
use glam::Vec3;
use golf_proc::{ext_repr, PackedData};
use golf_utils::{ok, AnyResult};
use std::{
    ffi::CString,
    io::{Read, Seek, Write},
};

#[ext_repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PackedData)]
#[parse_as(u32)]
pub enum MaterialTag {
    Texture = 0,
    Color = 1,
    DiffuseColor = 2,
    Environment = 3,
}

/// `INFO` node of a material
#[derive(Debug, Clone, Copy, PartialEq, PackedData)]
pub struct MaterialInfo {
    pub active: bool,
    pub friction: f32,
    pub restitution: f32,
    pub kind: MaterialTag,
}

/// `MATL` node
///
/// Depending on the kind, the variant data is stored in a `COLR` node (colors), a `TEXP` node
/// (texture path), or nowhere at all.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub name: CString,
    pub active: bool,
    pub friction: f32,
    pub restitution: f32,
    pub kind: MaterialKindRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKindRecord {
    Texture(CString),
    Color(Vec3),
    DiffuseColor(Vec3),
    Environment,
}

impl MaterialKindRecord {
    pub fn tag(&self) -> MaterialTag {
        match self {
            MaterialKindRecord::Texture(_) => MaterialTag::Texture,
            MaterialKindRecord::Color(_) => MaterialTag::Color,
            MaterialKindRecord::DiffuseColor(_) => MaterialTag::DiffuseColor,
            MaterialKindRecord::Environment => MaterialTag::Environment,
        }
    }
}

impl NodeRead for MaterialRecord {
    fn read_node_payload<R: Read + Seek>(r: &mut R, meta: NodeHeader) -> AnyResult<Self> {
        let mut name: Option<CString> = None;
        let mut info: Option<MaterialInfo> = None;
        let mut color: Option<Vec3> = None;
        let mut texture_path: Option<CString> = None;

        for child in read_node_children(r, meta)? {
            match child.name.as_bytes() {
                b"NAME" => read_node_once(&mut name, r, child)?,
                b"INFO" => read_node_once(&mut info, r, child)?,
                b"COLR" => read_node_once(&mut color, r, child)?,
                b"TEXP" => read_node_once(&mut texture_path, r, child)?,
                _ => {}
            }
        }

        let name = name.ok_or(FormatError::MissingNode("NAME"))?;
        let info = info.ok_or(FormatError::MissingNode("INFO"))?;
        let kind = match info.kind {
            MaterialTag::Texture => MaterialKindRecord::Texture(
                texture_path.ok_or(FormatError::MissingNode("TEXP"))?,
            ),
            MaterialTag::Color => {
                MaterialKindRecord::Color(color.ok_or(FormatError::MissingNode("COLR"))?)
            }
            MaterialTag::DiffuseColor => {
                MaterialKindRecord::DiffuseColor(color.ok_or(FormatError::MissingNode("COLR"))?)
            }
            MaterialTag::Environment => MaterialKindRecord::Environment,
        };

        Ok(Self {
            name,
            active: info.active,
            friction: info.friction,
            restitution: info.restitution,
            kind,
        })
    }
}

impl NodeWrite for MaterialRecord {
    fn write_node<W: Write + Seek>(&self, writer: &mut NodeWriter<W>) -> AnyResult {
        writer.write_node(b"NAME", &self.name)?;
        writer.write_node(
            b"INFO",
            &MaterialInfo {
                active: self.active,
                friction: self.friction,
                restitution: self.restitution,
                kind: self.kind.tag(),
            },
        )?;

        match &self.kind {
            MaterialKindRecord::Texture(path) => writer.write_node(b"TEXP", path)?,
            MaterialKindRecord::Color(rgb) | MaterialKindRecord::DiffuseColor(rgb) => {
                writer.write_node(b"COLR", rgb)?
            }
            MaterialKindRecord::Environment => {}
        }

        ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::read_node_header;
    use golf_utils::packed::PackedWriteExt;
    use std::io::Cursor;

    fn encode(build: impl FnOnce(&mut NodeWriter<Cursor<Vec<u8>>>) -> AnyResult) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = NodeWriter::new(&mut cursor, b"MATL").unwrap();
        build(&mut writer).unwrap();
        writer.finish().unwrap();
        drop(writer);
        cursor.into_inner()
    }

    fn decode(bytes: Vec<u8>) -> Result<MaterialRecord, FormatError> {
        let mut r = Cursor::new(bytes);
        let header = read_node_header(&mut r).unwrap();
        MaterialRecord::read_node_at(&mut r, header).map_err(FormatError::from_any)
    }

    fn info(kind: MaterialTag) -> MaterialInfo {
        MaterialInfo {
            active: true,
            friction: 0.25,
            restitution: 0.75,
            kind,
        }
    }

    #[test]
    fn variant_data_round_trip() {
        let kinds = [
            MaterialKindRecord::Texture(CString::new("textures/sand.png").unwrap()),
            MaterialKindRecord::Color(Vec3::new(0.0, 1.0, 0.0)),
            MaterialKindRecord::DiffuseColor(Vec3::new(0.5, 0.5, 0.5)),
            MaterialKindRecord::Environment,
        ];

        for kind in kinds {
            let record = MaterialRecord {
                name: CString::new("surface").unwrap(),
                active: true,
                friction: 0.25,
                restitution: 0.75,
                kind,
            };
            let bytes = encode(|w| record.write_node(w));
            assert_eq!(decode(bytes).unwrap(), record);
        }
    }

    #[test]
    fn invalid_tag_is_reported() {
        let bytes = encode(|w| {
            w.write_node(b"NAME", &CString::new("bad").unwrap())?;
            w.build_node(b"INFO", |w| {
                w.write_packed(true)?;
                w.write_packed(0.0f32)?;
                w.write_packed(0.0f32)?;
                w.write_packed(9u32)
            })
        });

        assert_eq!(
            decode(bytes).unwrap_err(),
            FormatError::InvalidTag {
                type_name: "MaterialTag",
                value: 9
            }
        );
    }

    #[test]
    fn color_material_needs_color() {
        let bytes = encode(|w| {
            w.write_node(b"NAME", &CString::new("grass").unwrap())?;
            w.write_node(b"INFO", &info(MaterialTag::Color))
        });
        assert_eq!(decode(bytes).unwrap_err(), FormatError::MissingNode("COLR"));
    }
}
