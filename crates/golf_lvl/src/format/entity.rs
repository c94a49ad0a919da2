use super::LightmapSectionRecord;
use crate::{
    node::{read_node_children, read_node_once, NodeHeader, NodeRead, NodeWrite, NodeWriter},
    scene::Transform,
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
pub enum EntityTag {
    Model = 0,
    BallStart = 1,
    Hole = 2,
}

#[ext_repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PackedData)]
#[parse_as(u32)]
pub enum MovementTag {
    None = 0,
    Linear = 1,
}

/// `INFO` node of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PackedData)]
pub struct EntityInfo {
    pub active: bool,
    pub kind: EntityTag,
}

/// `MOVE` node of a model entity. For [`MovementTag::None`] the remaining fields are zeroed.
#[derive(Debug, Clone, Copy, PartialEq, PackedData)]
pub struct MovementRecord {
    pub kind: MovementTag,
    pub p0: Vec3,
    pub p1: Vec3,
    pub length: f32,
    pub t: f32,
}

impl MovementRecord {
    pub const NONE: Self = Self {
        kind: MovementTag::None,
        p0: Vec3::ZERO,
        p1: Vec3::ZERO,
        length: 0.0,
        t: 0.0,
    };

    pub fn linear(p0: Vec3, p1: Vec3, length: f32, t: f32) -> Self {
        Self {
            kind: MovementTag::Linear,
            p0,
            p1,
            length,
            t,
        }
    }
}

/// `ENTI` node
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub active: bool,
    pub transform: Transform,
    pub kind: EntityKindRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKindRecord {
    Model(ModelRecord),
    BallStart,
    Hole,
}

impl EntityKindRecord {
    pub fn tag(&self) -> EntityTag {
        match self {
            EntityKindRecord::Model(_) => EntityTag::Model,
            EntityKindRecord::BallStart => EntityTag::BallStart,
            EntityKindRecord::Hole => EntityTag::Hole,
        }
    }
}

/// Model-only part of an entity record, stored as `MODL`, `MOVE` and `LMSC` nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    pub model_path: CString,
    pub movement: MovementRecord,
    pub lightmap_section: LightmapSectionRecord,
}

impl NodeRead for EntityRecord {
    fn read_node_payload<R: Read + Seek>(r: &mut R, meta: NodeHeader) -> AnyResult<Self> {
        let mut info: Option<EntityInfo> = None;
        let mut transform: Option<Transform> = None;
        let mut model_path: Option<CString> = None;
        let mut movement: Option<MovementRecord> = None;
        let mut lightmap_section: Option<LightmapSectionRecord> = None;

        for child in read_node_children(r, meta)? {
            match child.name.as_bytes() {
                b"INFO" => read_node_once(&mut info, r, child)?,
                b"XFRM" => read_node_once(&mut transform, r, child)?,
                b"MODL" => read_node_once(&mut model_path, r, child)?,
                b"MOVE" => read_node_once(&mut movement, r, child)?,
                b"LMSC" => read_node_once(&mut lightmap_section, r, child)?,
                _ => {}
            }
        }

        let info = info.ok_or(FormatError::MissingNode("INFO"))?;
        let transform = transform.ok_or(FormatError::MissingNode("XFRM"))?;
        let kind = match info.kind {
            EntityTag::Model => EntityKindRecord::Model(ModelRecord {
                model_path: model_path.ok_or(FormatError::MissingNode("MODL"))?,
                movement: movement.ok_or(FormatError::MissingNode("MOVE"))?,
                lightmap_section: lightmap_section.ok_or(FormatError::MissingNode("LMSC"))?,
            }),
            EntityTag::BallStart => EntityKindRecord::BallStart,
            EntityTag::Hole => EntityKindRecord::Hole,
        };

        Ok(Self {
            active: info.active,
            transform,
            kind,
        })
    }
}

impl NodeWrite for EntityRecord {
    fn write_node<W: Write + Seek>(&self, writer: &mut NodeWriter<W>) -> AnyResult {
        writer.write_node(
            b"INFO",
            &EntityInfo {
                active: self.active,
                kind: self.kind.tag(),
            },
        )?;
        writer.write_node(b"XFRM", &self.transform)?;

        if let EntityKindRecord::Model(model) = &self.kind {
            writer.write_node(b"MODL", &model.model_path)?;
            writer.write_node(b"MOVE", &model.movement)?;
            writer.write_node(b"LMSC", &model.lightmap_section)?;
        }

        ok()
    }
}
