use crate::{node::NodeData, FormatError};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use glam::Vec2;
use golf_proc::PackedData;
use golf_utils::{
    ok,
    packed::{PackedData, PackedReadExt, PackedWriteExt},
    AnyResult,
};
use std::{
    ffi::CString,
    io::{Read, Write},
};

/// `LMAP` node
#[derive(Debug, Clone, PartialEq, NodeData)]
pub struct LightmapImageRecord {
    #[node("NAME")]
    pub name: CString,
    #[node("INFO")]
    pub info: LightmapImageInfo,
    /// Row-major, [`crate::LIGHTMAP_CHANNELS`] bytes per pixel
    #[node("BODY")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PackedData)]
pub struct LightmapImageInfo {
    pub active: bool,
    pub resolution: i32,
    pub width: i32,
    pub height: i32,
}

/// `LMSC` node of a model entity
#[derive(Debug, Clone, Default, PartialEq, NodeData)]
pub struct LightmapSectionRecord {
    #[node("NAME")]
    pub lightmap_name: CString,
    #[node("UVS_")]
    pub uvs: UvList,
}

/// Payload of an `UVS_` node: an u32 count, followed by exactly that many UV pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UvList(pub Vec<Vec2>);

impl PackedData for UvList {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        let count = r.read_u32::<LE>()?;

        // The count comes from untrusted data, so the list grows as it's read
        let mut uvs = Vec::new();
        for index in 0..count {
            match r.read_packed::<Vec2>() {
                Ok(uv) => uvs.push(uv),
                Err(_) => {
                    return Err(FormatError::InconsistentLength(format!(
                        "UV list declares {count} entries, but ends after {index}"
                    ))
                    .into())
                }
            }
        }

        Ok(Self(uvs))
    }

    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        let count = u32::try_from(self.0.len())
            .map_err(|_| FormatError::InconsistentLength("too many UVs".into()))?;
        w.write_u32::<LE>(count)?;
        for uv in &self.0 {
            w.write_packed(*uv)?;
        }
        ok()
    }
}
