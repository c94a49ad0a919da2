//! Utilities for dealing with level file nodes (also known as chunks)
//!
//! Every node consists of a 4-byte name, a 32-bit little endian payload size, and the payload
//! itself. Payloads either contain raw packed data, or a sequence of child nodes filling the
//! payload exactly.
//!
//! Provides raw reading/writing capabilities, and a derive macro for creating automatic parsers
//! of node hierarchical structures.

use crate::FormatError;
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use golf_utils::{ok, packed::PackedData, AnyResult, AsciiDisplay, SeekableTakeExt};
use std::{
    fmt::{self, Display},
    io::{self, Read, Seek, SeekFrom, Write},
};

pub use golf_lvl_proc::NodeData;

/// Size of a node header (name + payload size) in bytes.
pub const NODE_HEADER_SIZE: u64 = 8;

/// Represents a 4-byte name of the node. By convention it's a short ASCII string.
#[doc(alias = "chunk")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeName(pub [u8; 4]);

impl NodeName {
    /// Converts given string into a [`NodeName`].
    ///
    /// ## Panics
    /// Panics if the string isn't 4 bytes long.
    pub const fn from_str(s: &str) -> Self {
        let bytes = s.as_bytes();
        assert!(bytes.len() == 4, "invalid string length");
        Self([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl<'a> From<&'a [u8; 4]> for NodeName {
    fn from(value: &'a [u8; 4]) -> Self {
        Self(*value)
    }
}

impl AsRef<[u8]> for NodeName {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        AsciiDisplay(&self.0).fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHeader {
    pub header_position: u64,
    pub name: NodeName,
    pub size: u32,
}

impl NodeHeader {
    /// Stream position of the first payload byte.
    pub fn payload_start(&self) -> u64 {
        self.header_position + NODE_HEADER_SIZE
    }

    /// Stream position right after the last payload byte.
    pub fn payload_end(&self) -> u64 {
        self.payload_start() + self.size as u64
    }

    pub fn seek_to_payload(&self, r: &mut impl Seek) -> io::Result<()> {
        r.seek(SeekFrom::Start(self.payload_start()))?;
        ok()
    }
}

/// Trait for node reading/writing node hierarchies. Can be derived.
pub trait NodeData: NodeRead + NodeWrite {}
impl<T: NodeRead + NodeWrite> NodeData for T {}

pub trait NodeRead: Sized {
    /// Processes the node's payload and returns this type's instance.
    ///
    /// The reader is placed at the first byte of the payload by the caller, that is right
    /// after the header. Its final seek position is unspecified.
    ///
    /// Direct usage of this function is discouraged, as nothing stops it from reading past
    /// the payload. Use [`Self::read_node_at`] instead.
    fn read_node_payload<R: Read + Seek>(r: &mut R, meta: NodeHeader) -> AnyResult<Self>;

    /// Wrapper around [`Self::read_node_payload`], that pre-seeks into the payload and limits
    /// the reader to it. Otherwise, the behavior matches that function.
    fn read_node_at<R: Read + Seek>(r: &mut R, meta: NodeHeader) -> AnyResult<Self> {
        meta.seek_to_payload(r)?;
        Self::read_node_payload(&mut r.seekable_take(meta.size as u64)?, meta)
    }
}

pub trait NodeWrite {
    /// Writes the node's payload into the given writer. The caller must not call
    /// `NodeWriter::finish` by themselves.
    fn write_node<W: Write + Seek>(&self, w: &mut NodeWriter<W>) -> AnyResult;
}

/// Blanket implementation of [`NodeRead`] for every [`PackedData`]. The payload of the node is
/// treated as raw binary data, which has to be consumed completely.
impl<T: PackedData> NodeRead for T {
    fn read_node_payload<R: Read + Seek>(r: &mut R, meta: NodeHeader) -> AnyResult<Self> {
        let value = match T::read_packed(r) {
            Ok(value) => value,
            Err(e) if is_unexpected_eof(&e) => {
                return Err(FormatError::InconsistentLength(format!(
                    "node `{}` is too short ({} bytes)",
                    meta.name, meta.size
                ))
                .into())
            }
            Err(e) => return Err(e),
        };

        if r.stream_position()? != meta.payload_end() {
            return Err(FormatError::InconsistentLength(format!(
                "unexpected trailing data in node `{}`",
                meta.name
            ))
            .into());
        }

        Ok(value)
    }
}

impl<T: PackedData> NodeWrite for T {
    fn write_node<W: Write + Seek>(&self, writer: &mut NodeWriter<W>) -> AnyResult {
        PackedData::write_packed(self, writer)
    }
}

fn is_unexpected_eof(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<io::Error>()
        .map_or(false, |e| e.kind() == io::ErrorKind::UnexpectedEof)
}

/// Reads a node header at the current position. The payload isn't verified to exist.
pub fn read_node_header<R>(r: &mut R) -> io::Result<NodeHeader>
where
    R: Read + Seek,
{
    Ok(NodeHeader {
        header_position: r.stream_position()?,
        name: {
            let mut name = NodeName([0; 4]);
            r.read_exact(&mut name.0)?;
            name
        },
        size: r.read_u32::<LE>()?,
    })
}

/// Parses the given node as a parent node with a list of child nodes.
///
/// The children have to fill the parent's payload exactly, without any gaps or padding.
pub fn read_node_children<R>(r: &mut R, header: NodeHeader) -> AnyResult<Vec<NodeHeader>>
where
    R: Read + Seek,
{
    let end = header.payload_end();
    let mut position = header.payload_start();
    let mut children = Vec::new();

    while position < end {
        if end - position < NODE_HEADER_SIZE {
            return Err(FormatError::InconsistentLength(format!(
                "{} stray bytes at the end of node `{}`",
                end - position,
                header.name
            ))
            .into());
        }

        r.seek(SeekFrom::Start(position))?;
        let child = read_node_header(r)?;

        if child.payload_end() > end {
            return Err(FormatError::InconsistentLength(format!(
                "node `{}` overruns its parent `{}`",
                child.name, header.name
            ))
            .into());
        }

        position = child.payload_end();
        children.push(child);
    }

    Ok(children)
}

/// Reads a node into `slot`, failing if the slot was already filled by a previous node of the
/// same name.
pub fn read_node_once<T, R>(slot: &mut Option<T>, r: &mut R, child: NodeHeader) -> AnyResult
where
    T: NodeRead,
    R: Read + Seek,
{
    if slot.is_some() {
        return Err(FormatError::Malformed(format!("node `{}` duplicated", child.name)).into());
    }
    *slot = Some(T::read_node_at(r, child)?);
    ok()
}

/// A builder-style node writer.
///
/// ## Quick crash course
///  1. You can use [`NodeWriter::build_node`] to create a nested node writer for a child node.
///  2. You can use [`NodeWriter::write_node`] to create a child node and fill it with a
///     [`NodeWrite`] object (every [`PackedData`] is one).
///  3. You can write raw data into the node using its [`Write`] implementation, that just forwards
///     everything to the parent writer.
///  4. Once you're finished, either call [`NodeWriter::finish`] manually or drop the writer. Note,
///     that the drop implementation can only log errors returned by `finish`.
pub struct NodeWriter<'w, W: Write + Seek> {
    w: &'w mut W,
    data_start: u64,
    finished: bool,
}

impl<'w, W: Write + Seek> NodeWriter<'w, W> {
    pub fn new(w: &'w mut W, name: impl Into<NodeName>) -> AnyResult<Self> {
        let data_start = w.stream_position()?;
        w.write_all(&name.into().0)?;
        w.write_u32::<LE>(0)?;

        Ok(Self {
            w,
            data_start,
            finished: false,
        })
    }

    /// Creates a new child node, with contents from a [`PackedData`] or [`NodeWrite`] object.
    pub fn write_node<T>(&mut self, name: impl Into<NodeName>, data: &T) -> AnyResult
    where
        T: NodeWrite + ?Sized,
    {
        self.build_node(name.into(), |writer| data.write_node(writer))
    }

    /// Creates a nested node builder.
    pub fn build_node<'a, N, F>(&'a mut self, name: N, f: F) -> AnyResult
    where
        N: Into<NodeName>,
        F: FnOnce(&mut NodeWriter<'a, W>) -> AnyResult,
        'w: 'a,
    {
        assert!(!self.finished);

        let mut writer = NodeWriter::new(self.w, name.into())?;
        (f)(&mut writer)?;
        writer.finish()?;

        ok()
    }

    /// Finishes writing the node, by marking its final size in the stream.
    pub fn finish(&mut self) -> AnyResult {
        if self.finished {
            return ok();
        }

        let data_end = self.w.stream_position()?;
        let data_size = data_end - self.data_start - NODE_HEADER_SIZE;
        let data_size = u32::try_from(data_size)
            .map_err(|_| FormatError::InconsistentLength(format!("node too large ({data_size} bytes)")))?;

        self.w.seek(SeekFrom::Start(self.data_start + 4))?;
        self.w.write_u32::<LE>(data_size)?;
        self.w.seek(SeekFrom::Start(data_end))?;

        self.finished = true;
        ok()
    }
}

impl<'w, W: Write + Seek> Write for NodeWriter<'w, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.w.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.w.flush()
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.w.write_all(buf)
    }
}

impl<'w, W: Write + Seek> Drop for NodeWriter<'w, W> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish() {
                log::error!("Couldn't finish a node while dropping its writer: {e:#}");
            }
        }
    }
}
