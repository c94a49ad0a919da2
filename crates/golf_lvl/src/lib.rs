//! Minigolf level data model
//!
//! A [`Level`] is the aggregate of everything a single hole is made of: baked lightmap images,
//! surface materials, and entities (models, ball starts and holes). Levels are persisted as a
//! tree of nodes (see [`node`]) described by the records in [`format`].
//!
//! The level itself doesn't know how to load models or talk to the GPU. Those are reached
//! through the [`GpuContext`], [`AssetResolver`] and [`Storage`] collaborators.

pub mod assets;
pub mod format;
pub mod gpu;
pub mod node;
pub mod scene;
pub mod storage;

mod error;
pub use error::*;

pub use assets::{AssetCache, AssetResolver, ModelHandle, Resolution, TextureHandle};
pub use gpu::{GpuBuffer, GpuContext, GpuTexture, HeadlessGpu};
pub use scene::*;
pub use storage::{DirectoryStorage, MemoryStorage, Storage};

/// Current version of the level file format. Files with any other version are rejected.
pub const LEVEL_FORMAT_VERSION: u32 = 1;

/// Maximum length of a material name, in bytes.
pub const MATERIAL_NAME_MAX: usize = 64;

/// Maximum length of a lightmap image name, in bytes.
pub const LIGHTMAP_NAME_MAX: usize = 64;

/// Maximum length of model and texture paths, in bytes.
pub const PATH_MAX: usize = 1024;

/// Lightmaps are single channel, 8 bits per pixel.
pub const LIGHTMAP_CHANNELS: usize = 1;
