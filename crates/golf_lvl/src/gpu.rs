//! GPU resource collaborator
//!
//! Levels never talk to a graphics API directly. Lightmap textures and UV vertex buffers are
//! created and destroyed through a [`GpuContext`], which hands out move-only handles. Since
//! destroying a resource consumes its handle, nothing can destroy a resource twice.

use glam::UVec2;
use golf_utils::{Pool, PoolHandle};
use log::warn;

/// Handle to a single channel, 8-bit 2D texture.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct GpuTexture(PoolHandle);

/// Handle to a vertex buffer.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct GpuBuffer(PoolHandle);

impl GpuTexture {
    /// Wraps a raw handle. Only meant for [`GpuContext`] implementations.
    pub fn from_raw(handle: PoolHandle) -> Self {
        Self(handle)
    }

    pub fn raw(&self) -> PoolHandle {
        self.0
    }
}

impl GpuBuffer {
    /// Wraps a raw handle. Only meant for [`GpuContext`] implementations.
    pub fn from_raw(handle: PoolHandle) -> Self {
        Self(handle)
    }

    pub fn raw(&self) -> PoolHandle {
        self.0
    }
}

pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub size: UVec2,
    /// Tightly packed rows of 1 byte pixels
    pub data: &'a [u8],
}

pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub contents: &'a [u8],
}

pub trait GpuContext {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> GpuTexture;
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> GpuBuffer;
    fn destroy_texture(&mut self, texture: GpuTexture);
    fn destroy_buffer(&mut self, buffer: GpuBuffer);
}

/// A [`GpuContext`] that keeps resources in plain memory. Used by tools and tests.
#[derive(Default)]
pub struct HeadlessGpu {
    textures: Pool<HeadlessTexture>,
    buffers: Pool<Vec<u8>>,
    total_created: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessTexture {
    pub label: String,
    pub size: UVec2,
    pub data: Vec<u8>,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount of textures created and not destroyed yet.
    pub fn live_textures(&self) -> usize {
        self.textures.count_allocated()
    }

    /// Amount of buffers created and not destroyed yet.
    pub fn live_buffers(&self) -> usize {
        self.buffers.count_allocated()
    }

    /// Amount of resources created over the context's lifetime.
    pub fn total_created(&self) -> usize {
        self.total_created
    }

    pub fn texture(&self, texture: &GpuTexture) -> Option<&HeadlessTexture> {
        self.textures.try_get(texture.raw())
    }

    pub fn buffer_contents(&self, buffer: &GpuBuffer) -> Option<&[u8]> {
        self.buffers.try_get(buffer.raw()).map(Vec::as_slice)
    }
}

impl GpuContext for HeadlessGpu {
    fn create_texture(&mut self, desc: &TextureDescriptor) -> GpuTexture {
        self.total_created += 1;
        GpuTexture::from_raw(self.textures.allocate(HeadlessTexture {
            label: desc.label.to_owned(),
            size: desc.size,
            data: desc.data.to_vec(),
        }))
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> GpuBuffer {
        self.total_created += 1;
        GpuBuffer::from_raw(self.buffers.allocate(desc.contents.to_vec()))
    }

    fn destroy_texture(&mut self, texture: GpuTexture) {
        if self.textures.try_deallocate(texture.raw()).is_none() {
            warn!("Destroying an unknown texture {:?}", texture.raw());
        }
    }

    fn destroy_buffer(&mut self, buffer: GpuBuffer) {
        if self.buffers.try_deallocate(buffer.raw()).is_none() {
            warn!("Destroying an unknown buffer {:?}", buffer.raw());
        }
    }
}

#[cfg(feature = "wgpu")]
pub use wgpu_context::WgpuContext;

#[cfg(feature = "wgpu")]
mod wgpu_context {
    use super::*;
    use wgpu::util::DeviceExt;

    /// A [`GpuContext`] creating real wgpu resources. Lightmaps become `R8Unorm` textures, UV
    /// lists become vertex buffers.
    pub struct WgpuContext {
        pub device: wgpu::Device,
        pub queue: wgpu::Queue,
        textures: Pool<wgpu::Texture>,
        buffers: Pool<wgpu::Buffer>,
    }

    impl WgpuContext {
        pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
            Self {
                device,
                queue,
                textures: Pool::new(),
                buffers: Pool::new(),
            }
        }

        pub fn texture(&self, texture: &GpuTexture) -> Option<&wgpu::Texture> {
            self.textures.try_get(texture.raw())
        }

        pub fn buffer(&self, buffer: &GpuBuffer) -> Option<&wgpu::Buffer> {
            self.buffers.try_get(buffer.raw())
        }
    }

    impl GpuContext for WgpuContext {
        fn create_texture(&mut self, desc: &TextureDescriptor) -> GpuTexture {
            let size = wgpu::Extent3d {
                width: desc.size.x,
                height: desc.size.y,
                depth_or_array_layers: 1,
            };

            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(desc.label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[wgpu::TextureFormat::R8Unorm],
            });

            self.queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x: 0, y: 0, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                desc.data,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(desc.size.x),
                    rows_per_image: None,
                },
                size,
            );

            GpuTexture::from_raw(self.textures.allocate(texture))
        }

        fn create_buffer(&mut self, desc: &BufferDescriptor) -> GpuBuffer {
            let buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(desc.label),
                    contents: desc.contents,
                    usage: wgpu::BufferUsages::VERTEX,
                });
            GpuBuffer::from_raw(self.buffers.allocate(buffer))
        }

        fn destroy_texture(&mut self, texture: GpuTexture) {
            match self.textures.try_deallocate(texture.raw()) {
                Some(texture) => texture.destroy(),
                None => warn!("Destroying an unknown texture {:?}", texture.raw()),
            }
        }

        fn destroy_buffer(&mut self, buffer: GpuBuffer) {
            match self.buffers.try_deallocate(buffer.raw()) {
                Some(buffer) => buffer.destroy(),
                None => warn!("Destroying an unknown buffer {:?}", buffer.raw()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_resources_are_tracked() {
        let mut gpu = HeadlessGpu::new();
        let texture = gpu.create_texture(&TextureDescriptor {
            label: "lm0",
            size: UVec2::new(2, 1),
            data: &[10, 20],
        });
        let buffer = gpu.create_buffer(&BufferDescriptor {
            label: "uvs",
            contents: &[1, 2, 3, 4],
        });

        assert_eq!(gpu.live_textures(), 1);
        assert_eq!(gpu.live_buffers(), 1);
        assert_eq!(gpu.texture(&texture).unwrap().data, vec![10, 20]);
        assert_eq!(gpu.buffer_contents(&buffer), Some(&[1, 2, 3, 4][..]));

        gpu.destroy_texture(texture);
        gpu.destroy_buffer(buffer);
        assert_eq!(gpu.live_textures(), 0);
        assert_eq!(gpu.live_buffers(), 0);
        assert_eq!(gpu.total_created(), 2);
    }
}
