use crate::{
    gpu::{BufferDescriptor, GpuBuffer, GpuContext, GpuTexture, TextureDescriptor},
    LIGHTMAP_CHANNELS,
};
use glam::{UVec2, Vec2};
use log::warn;

/// A baked lighting raster, shared by entities through [`LightmapSection`]s.
///
/// The pixel data is owned by the image, and mirrored into a GPU texture. The texture is a
/// cache: it's rebuilt from the pixels whenever needed, and never persisted.
pub struct LightmapImage {
    pub name: String,
    pub active: bool,
    /// Baking resolution, in texels per world unit
    pub resolution: i32,
    width: i32,
    height: i32,
    data: Vec<u8>,
    texture: Option<GpuTexture>,
    stale: bool,
}

impl LightmapImage {
    /// Creates an active lightmap image, along with its GPU texture.
    ///
    /// ## Panics
    /// Panics if the dimensions are negative, or if `data` isn't exactly
    /// `width * height * LIGHTMAP_CHANNELS` bytes long.
    pub fn new(
        gpu: &mut dyn GpuContext,
        name: impl Into<String>,
        resolution: i32,
        width: i32,
        height: i32,
        data: Vec<u8>,
    ) -> Self {
        assert!(width >= 0 && height >= 0, "negative lightmap dimensions");
        assert_eq!(
            data.len(),
            width as usize * height as usize * LIGHTMAP_CHANNELS,
            "lightmap data length doesn't match its dimensions"
        );

        let mut image = Self {
            name: name.into(),
            active: true,
            resolution,
            width,
            height,
            data,
            texture: None,
            stale: true,
        };
        image.refresh_gpu(gpu);
        image
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width as u32, self.height as u32)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the pixels. The GPU texture goes stale until the next
    /// [`Self::refresh_gpu`].
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.stale = true;
        &mut self.data
    }

    /// The GPU texture. Empty images don't have one.
    pub fn texture(&self) -> Option<&GpuTexture> {
        self.texture.as_ref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Recreates the GPU texture if the pixels changed since it was created.
    pub fn refresh_gpu(&mut self, gpu: &mut dyn GpuContext) {
        if !self.stale {
            return;
        }

        self.release_gpu(gpu);
        if !self.data.is_empty() {
            self.texture = Some(gpu.create_texture(&TextureDescriptor {
                label: &self.name,
                size: self.size(),
                data: &self.data,
            }));
        }
        self.stale = false;
    }

    /// Destroys the GPU texture, marking the image as stale.
    pub fn release_gpu(&mut self, gpu: &mut dyn GpuContext) {
        if let Some(texture) = self.texture.take() {
            gpu.destroy_texture(texture);
        }
        self.stale = true;
    }
}

impl Drop for LightmapImage {
    fn drop(&mut self) {
        if self.texture.is_some() {
            warn!("Lightmap `{}` dropped with a live GPU texture", self.name);
        }
    }
}

/// Per-entity mapping into a lightmap image, referenced by name.
///
/// An empty name means that the entity isn't lightmapped.
pub struct LightmapSection {
    pub lightmap_name: String,
    uvs: Vec<Vec2>,
    buffer: Option<GpuBuffer>,
    stale: bool,
}

impl LightmapSection {
    /// Copies `uvs[start..start + count]` and creates a vertex buffer out of it.
    ///
    /// ## Panics
    /// Panics if the range doesn't fit in `uvs`.
    pub fn new(
        gpu: &mut dyn GpuContext,
        lightmap_name: impl Into<String>,
        uvs: &[Vec2],
        start: usize,
        count: usize,
    ) -> Self {
        Self::from_uvs(gpu, lightmap_name, uvs[start..start + count].to_vec())
    }

    /// Takes ownership of a whole UV list.
    pub fn from_uvs(
        gpu: &mut dyn GpuContext,
        lightmap_name: impl Into<String>,
        uvs: Vec<Vec2>,
    ) -> Self {
        let mut section = Self {
            lightmap_name: lightmap_name.into(),
            uvs,
            buffer: None,
            stale: true,
        };
        section.refresh_gpu(gpu);
        section
    }

    /// A section without a lightmap.
    pub fn none() -> Self {
        Self {
            lightmap_name: String::new(),
            uvs: vec![],
            buffer: None,
            stale: false,
        }
    }

    pub fn has_lightmap(&self) -> bool {
        !self.lightmap_name.is_empty()
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Mutable access to the UVs. The GPU buffer goes stale until the next
    /// [`Self::refresh_gpu`].
    pub fn uvs_mut(&mut self) -> &mut Vec<Vec2> {
        self.stale = true;
        &mut self.uvs
    }

    /// The UV vertex buffer. Sections without UVs don't have one.
    pub fn buffer(&self) -> Option<&GpuBuffer> {
        self.buffer.as_ref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Deep copy with an independent GPU buffer.
    pub fn make_copy(&self, gpu: &mut dyn GpuContext) -> Self {
        Self::from_uvs(gpu, self.lightmap_name.clone(), self.uvs.clone())
    }

    pub fn refresh_gpu(&mut self, gpu: &mut dyn GpuContext) {
        if !self.stale {
            return;
        }

        self.release_gpu(gpu);
        if !self.uvs.is_empty() {
            let contents = self
                .uvs
                .iter()
                .flat_map(|uv| uv.to_array())
                .flat_map(f32::to_le_bytes)
                .collect::<Vec<u8>>();

            self.buffer = Some(gpu.create_buffer(&BufferDescriptor {
                label: &self.lightmap_name,
                contents: &contents,
            }));
        }
        self.stale = false;
    }

    pub fn release_gpu(&mut self, gpu: &mut dyn GpuContext) {
        if let Some(buffer) = self.buffer.take() {
            gpu.destroy_buffer(buffer);
        }
        self.stale = true;
    }
}

impl Drop for LightmapSection {
    fn drop(&mut self) {
        if self.buffer.is_some() {
            warn!(
                "Lightmap section of `{}` dropped with a live GPU buffer",
                self.lightmap_name
            );
        }
    }
}

impl Default for LightmapSection {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessGpu;

    #[test]
    fn image_texture_follows_pixels() {
        let mut gpu = HeadlessGpu::new();
        let mut image = LightmapImage::new(&mut gpu, "lm0", 8, 2, 2, vec![0; 4]);
        assert_eq!(gpu.live_textures(), 1);
        assert!(!image.is_stale());

        image.data_mut()[3] = 255;
        assert!(image.is_stale());
        image.refresh_gpu(&mut gpu);
        assert_eq!(gpu.live_textures(), 1);
        assert_eq!(gpu.total_created(), 2);

        let texture = gpu.texture(image.texture().unwrap()).unwrap();
        assert_eq!(texture.data, vec![0, 0, 0, 255]);
        assert_eq!(texture.size, UVec2::new(2, 2));

        image.release_gpu(&mut gpu);
        assert_eq!(gpu.live_textures(), 0);
    }

    #[test]
    fn empty_image_has_no_texture() {
        let mut gpu = HeadlessGpu::new();
        let image = LightmapImage::new(&mut gpu, "empty", 8, 0, 16, vec![]);
        assert!(image.texture().is_none());
        assert_eq!(gpu.live_textures(), 0);
    }

    #[test]
    #[should_panic]
    fn wrong_data_length_panics() {
        let mut gpu = HeadlessGpu::new();
        LightmapImage::new(&mut gpu, "lm0", 8, 4, 4, vec![0; 15]);
    }

    #[test]
    fn section_copies_uv_range() {
        let mut gpu = HeadlessGpu::new();
        let uvs = [Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE];
        let mut section = LightmapSection::new(&mut gpu, "lm0", &uvs, 1, 2);
        assert_eq!(section.uvs(), &[Vec2::X, Vec2::Y]);

        let contents = gpu.buffer_contents(section.buffer().unwrap()).unwrap();
        assert_eq!(contents.len(), 2 * 8);
        assert_eq!(&contents[0..4], &1.0f32.to_le_bytes());

        let mut copy = section.make_copy(&mut gpu);
        copy.uvs_mut()[0] = Vec2::splat(0.5);
        copy.refresh_gpu(&mut gpu);
        assert_eq!(section.uvs()[0], Vec2::X);
        assert_ne!(section.buffer(), copy.buffer());
        assert_eq!(gpu.live_buffers(), 2);

        section.release_gpu(&mut gpu);
        copy.release_gpu(&mut gpu);
        assert_eq!(gpu.live_buffers(), 0);
    }

    #[test]
    fn sections_without_uvs_have_no_buffer() {
        let mut gpu = HeadlessGpu::new();
        let section = LightmapSection::from_uvs(&mut gpu, "", vec![]);
        assert!(section.buffer().is_none());
        assert!(!section.has_lightmap());
        assert!(!LightmapSection::none().has_lightmap());
    }
}
