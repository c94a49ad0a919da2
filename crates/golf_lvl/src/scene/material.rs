use crate::assets::TextureHandle;
use glam::Vec3;

/// Named surface properties. Entities refer to materials by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Inactive materials are invisible to lookups, but keep their place in the level.
    pub active: bool,
    pub friction: f32,
    pub restitution: f32,
    pub kind: MaterialKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    Texture {
        path: String,
        /// Resolved lazily, see [`crate::Level::resolve_assets`]
        texture: Option<TextureHandle>,
    },
    Color(Vec3),
    DiffuseColor(Vec3),
    Environment,
}

impl Material {
    fn with_kind(kind: MaterialKind) -> Self {
        Self {
            name: String::new(),
            active: true,
            friction: 0.0,
            restitution: 0.0,
            kind,
        }
    }

    pub fn color(rgb: Vec3) -> Self {
        Self::with_kind(MaterialKind::Color(rgb))
    }

    pub fn diffuse_color(rgb: Vec3) -> Self {
        Self::with_kind(MaterialKind::DiffuseColor(rgb))
    }

    pub fn texture(path: impl Into<String>) -> Self {
        Self::with_kind(MaterialKind::Texture {
            path: path.into(),
            texture: None,
        })
    }

    pub fn environment() -> Self {
        Self::with_kind(MaterialKind::Environment)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Color of color materials.
    pub fn rgb(&self) -> Option<Vec3> {
        match &self.kind {
            MaterialKind::Color(rgb) | MaterialKind::DiffuseColor(rgb) => Some(*rgb),
            _ => None,
        }
    }

    pub fn texture_path(&self) -> Option<&str> {
        match &self.kind {
            MaterialKind::Texture { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The resolved texture of a texture material. [`None`] for other kinds, or if the texture
    /// wasn't resolved yet.
    pub fn texture_handle(&self) -> Option<&TextureHandle> {
        match &self.kind {
            MaterialKind::Texture { texture, .. } => texture.as_ref(),
            _ => None,
        }
    }
}
