//! Model and texture asset collaborator
//!
//! Levels only store asset paths. Live handles are obtained from an [`AssetResolver`], which
//! may not have the asset ready yet, in which case the level keeps asking on subsequent
//! [`crate::Level::resolve_assets`] calls.

use ahash::{AHashMap, AHashSet};
use golf_utils::{ArcPool, ArcPoolHandle};
use log::debug;

/// Shared handle to a loaded model. Cloning adds a holder, dropping releases it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelHandle(ArcPoolHandle);

/// Shared handle to a loaded texture. Cloning adds a holder, dropping releases it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureHandle(ArcPoolHandle);

impl ModelHandle {
    /// Amount of live handles to the model, this one included.
    pub fn holders(&self) -> usize {
        self.0.holders()
    }
}

impl TextureHandle {
    /// Amount of live handles to the texture, this one included.
    pub fn holders(&self) -> usize {
        self.0.holders()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Ready(T),
    /// The asset isn't available yet. Asking again later is fine.
    Pending,
}

impl<T> Resolution<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Resolution::Ready(value) => Some(value),
            Resolution::Pending => None,
        }
    }
}

pub trait AssetResolver {
    fn resolve_model(&mut self, path: &str) -> Resolution<ModelHandle>;
    fn resolve_texture(&mut self, path: &str) -> Resolution<TextureHandle>;
}

/// An asset the cache was asked for, but doesn't have.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetRequest {
    Model(String),
    Texture(String),
}

/// Reference counted asset cache, keyed by asset paths.
///
/// Lookups of missing assets are remembered as [`AssetRequest`]s, which the owner is supposed
/// to fulfill by loading the asset and calling [`AssetCache::insert_model`] or
/// [`AssetCache::insert_texture`]. Assets stay alive as long as any handle to them does.
pub struct AssetCache<M, T> {
    models: ArcPool<(String, M)>,
    textures: ArcPool<(String, T)>,
    model_paths: AHashMap<String, u32>,
    texture_paths: AHashMap<String, u32>,
    pending: Vec<AssetRequest>,
    pending_set: AHashSet<AssetRequest>,
}

impl<M, T> AssetCache<M, T> {
    pub fn new() -> Self {
        Self {
            models: ArcPool::new(),
            textures: ArcPool::new(),
            model_paths: AHashMap::default(),
            texture_paths: AHashMap::default(),
            pending: vec![],
            pending_set: AHashSet::default(),
        }
    }

    pub fn insert_model(&mut self, path: &str, model: M) -> ModelHandle {
        let handle = self.models.allocate((path.to_owned(), model));
        self.model_paths.insert(path.to_owned(), handle.index());
        self.fulfill(&AssetRequest::Model(path.to_owned()));
        ModelHandle(handle)
    }

    pub fn insert_texture(&mut self, path: &str, texture: T) -> TextureHandle {
        let handle = self.textures.allocate((path.to_owned(), texture));
        self.texture_paths.insert(path.to_owned(), handle.index());
        self.fulfill(&AssetRequest::Texture(path.to_owned()));
        TextureHandle(handle)
    }

    pub fn model(&self, handle: &ModelHandle) -> &M {
        &self.models.get(&handle.0).1
    }

    pub fn texture(&self, handle: &TextureHandle) -> &T {
        &self.textures.get(&handle.0).1
    }

    /// Requests for assets that were looked up but aren't in the cache, in lookup order.
    pub fn pending_requests(&self) -> &[AssetRequest] {
        &self.pending
    }

    /// Takes the pending requests out of the cache.
    pub fn take_pending_requests(&mut self) -> Vec<AssetRequest> {
        self.pending_set.clear();
        std::mem::take(&mut self.pending)
    }

    /// Frees every asset without live handles. Returns the amount of freed assets.
    pub fn collect_garbage(&mut self) -> u32 {
        let freed = self.models.collect_garbage() + self.textures.collect_garbage();

        let models = &self.models;
        self.model_paths
            .retain(|path, index| lookup_index(models, path, *index).is_some());
        let textures = &self.textures;
        self.texture_paths
            .retain(|path, index| lookup_index(textures, path, *index).is_some());

        if freed > 0 {
            debug!("Asset cache freed {freed} assets");
        }
        freed
    }

    /// Amount of models and textures with live handles.
    pub fn count_alive(&self) -> usize {
        self.models.count_alive() + self.textures.count_alive()
    }

    fn request(&mut self, request: AssetRequest) {
        if self.pending_set.insert(request.clone()) {
            self.pending.push(request);
        }
    }

    fn fulfill(&mut self, request: &AssetRequest) {
        if self.pending_set.remove(request) {
            self.pending.retain(|pending| pending != request);
        }
    }
}

fn lookup<A>(
    pool: &ArcPool<(String, A)>,
    paths: &AHashMap<String, u32>,
    path: &str,
) -> Option<ArcPoolHandle> {
    lookup_index(pool, path, *paths.get(path)?)
}

/// Revives the handle in the given slot, making sure the slot wasn't reused by another asset.
fn lookup_index<A>(pool: &ArcPool<(String, A)>, path: &str, index: u32) -> Option<ArcPoolHandle> {
    let handle = pool.upgrade(index)?;
    (pool.get(&handle).0 == path).then_some(handle)
}

impl<M, T> AssetResolver for AssetCache<M, T> {
    fn resolve_model(&mut self, path: &str) -> Resolution<ModelHandle> {
        match lookup(&self.models, &self.model_paths, path) {
            Some(handle) => Resolution::Ready(ModelHandle(handle)),
            None => {
                self.request(AssetRequest::Model(path.to_owned()));
                Resolution::Pending
            }
        }
    }

    fn resolve_texture(&mut self, path: &str) -> Resolution<TextureHandle> {
        match lookup(&self.textures, &self.texture_paths, path) {
            Some(handle) => Resolution::Ready(TextureHandle(handle)),
            None => {
                self.request(AssetRequest::Texture(path.to_owned()));
                Resolution::Pending
            }
        }
    }
}

impl<M, T> Default for AssetCache<M, T> {
    fn default() -> Self {
        Self::new()
    }
}
