use std::{
    hash::{Hash, Hasher},
    sync::{Arc, Weak},
};

/// Handle to an element in an arc pool. Cloning the handle adds a holder, dropping it removes one.
#[derive(Debug, Clone)]
pub struct ArcPoolHandle(Arc<u32>);

impl ArcPoolHandle {
    /// Slot index of the element within its pool.
    pub fn index(&self) -> u32 {
        *self.0
    }

    /// Amount of live handles to this element, this one included.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl PartialEq for ArcPoolHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ArcPoolHandle {}

impl Hash for ArcPoolHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

/// Atomically reference counted generic pool.
///
/// Allows to store a set of `T` elements, and access them via shared handles. Handles are backed
/// internally by an [`Arc`], and the pool itself only keeps a [`Weak`] to each of them. Once every
/// handle to an element is dropped, its slot can be reclaimed (which is done automatically when
/// needed during allocation, or manually via [`Self::collect_garbage`]).
///
/// ## Example
/// ```
/// # use golf_utils::ArcPool;
/// let mut pool = ArcPool::new();
/// let handle = pool.allocate("flag.obj");
/// let copy = handle.clone();
/// assert_eq!(copy.holders(), 2);
///
/// drop(handle);
/// drop(copy);
/// assert_eq!(pool.collect_garbage(), 1);
/// ```
pub struct ArcPool<T> {
    free_indices: Vec<u32>,
    values: Vec<Option<(Weak<u32>, T)>>,
}

impl<T> ArcPool<T> {
    pub fn new() -> Self {
        Self {
            free_indices: vec![],
            values: vec![],
        }
    }

    pub fn allocate(&mut self, initial: T) -> ArcPoolHandle {
        if self.free_indices.is_empty() {
            self.collect_garbage();
        }

        let index = match self.free_indices.pop() {
            Some(index) => index,
            None => {
                self.values.push(None);
                u32::try_from(self.values.len() - 1).expect("pool index overflow")
            }
        };

        let handle = Arc::new(index);
        self.values[index as usize] = Some((Arc::downgrade(&handle), initial));
        ArcPoolHandle(handle)
    }

    /// Returns an immutable reference to an element through its handle.
    ///
    /// ## Panics
    /// Panics if the handle is invalid (points to an invalid index or a dead element, which
    /// may happen when handles from different pools are mixed up)
    pub fn get(&self, handle: &ArcPoolHandle) -> &T {
        &self
            .values
            .get(handle.index() as usize)
            .expect("invalid index in a live arc pool reference")
            .as_ref()
            .expect("invalid dead value in a live arc pool reference")
            .1
    }

    /// Attempts to revive a handle to the element in the given slot. Returns [`None`] if the slot
    /// is empty, or every handle to its element was already dropped.
    pub fn upgrade(&self, index: u32) -> Option<ArcPoolHandle> {
        let (weak, _) = self.values.get(index as usize)?.as_ref()?;
        weak.upgrade().map(ArcPoolHandle)
    }

    /// Drops any values without live references, freeing up their indices.
    ///
    /// Returns the amount of freed entries.
    pub fn collect_garbage(&mut self) -> u32 {
        let mut freed = 0;
        for (index, slot) in self.values.iter_mut().enumerate() {
            if let Some((weak, _)) = slot.as_ref() {
                if weak.strong_count() == 0 {
                    *slot = None;
                    self.free_indices.push(index as u32);
                    freed += 1;
                }
            }
        }
        freed
    }

    /// Counts the elements that still have live handles.
    pub fn count_alive(&self) -> usize {
        self.values
            .iter()
            .flatten()
            .filter(|(weak, _)| weak.strong_count() > 0)
            .count()
    }
}

impl<T> Default for ArcPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
