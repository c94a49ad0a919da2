use std::num::NonZeroU32;

/// Untyped handle for a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    pub index: u32,
    pub generation: NonZeroU32,
}

/// Generic pool implementation. Allocates values of type `T`, and allows accessing them via
/// dedicated handles. The handles include 32-bit index and generation counts, the latter
/// being used as a simple use-after-free test.
///
/// Note, this implementation isn't panic-proof. There are some conditions that can cause panics:
///  * overflowing the 32-bit index counter
///  * overflowing the 32-bit generation counter
///
/// ## Example
/// ```
/// # use golf_utils::Pool;
/// let mut pool: Pool<u32> = Pool::new();
///
/// let handle = pool.allocate(10);
/// assert_eq!(pool.try_get(handle), Some(&10));
///
/// // Deallocating returns the value, and the handle becomes invalid
/// assert_eq!(pool.try_deallocate(handle), Some(10));
/// assert!(pool.try_get(handle).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool<T> {
    top_generation: NonZeroU32,
    free_indices: Vec<u32>,
    entries: Vec<Option<(NonZeroU32, T)>>,

    /// The amount of entries the internal storage grows by when it runs out of free slots.
    pub growth_amount: NonZeroU32,
}

impl<T> Pool<T> {
    /// Creates a new pool, growing by 10 entries at a time.
    pub fn new() -> Self {
        Self {
            top_generation: NonZeroU32::MIN,
            free_indices: vec![],
            entries: vec![],
            growth_amount: NonZeroU32::new(10).expect("non-zero literal"),
        }
    }

    /// Allocates a new pool entry, fills it with `value`, and returns its handle.
    ///
    /// ## Panics
    ///  * On 32-bit index overflow
    ///  * On 32-bit generation overflow
    pub fn allocate(&mut self, value: T) -> PoolHandle {
        let index = match self.free_indices.pop() {
            Some(index) => index,
            None => {
                let low_index = self.entries.len() as u32;
                let high_index = low_index
                    .checked_add(self.growth_amount.get())
                    .expect("pool index overflow");

                // Reverse index range, so that pop gets lowest entries
                self.free_indices.extend((low_index + 1..high_index).rev());
                self.entries.extend((low_index..high_index).map(|_| None));
                low_index
            }
        };

        let generation = self.top_generation;
        self.top_generation = generation.checked_add(1).expect("pool generation overflow");
        self.entries[index as usize] = Some((generation, value));

        PoolHandle { index, generation }
    }

    /// Deallocates a specified pool entry. If the handle is invalid, [`None`] is returned and
    /// the pool is left unchanged.
    pub fn try_deallocate(&mut self, handle: PoolHandle) -> Option<T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.free_indices.push(handle.index);
        self.entries[handle.index as usize]
            .take()
            .map(|(_, value)| value)
    }

    /// Returns an immutable reference to a specified pool entry. If the handle is invalid, [`None`]
    /// is returned.
    pub fn try_get(&self, handle: PoolHandle) -> Option<&T> {
        match self.entries.get(handle.index as usize) {
            Some(Some((generation, value))) if *generation == handle.generation => Some(value),
            _ => None,
        }
    }

    /// Verifies the validity of the specified handle.
    #[inline]
    pub fn is_valid(&self, handle: PoolHandle) -> bool {
        self.try_get(handle).is_some()
    }

    /// Counts how many pool entries are occupied.
    ///
    /// This is a fairly expensive operation, as it linearly scans all entries.
    pub fn count_allocated(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}
