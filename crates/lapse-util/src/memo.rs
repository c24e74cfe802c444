use std::sync::OnceLock;

/// Per-instance slot that runs its computation at most once.
///
/// Embed it as a field of the owning type; the first access computes and stores,
/// later accesses return the stored value. Nothing is shared across instances.
#[derive(Debug)]
pub struct Memo<T> {
    slot: OnceLock<T>,
}

impl<T> Memo<T> {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Stored value, computing it with `f` on first access.
    ///
    /// Concurrent first accesses block until one computation wins; `f` runs once.
    pub fn get_or_compute<F>(&self, f: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.slot.get_or_init(f)
    }

    /// Stored value, if already computed.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    #[inline]
    pub fn is_computed(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}
