//! Construct-once shared values.
//!
//! [`SharedSlot`] caches a single shared instance of an expensive-to-build
//! value: the first `get_or_init` pays the construction cost, every later
//! caller receives a clone of the same `Arc`. `const`-constructible, so a
//! slot can live in a `static` when a process-wide instance is wanted.

use std::sync::{Arc, OnceLock};

/// A construct-once cache for one shared value.
pub struct SharedSlot<T> {
    slot: OnceLock<Arc<T>>,
}

impl<T> SharedSlot<T> {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Return the shared value, constructing it on first use.
    ///
    /// `init` runs at most once per slot, even with concurrent callers.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> Arc<T> {
        Arc::clone(self.slot.get_or_init(|| Arc::new(init())))
    }

    /// The shared value, if it has been constructed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.get().map(Arc::clone)
    }

    /// Whether the value has been constructed.
    pub fn initialized(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T> Default for SharedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SharedSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSlot")
            .field("initialized", &self.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn init_runs_once() {
        let constructions = AtomicUsize::new(0);
        let slot: SharedSlot<String> = SharedSlot::new();
        assert!(!slot.initialized());
        assert!(slot.get().is_none());

        let first = slot.get_or_init(|| {
            constructions.fetch_add(1, Ordering::SeqCst);
            "expensive".to_string()
        });
        let second = slot.get_or_init(|| {
            constructions.fetch_add(1, Ordering::SeqCst);
            "never built".to_string()
        });

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert_eq!(*first, "expensive");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn works_in_a_static() {
        static SLOT: SharedSlot<Vec<u32>> = SharedSlot::new();

        let a = SLOT.get_or_init(|| vec![1, 2, 3]);
        let b = SLOT.get().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(SLOT.initialized());
    }

    #[test]
    fn concurrent_callers_share_one_instance() {
        let slot: Arc<SharedSlot<u64>> = Arc::new(SharedSlot::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let slot = Arc::clone(&slot);
            handles.push(std::thread::spawn(move || *slot.get_or_init(|| i)));
        }
        let values: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        // Whichever thread won, every caller observed the same value.
        assert!(values.windows(2).all(|w| w[0] == w[1]));
    }
}
