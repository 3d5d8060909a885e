//! RAII guard for an active override scope.
//!
//! [`FamilyRegistry::enter`] returns a [`ScopeGuard`]; the override stays in
//! effect until the guard is released — by [`ScopeGuard::exit`] or by drop,
//! which also covers unwinding. Release is the scoped-acquisition contract:
//! it runs on every exit path, so no entity is left carrying a stale
//! override.

use crate::registry::FamilyRegistry;

/// Handle representing an active override scope.
///
/// A guard is single-use: it is created by entering a scope and releases it
/// exactly once, on `exit()` or on drop.
///
/// # Flat nesting
///
/// Scopes do not stack. Entering a second scope while one is active
/// displaces the first: entities adopt the new value, and releasing the
/// *inner* guard restores defaults fully instead of reinstating the outer
/// scope's value. The displaced outer guard then releases nothing. Known
/// limitation, not guaranteed stacking behavior.
pub struct ScopeGuard<'a, T: Clone> {
    registry: &'a FamilyRegistry<T>,
    epoch: u64,
    released: bool,
}

impl<'a, T: Clone> ScopeGuard<'a, T> {
    pub(crate) fn new(registry: &'a FamilyRegistry<T>, epoch: u64) -> Self {
        Self {
            registry,
            epoch,
            released: false,
        }
    }

    /// Release the scope now instead of at end of block.
    pub fn exit(mut self) {
        self.release_once();
    }

    /// Whether this guard still owns the registry's active scope (false once
    /// released or displaced by a later `enter`).
    pub fn is_current(&self) -> bool {
        !self.released && self.registry.active_epoch() == Some(self.epoch)
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.release_scope(self.epoch);
        }
    }
}

impl<T: Clone> Drop for ScopeGuard<'_, T> {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl<T: Clone> std::fmt::Debug for ScopeGuard<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("epoch", &self.epoch)
            .field("current", &self.is_current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entity::{AccessPolicy, Tracked};

    #[test]
    fn drop_releases_the_scope() {
        let registry = FamilyRegistry::new(AccessPolicy::Fallback);
        let bears = registry.declare("bear").unwrap();
        let bear = Tracked::new(&registry, bears, "brown".to_string()).unwrap();

        {
            let _scope = registry.enter("red".to_string());
            assert_eq!(bear.read().unwrap(), "red");
        }
        assert_eq!(bear.read().unwrap(), "brown");
    }

    #[test]
    fn guard_tracks_currency() {
        let registry: Arc<FamilyRegistry<u32>> = FamilyRegistry::new(AccessPolicy::Fallback);
        registry.declare("bear").unwrap();

        let outer = registry.enter(1);
        assert!(outer.is_current());

        let inner = registry.enter(2);
        assert!(!outer.is_current());
        assert!(inner.is_current());

        inner.exit();
        assert!(!outer.is_current());
    }

    #[test]
    fn release_runs_during_unwind() {
        let registry = FamilyRegistry::new(AccessPolicy::Strict);
        let bears = registry.declare("bear").unwrap();
        let bear = Arc::new(Tracked::new(&registry, bears, "brown".to_string()).unwrap());

        let registry_clone = Arc::clone(&registry);
        let bear_clone = Arc::clone(&bear);
        let result = std::panic::catch_unwind(move || {
            let _scope = registry_clone.enter("blue".to_string());
            assert_eq!(bear_clone.read().unwrap(), "blue");
            panic!("scope body failed");
        });
        assert!(result.is_err());

        // The override was released on the unwind path.
        assert!(!registry.scope_active());
        assert!(bear.read().is_err());
    }

    #[test]
    fn debug_shows_currency() {
        let registry: Arc<FamilyRegistry<u32>> = FamilyRegistry::new(AccessPolicy::Fallback);
        let scope = registry.enter(5);
        let out = format!("{scope:?}");
        assert!(out.contains("current: true"));
    }
}
