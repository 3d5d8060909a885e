//! Family registry: weak tracking of live entities and override broadcast.
//!
//! The [`FamilyRegistry`] maps declared families to their live members, held
//! through `Weak` handles so the registry never extends an entity's lifetime.
//! It also owns the at-most-one active scope: entering installs a pending
//! override for every known family (so entities constructed mid-scope start
//! overridden) and pushes the value into every live entity; releasing clears
//! the pendings and restores each affected entity per the registry's
//! [`AccessPolicy`].
//!
//! A single mutex covers declaration, registration, propagation, and
//! restoration. Without it, a registration racing the propagation pass could
//! either miss the override or double-apply it. Lock ordering is registry
//! lock → entity cell lock, never the reverse; plain reads take only the
//! cell lock.
//!
//! The registry is an explicitly passed shared object (`Arc`), not ambient
//! global state, so tests can run isolated instances side by side.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::config::RegistryConfig;
use crate::entity::{AccessPolicy, Binding, EntityCell};
use crate::error::{OverscopeResult, RegistryError, ScopeError};
use crate::family::{
    AtomicEntityAllocator, EntityId, FamilyId, FamilyMeta, validate_family_name,
};
use crate::scope::ScopeGuard;

/// Per-family bookkeeping: metadata, live members, and the pending override
/// consulted by registrations while a scope is active.
struct FamilyState<T> {
    meta: FamilyMeta,
    /// Non-owning handles to live members; dead entries are pruned lazily.
    members: Vec<Weak<EntityCell<T>>>,
    /// Set for every known family while a scope is active.
    pending: Option<T>,
}

/// The at-most-one live scope.
struct ActiveScope<T> {
    /// Identity of the guard that opened this scope; release is a no-op for
    /// a guard whose scope has been displaced (flat, non-stacking overrides).
    epoch: u64,
    value: T,
    /// Entities mutated on entry plus entities registered while the scope was
    /// active — exactly the set release has to restore.
    affected: Vec<Weak<EntityCell<T>>>,
}

struct RegistryInner<T> {
    families: HashMap<FamilyId, FamilyState<T>>,
    name_to_id: HashMap<String, FamilyId>,
    next_family: u64,
    active: Option<ActiveScope<T>>,
    epoch: u64,
}

/// Process-wide registry of entity families and the active override scope.
pub struct FamilyRegistry<T> {
    policy: AccessPolicy,
    allocator: AtomicEntityAllocator,
    inner: Mutex<RegistryInner<T>>,
}

impl<T: Clone> FamilyRegistry<T> {
    /// Create a new, empty registry with the given access policy.
    ///
    /// Registries are shared between entity constructors and scope guards,
    /// so the constructor hands back an `Arc` directly.
    pub fn new(policy: AccessPolicy) -> Arc<Self> {
        Arc::new(Self {
            policy,
            allocator: AtomicEntityAllocator::new(),
            inner: Mutex::new(RegistryInner {
                families: HashMap::new(),
                name_to_id: HashMap::new(),
                next_family: 0,
                active: None,
                epoch: 0,
            }),
        })
    }

    /// Build a registry from a configuration: policy plus up-front family
    /// declarations.
    pub fn from_config(config: &RegistryConfig) -> OverscopeResult<Arc<Self>> {
        config.validate()?;
        let registry = Self::new(config.policy);
        for manifest in &config.families {
            registry.declare(&manifest.name)?;
        }
        Ok(registry)
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, RegistryInner<T>> {
        self.inner.lock().expect("registry lock poisoned")
    }

    /// The access policy every entity in this registry reads under.
    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    // -----------------------------------------------------------------------
    // Families
    // -----------------------------------------------------------------------

    /// Declare a family. Each tracked type registers its family exactly once,
    /// at a known initialization point; duplicate names error.
    ///
    /// A family declared while a scope is active is seeded with the scope's
    /// override, so the scope still applies to the first entity constructed
    /// inside it even though the family did not exist at entry.
    pub fn declare(&self, name: &str) -> OverscopeResult<FamilyId> {
        validate_family_name(name)?;

        let mut inner = self.locked();
        if let Some(existing) = inner.name_to_id.get(name) {
            return Err(RegistryError::DuplicateFamily {
                name: name.to_string(),
                existing_id: existing.get(),
            }
            .into());
        }

        inner.next_family += 1;
        let id = FamilyId::new(inner.next_family).expect("family ids start at 1");
        let pending = inner.active.as_ref().map(|scope| scope.value.clone());
        let seeded = pending.is_some();

        inner.families.insert(
            id,
            FamilyState {
                meta: FamilyMeta::new(id, name),
                members: Vec::new(),
                pending,
            },
        );
        inner.name_to_id.insert(name.to_string(), id);

        tracing::debug!(family = %id, name, seeded, "declared family");
        Ok(id)
    }

    /// Look up a family id by name.
    pub fn family_id(&self, name: &str) -> Option<FamilyId> {
        self.locked().name_to_id.get(name).copied()
    }

    /// Resolve a family from a name or a numeric id token.
    pub fn resolve_family(&self, token: &str) -> OverscopeResult<FamilyId> {
        let inner = self.locked();
        if let Ok(raw) = token.parse::<u64>() {
            return FamilyId::new(raw)
                .filter(|id| inner.families.contains_key(id))
                .ok_or_else(|| {
                    RegistryError::UnknownFamily {
                        family: token.to_string(),
                    }
                    .into()
                });
        }
        inner.name_to_id.get(token).copied().ok_or_else(|| {
            RegistryError::UnknownFamily {
                family: token.to_string(),
            }
            .into()
        })
    }

    /// All known families, including those with zero live members, in
    /// declaration order.
    pub fn families(&self) -> Vec<FamilyMeta> {
        let inner = self.locked();
        let mut all: Vec<FamilyMeta> = inner.families.values().map(|s| s.meta.clone()).collect();
        all.sort_by_key(|meta| meta.id);
        all
    }

    /// Number of live entities in a family (0 for unknown families).
    /// Prunes dead handles as a side effect.
    pub fn live_count(&self, family: FamilyId) -> usize {
        let mut inner = self.locked();
        match inner.families.get_mut(&family) {
            Some(state) => {
                state.members.retain(|weak| weak.strong_count() > 0);
                state.members.len()
            }
            None => 0,
        }
    }

    /// Number of live entities across all families.
    pub fn total_live(&self) -> usize {
        let mut inner = self.locked();
        inner
            .families
            .values_mut()
            .map(|state| {
                state.members.retain(|weak| weak.strong_count() > 0);
                state.members.len()
            })
            .sum()
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Register a new entity cell in `family` (driven by `Tracked::new`).
    ///
    /// If the family carries a pending override the entity starts bound to
    /// it — and joins the active scope's affected set so release restores it
    /// to its own default. Otherwise the binding follows the policy: bound to
    /// the default (fallback) or unbound (strict).
    pub(crate) fn register_entity(
        &self,
        family: FamilyId,
        default_value: T,
    ) -> OverscopeResult<Arc<EntityCell<T>>> {
        let id = self.allocator.next_id()?;

        let mut inner = self.locked();
        let Some(state) = inner.families.get_mut(&family) else {
            return Err(RegistryError::UnknownFamily {
                family: family.to_string(),
            }
            .into());
        };

        let pending = state.pending.clone();
        let overridden = pending.is_some();
        let binding = match pending {
            Some(value) => Binding::Bound(value),
            None => match self.policy {
                AccessPolicy::Fallback => Binding::Bound(default_value.clone()),
                AccessPolicy::Strict => Binding::Unbound,
            },
        };

        let cell = EntityCell::new(id, family, state.meta.name.clone(), default_value, binding);
        state.members.push(Arc::downgrade(&cell));

        if overridden {
            if let Some(active) = inner.active.as_mut() {
                active.affected.push(Arc::downgrade(&cell));
            }
        }

        tracing::debug!(entity = %id, family = %family, overridden, "registered entity");
        Ok(cell)
    }

    /// Replace an entity's default value, enforcing the write contract:
    /// never under the strict policy, never while a scope is active.
    pub(crate) fn replace_entity_default(
        &self,
        cell: &Arc<EntityCell<T>>,
        value: T,
    ) -> OverscopeResult<()> {
        if self.policy == AccessPolicy::Strict {
            return Err(ScopeError::StrictDefault {
                family: cell.family_name().to_string(),
                entity: cell.id().get(),
            }
            .into());
        }

        // Hold the registry lock so the write cannot race a scope entry.
        let inner = self.locked();
        if inner.active.is_some() {
            return Err(ScopeError::OverrideActive {
                family: cell.family_name().to_string(),
                entity: cell.id().get(),
            }
            .into());
        }
        cell.replace_default(value);
        Ok(())
    }

    /// Visit every live entity, optionally restricted to one family.
    ///
    /// The weak handles are snapshotted under the lock and the callback runs
    /// outside it, so `f` may construct or drop entities; registrations made
    /// during iteration are simply not part of the snapshot. Dead handles are
    /// skipped and purged as a side effect. Returns the number visited.
    pub fn for_each_live<F>(&self, family: Option<FamilyId>, mut f: F) -> usize
    where
        F: FnMut(EntityId, FamilyId, Option<T>),
    {
        let snapshot: Vec<Weak<EntityCell<T>>> = {
            let mut inner = self.locked();
            let mut snap = Vec::new();
            match family {
                Some(id) => {
                    if let Some(state) = inner.families.get_mut(&id) {
                        state.members.retain(|weak| weak.strong_count() > 0);
                        snap.extend(state.members.iter().cloned());
                    }
                }
                None => {
                    for state in inner.families.values_mut() {
                        state.members.retain(|weak| weak.strong_count() > 0);
                        snap.extend(state.members.iter().cloned());
                    }
                }
            }
            snap
        };

        let mut visited = 0;
        for weak in snapshot {
            // An entity may vanish between snapshot and visit; skip silently.
            if let Some(cell) = weak.upgrade() {
                f(cell.id(), cell.family(), cell.current());
                visited += 1;
            }
        }
        visited
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    /// Enter an override scope: install `value` as every known family's
    /// pending override and push it into every live entity of every family.
    ///
    /// Returns the guard representing the active scope; the override is
    /// released when the guard is dropped or explicitly exited. Scopes are
    /// flat: entering while another scope is active displaces it (with a
    /// warning) rather than stacking — see [`ScopeGuard`].
    pub fn enter(&self, value: T) -> ScopeGuard<'_, T> {
        let mut inner = self.locked();
        inner.epoch += 1;
        let epoch = inner.epoch;

        if inner.active.is_some() {
            tracing::warn!(
                "entering a scope while another is active; overrides are flat \
                 and the displaced scope will not be restored"
            );
        }

        let mut affected = Vec::new();
        let mut live = 0usize;
        let mut pruned = 0usize;
        for state in inner.families.values_mut() {
            state.pending = Some(value.clone());
            state.members.retain(|weak| match weak.upgrade() {
                Some(cell) => {
                    cell.bind(value.clone());
                    affected.push(weak.clone());
                    live += 1;
                    true
                }
                None => {
                    pruned += 1;
                    false
                }
            });
        }
        if pruned > 0 {
            tracing::trace!(pruned, "pruned dead handles during scope entry");
        }

        let families = inner.families.len();
        inner.active = Some(ActiveScope {
            epoch,
            value,
            affected,
        });
        tracing::info!(affected = live, families, "scope entered");

        ScopeGuard::new(self, epoch)
    }

    /// Release the scope opened with `epoch`: clear every family's pending
    /// override and restore each still-alive affected entity per policy.
    ///
    /// A guard whose scope was displaced by a later `enter` finds nothing to
    /// release. Dead handles are skipped, never an error.
    pub(crate) fn release_scope(&self, epoch: u64) {
        // Runs on Drop during unwind: the restore must still happen even if
        // another thread poisoned the lock.
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let owns = inner
            .active
            .as_ref()
            .map(|scope| scope.epoch == epoch)
            .unwrap_or(false);
        if !owns {
            tracing::debug!(epoch, "scope already displaced; nothing to release");
            return;
        }
        let active = inner.active.take().expect("active scope checked above");

        for state in inner.families.values_mut() {
            state.pending = None;
        }

        let mut restored = 0usize;
        let mut dead = 0usize;
        for weak in &active.affected {
            match weak.upgrade() {
                Some(cell) => {
                    cell.restore(self.policy);
                    restored += 1;
                }
                None => dead += 1,
            }
        }
        tracing::info!(restored, dead, "scope released");
    }

    /// Whether an override scope is currently active.
    pub fn scope_active(&self) -> bool {
        self.locked().active.is_some()
    }

    pub(crate) fn active_epoch(&self) -> Option<u64> {
        self.locked().active.as_ref().map(|scope| scope.epoch)
    }
}

impl<T> std::fmt::Debug for FamilyRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().expect("registry lock poisoned");
        f.debug_struct("FamilyRegistry")
            .field("policy", &self.policy)
            .field("families", &inner.families.len())
            .field("scope_active", &inner.active.is_some())
            .finish()
    }
}
