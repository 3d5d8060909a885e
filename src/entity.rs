//! Tracked entities and the access policy governing their overridable value.
//!
//! A [`Tracked`] value belongs to a declared family and carries two pieces of
//! state: the default supplied at construction and the binding currently
//! visible to readers. The binding is mutated only by the registry and scope
//! machinery; application code reads through [`Tracked::read`] and, under the
//! fallback policy, may replace the default outside a scope.
//!
//! The registry never owns an entity: it sees only `Weak` handles to the
//! interior cell. Dropping a `Tracked` lapses those handles; the registry
//! prunes them lazily and treats a dead handle as a no-op, never an error.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{OverscopeResult, ScopeError};
use crate::family::{EntityId, FamilyId};
use crate::registry::FamilyRegistry;

/// What a read observes when no scope is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// Reads fall back to the per-entity default outside a scope.
    Fallback,
    /// Reads fail outside a scope; the value only exists while one is active.
    Strict,
}

impl std::fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessPolicy::Fallback => write!(f, "fallback"),
            AccessPolicy::Strict => write!(f, "strict"),
        }
    }
}

/// The effective state of the overridable value.
#[derive(Debug, Clone)]
pub(crate) enum Binding<T> {
    /// A readable value exists (a default or a broadcast override).
    Bound(T),
    /// No scope has supplied a value; strict reads fail in this state.
    Unbound,
}

struct CellState<T> {
    default_value: T,
    binding: Binding<T>,
}

/// Interior of a tracked entity, shared with the registry through `Weak`.
///
/// Lock ordering: the registry lock is always taken before a cell lock,
/// never the reverse. Reads take only the cell lock.
pub(crate) struct EntityCell<T> {
    id: EntityId,
    family: FamilyId,
    family_name: String,
    state: Mutex<CellState<T>>,
}

impl<T: Clone> EntityCell<T> {
    pub(crate) fn new(
        id: EntityId,
        family: FamilyId,
        family_name: String,
        default_value: T,
        binding: Binding<T>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            family,
            family_name,
            state: Mutex::new(CellState {
                default_value,
                binding,
            }),
        })
    }

    fn locked(&self) -> MutexGuard<'_, CellState<T>> {
        self.state.lock().expect("entity cell lock poisoned")
    }

    pub(crate) fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn family(&self) -> FamilyId {
        self.family
    }

    pub(crate) fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Push a broadcast override into the cell.
    pub(crate) fn bind(&self, value: T) {
        self.locked().binding = Binding::Bound(value);
    }

    /// Undo an override per policy: fallback rebinds the current default,
    /// strict revokes the value entirely.
    pub(crate) fn restore(&self, policy: AccessPolicy) {
        let mut state = self.locked();
        state.binding = match policy {
            AccessPolicy::Fallback => Binding::Bound(state.default_value.clone()),
            AccessPolicy::Strict => Binding::Unbound,
        };
    }

    /// The currently bound value, if any.
    pub(crate) fn current(&self) -> Option<T> {
        match &self.locked().binding {
            Binding::Bound(value) => Some(value.clone()),
            Binding::Unbound => None,
        }
    }

    /// Replace the default and rebind it. Callers enforce the policy and
    /// no-active-scope checks before reaching this.
    pub(crate) fn replace_default(&self, value: T) {
        let mut state = self.locked();
        state.default_value = value.clone();
        state.binding = Binding::Bound(value);
    }

    pub(crate) fn default_value(&self) -> T {
        self.locked().default_value.clone()
    }
}

/// An owner-held handle to a tracked entity.
///
/// Constructing a `Tracked` registers it with its family; dropping it is the
/// only way it leaves the registry (the weak handle lapses and is pruned on
/// the next sweep). The registry is never the reason an entity stays alive.
pub struct Tracked<T> {
    cell: Arc<EntityCell<T>>,
    registry: Arc<FamilyRegistry<T>>,
}

impl<T: Clone> Tracked<T> {
    /// Construct and register a tracked entity in the given family.
    ///
    /// If a scope is active, the entity starts bound to the scope's override
    /// value rather than `default_value`, and will be restored when the scope
    /// is released. Errors if the family is not declared.
    pub fn new(
        registry: &Arc<FamilyRegistry<T>>,
        family: FamilyId,
        default_value: T,
    ) -> OverscopeResult<Self> {
        let cell = registry.register_entity(family, default_value)?;
        Ok(Self {
            cell,
            registry: Arc::clone(registry),
        })
    }

    /// Read the effective value.
    ///
    /// Fallback policy: always succeeds (the binding is bound from
    /// construction onward). Strict policy: fails with
    /// [`ScopeError::NotInScope`] unless a scope has supplied a value.
    pub fn read(&self) -> OverscopeResult<T> {
        self.cell.current().ok_or_else(|| {
            ScopeError::NotInScope {
                family: self.cell.family_name().to_string(),
                entity: self.cell.id().get(),
            }
            .into()
        })
    }

    /// Replace the per-entity default (fallback policy, outside a scope only).
    ///
    /// The new default also becomes the effective value. While a scope is
    /// active the controller is the sole authority on the effective value and
    /// this errors with [`ScopeError::OverrideActive`]; under the strict
    /// policy it errors with [`ScopeError::StrictDefault`] unconditionally.
    pub fn set_default(&self, value: T) -> OverscopeResult<()> {
        self.registry.replace_entity_default(&self.cell, value)
    }

    /// The default supplied at construction (or via `set_default`).
    pub fn default_value(&self) -> T {
        self.cell.default_value()
    }

    /// Whether a readable value currently exists.
    pub fn is_bound(&self) -> bool {
        self.cell.current().is_some()
    }

    /// The family this entity belongs to.
    pub fn family(&self) -> FamilyId {
        self.cell.family()
    }

    /// This entity's diagnostic id.
    pub fn id(&self) -> EntityId {
        self.cell.id()
    }
}

impl<T: Clone> std::fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracked")
            .field("id", &self.cell.id())
            .field("family", &self.cell.family_name())
            .field("bound", &self.is_bound())
            .finish()
    }
}
