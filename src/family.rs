//! Family and entity identity for the override registry.
//!
//! A *family* is a set of entity types sharing one override mechanism.
//! Families are identified by a [`FamilyId`] and described by [`FamilyMeta`];
//! individual tracked entities carry an [`EntityId`] issued by the
//! [`AtomicEntityAllocator`] so that diagnostics can name exactly which
//! entity was touched outside a scope.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{OverscopeResult, RegistryError};

/// Unique, niche-optimized identifier for a declared family.
///
/// Uses `NonZeroU64` so that `Option<FamilyId>` is the same size as `FamilyId`
/// (the niche optimization lets the compiler use 0 as the `None` discriminant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FamilyId(NonZeroU64);

impl FamilyId {
    /// Create a `FamilyId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(FamilyId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for FamilyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "family:{}", self.0)
    }
}

/// Unique identifier for a tracked entity.
///
/// Entity ids are only used for bookkeeping and diagnostics; liveness is
/// always determined by the weak registry handle, never by the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(NonZeroU64);

impl EntityId {
    /// Create an `EntityId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(EntityId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// Metadata describing a declared family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyMeta {
    /// Unique identifier.
    pub id: FamilyId,
    /// Validated family name.
    pub name: String,
}

impl FamilyMeta {
    /// Create a new `FamilyMeta`.
    pub fn new(id: FamilyId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Thread-safe entity ID allocator.
///
/// Produces monotonically increasing IDs starting from 1.
/// Safe to share across threads via `Arc<AtomicEntityAllocator>`.
#[derive(Debug)]
pub struct AtomicEntityAllocator {
    next: AtomicU64,
}

impl AtomicEntityAllocator {
    /// Create a new allocator that starts from ID 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next entity ID.
    ///
    /// Returns an error if the ID space is exhausted (after 2^64 - 1 allocations).
    pub fn next_id(&self) -> OverscopeResult<EntityId> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        EntityId::new(raw).ok_or_else(|| RegistryError::AllocatorExhausted.into())
    }

    /// Return the next ID that *would* be allocated, without consuming it.
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for AtomicEntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a family name.
///
/// Names must be non-empty and must not contain whitespace or control
/// characters; they double as lookup keys and appear verbatim in diagnostics.
pub fn validate_family_name(name: &str) -> OverscopeResult<()> {
    if name.is_empty() {
        return Err(RegistryError::InvalidFamilyName {
            name: name.to_string(),
            reason: "name is empty".into(),
        }
        .into());
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RegistryError::InvalidFamilyName {
            name: name.to_string(),
            reason: "name contains whitespace or control characters".into(),
        }
        .into());
    }
    Ok(())
}
