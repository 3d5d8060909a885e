//! # overscope
//!
//! Scoped, broadcast-style value overrides for families of live objects:
//! enter a scope and every tracked entity — including entities constructed
//! while the scope is open — carries the override value; release the scope
//! and each entity is restored, on every exit path.
//!
//! ## Architecture
//!
//! - **Family registry** (`registry`): weak tracking of live entities per
//!   declared family, pending overrides for mid-scope constructions, one
//!   mutex over registration/propagation/restoration
//! - **Tracked entities** (`entity`): per-entity default plus the effective
//!   binding, read under a `Fallback` or `Strict` access policy
//! - **Scope guards** (`scope`): RAII enter/release with guaranteed restore,
//!   flat (non-stacking) semantics
//! - **Configuration** (`config`): policy, source preference, and family
//!   manifests as TOML
//! - **Collaborators**: override-value sources behind a preference flag
//!   (`source`), a memoizing call cache (`memo`), construct-once shared
//!   values (`shared`)
//!
//! ## Library usage
//!
//! ```
//! use overscope::entity::{AccessPolicy, Tracked};
//! use overscope::registry::FamilyRegistry;
//!
//! # fn main() -> overscope::error::OverscopeResult<()> {
//! let registry = FamilyRegistry::new(AccessPolicy::Fallback);
//! let bears = registry.declare("bear")?;
//! let bear = Tracked::new(&registry, bears, "brown".to_string())?;
//!
//! assert_eq!(bear.read()?, "brown");
//! {
//!     let _scope = registry.enter("red".to_string());
//!     assert_eq!(bear.read()?, "red");
//! }
//! assert_eq!(bear.read()?, "brown");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod family;
pub mod memo;
pub mod registry;
pub mod scope;
pub mod shared;
pub mod source;
