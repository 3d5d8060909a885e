//! Rich diagnostic error types for overscope.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text so callers know exactly what
//! went wrong — in particular, which entity and family were touched outside a
//! scope — and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the overscope crate.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum OverscopeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] crate::config::ConfigError),
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("duplicate family: \"{name}\" is already declared as family {existing_id}")]
    #[diagnostic(
        code(overscope::registry::duplicate_family),
        help(
            "Each family is declared exactly once, at a known initialization \
             point. Reuse the FamilyId returned by the first declaration \
             instead of declaring again."
        )
    )]
    DuplicateFamily { name: String, existing_id: u64 },

    #[error("unknown family: {family}")]
    #[diagnostic(
        code(overscope::registry::unknown_family),
        help(
            "No family with this name or id is declared in the registry. \
             Declare it with `declare()` before constructing tracked entities, \
             or list known families with `families()`."
        )
    )]
    UnknownFamily { family: String },

    #[error("invalid family name \"{name}\": {reason}")]
    #[diagnostic(
        code(overscope::registry::invalid_family_name),
        help(
            "Family names must be non-empty and free of whitespace and \
             control characters; they double as lookup keys and appear in \
             diagnostics verbatim."
        )
    )]
    InvalidFamilyName { name: String, reason: String },

    #[error("entity allocator exhausted: cannot allocate more than u64::MAX entities")]
    #[diagnostic(
        code(overscope::registry::exhausted),
        help(
            "The entity ID space is exhausted. This is extremely unlikely in \
             practice (requires 2^64 allocations). If you see this error, \
             check for an entity construction loop."
        )
    )]
    AllocatorExhausted,
}

// ---------------------------------------------------------------------------
// Scope errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ScopeError {
    #[error("entity {entity} in family \"{family}\" was read outside an active scope")]
    #[diagnostic(
        code(overscope::scope::not_in_scope),
        help(
            "Under the strict policy the attribute is only readable while an \
             override scope is active. Wrap the call site in a scope: \
             `let _scope = registry.enter(value);`"
        )
    )]
    NotInScope { family: String, entity: u64 },

    #[error(
        "cannot set the default for entity {entity} in family \"{family}\" while a scope is active"
    )]
    #[diagnostic(
        code(overscope::scope::override_active),
        help(
            "The scope controller is the sole authority on the effective \
             value for the scope's duration. Set the default before entering \
             the scope, or after it is released."
        )
    )]
    OverrideActive { family: String, entity: u64 },

    #[error(
        "entity {entity} in family \"{family}\" has no writable default under the strict policy"
    )]
    #[diagnostic(
        code(overscope::scope::strict_default),
        help(
            "Strict registries never expose a per-entity default: the \
             attribute only carries a value while a scope is active. Use a \
             fallback registry if entities need standalone defaults."
        )
    )]
    StrictDefault { family: String, entity: u64 },
}

// ---------------------------------------------------------------------------
// Override source errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("not a valid source preference: \"{preference}\"")]
    #[diagnostic(
        code(overscope::source::invalid_preference),
        help("Valid source preferences are: \"builtin\", \"configured\".")
    )]
    InvalidPreference { preference: String },

    #[error("invalid override table: {message}")]
    #[diagnostic(
        code(overscope::source::invalid_table),
        help(
            "A configured override table must be a JSON object mapping value \
             names to strings, e.g. {{\"brown\": \"#8b4513\"}}."
        )
    )]
    InvalidTable { message: String },
}

/// Convenience alias for functions returning overscope results.
pub type OverscopeResult<T> = std::result::Result<T, OverscopeError>;
