use thiserror::Error;

use crate::{ClassifyError, EntityIndex};

/// Errors that can occur while registering or removing a property hook.
///
/// Registration is all-or-nothing: when any of these is returned, nothing
/// was registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// The entity reference does not name a live entity
    #[error("Invalid Entity Reference/Index {entity}")]
    InvalidEntity { entity: EntityIndex },

    /// The property name could not be resolved on the entity's class
    #[error("Could not find prop {property} on entity {entity}")]
    PropertyNotFound {
        entity: EntityIndex,
        property: String,
    },

    /// The property (or one of its expanded elements) has no supported value kind
    #[error("Unsupported prop {property}: {source}")]
    UnsupportedProperty {
        property: String,
        source: ClassifyError,
    },

    /// The override registry lock was poisoned by a panic on another thread
    #[error("Override registry is unavailable (lock poisoned)")]
    RegistryUnavailable,
}
