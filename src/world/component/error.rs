use thiserror::Error;

use crate::world::identifier::{Identifier, IdentifierError};

/// Errors raised by the [`TypeRegistry`](crate::TypeRegistry)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The same state type was registered twice
    #[error("Component type already registered: {name}")]
    DuplicateType { name: &'static str },

    /// Type lookup failed (type not found in registry)
    #[error("Component type not found in registry. Must register the type via `register()` before use")]
    UnknownType,
}

/// Errors that can occur during component operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// Identifier collision, or the entity already owns a component of an
    /// aliased type. Never silently overwrites.
    #[error("Component already exists: {context} ({identifier:?})")]
    DuplicatedComponent {
        identifier: Identifier,
        context: &'static str,
    },

    /// Attempted to attach a component to an entity absent from the Manager
    #[error("Entity not registered with this Manager: {entity:?}")]
    InvalidComponentEntity { entity: Identifier },

    /// Component lookup failed
    #[error("Component not found: {identifier:?}")]
    ComponentNotFound { identifier: Identifier },

    /// A typed relation was assigned a component outside the target type's
    /// equivalence class
    #[error("Relation target type mismatch: expected `{expected}`, found `{found}`")]
    IncompatibleComponentType {
        expected: &'static str,
        found: &'static str,
    },

    /// The component's state payload is not of the requested type
    #[error("Component state is not of type `{expected}`")]
    StateTypeMismatch { expected: &'static str },

    /// An update patch could not be applied
    #[error("Invalid update patch: {reason}")]
    InvalidPatch { reason: &'static str },

    /// State could not be structurally copied or merged
    #[error("State serialization failed for `{type_name}`: {message}")]
    StateSerialization {
        type_name: &'static str,
        message: String,
    },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}
