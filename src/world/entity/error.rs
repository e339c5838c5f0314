use thiserror::Error;

use crate::world::identifier::{Identifier, IdentifierError};

/// Errors that can occur during entity operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The requested identifier is already registered in the Manager.
    /// Never silently overwrites; pick a fresh identifier.
    #[error("Entity already exists: {identifier:?}")]
    DuplicateEntity { identifier: Identifier },

    /// Entity lookup failed
    #[error("Entity not found: {identifier:?}")]
    EntityNotFound { identifier: Identifier },

    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}
