use serde::{Deserialize, Serialize};

use crate::world::identifier::Identifier;
use crate::world::manager::Manager;

use super::error::EntityError;

/// A handle identifying a bundle of components inside one
/// [`Manager`](crate::Manager). Entities hold at most one component per
/// type equivalence class.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Entity(Identifier);

impl Entity {
    pub(crate) fn new(identifier: Identifier) -> Self {
        Entity(identifier)
    }

    /// Thin constructor delegating to [`Manager::add_entity`]. When
    /// `identifier` is omitted, one is obtained from the Manager's
    /// configured generator.
    pub fn create(
        manager: &mut Manager,
        identifier: Option<Identifier>,
    ) -> Result<Entity, EntityError> {
        manager.add_entity(identifier)
    }

    /// Thin destructor delegating to [`Manager::delete_entity`], which
    /// destroys every owned component before detaching the entity.
    pub fn destroy(self, manager: &mut Manager) -> Result<(), EntityError> {
        manager.delete_entity(self)
    }

    pub fn identifier(&self) -> Identifier {
        self.0
    }
}
