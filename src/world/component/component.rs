use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::world::entity::entity::Entity;
use crate::world::identifier::Identifier;
use crate::world::manager::Manager;

use super::error::ComponentError;
use super::state::ComponentState;
use super::type_registry::TypeKind;

/// A versioned, typed data record owned by exactly one entity inside one
/// [`Manager`](crate::Manager).
///
/// `version` starts at 0 and increases by exactly one per applied update,
/// regardless of how many fields changed. It never decreases.
pub struct Component {
    identifier: Identifier,
    entity: Identifier,
    kind: TypeKind,
    version: u64,
    state: Box<dyn ComponentState>,
}

impl Component {
    pub(crate) fn new(
        identifier: Identifier,
        entity: Identifier,
        kind: TypeKind,
        state: Box<dyn ComponentState>,
    ) -> Self {
        Self {
            identifier,
            entity,
            kind,
            version: 0,
            state,
        }
    }

    /// Thin constructor delegating to [`Manager::add_component`]. The type
    /// must already be registered with the Manager's registry.
    pub fn create<C: ComponentState>(
        manager: &mut Manager,
        entity: Entity,
        identifier: Option<Identifier>,
    ) -> Result<Identifier, ComponentError> {
        manager.add_component::<C>(entity, identifier)
    }

    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    /// Identifier of the owning entity.
    pub fn entity(&self) -> Identifier {
        self.entity
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Typed read access to the state payload.
    pub fn state<C: ComponentState>(&self) -> Option<&C> {
        self.state.as_ref().as_any().downcast_ref::<C>()
    }

    /// Typed mutable access to the state payload. Mutable component access
    /// only exists inside [`ComponentUpdate::Mutate`], so every edit made
    /// through this still lands inside exactly one version bump.
    pub fn state_mut<C: ComponentState>(&mut self) -> Option<&mut C> {
        self.state.as_mut().as_any_mut().downcast_mut::<C>()
    }

    pub(crate) fn state_dyn(&self) -> &dyn ComponentState {
        self.state.as_ref()
    }

    pub(crate) fn state_dyn_mut(&mut self) -> &mut dyn ComponentState {
        self.state.as_mut()
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Component")
            .field("identifier", &self.identifier)
            .field("entity", &self.entity)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// A mutation applied to a component through
/// [`Manager::update_component`](crate::Manager::update_component).
pub enum ComponentUpdate {
    /// A partial-state object; its top-level fields are merged shallowly
    /// into the current state. Must be a JSON object.
    Merge(Value),
    /// A mutator performing arbitrary in-place edits on the component. It
    /// receives a read view of the Manager, so it can resolve relations or
    /// read other components to compute its edit. The component being
    /// mutated is lent out of the index for the duration, so the Manager
    /// does not resolve it from inside the mutator.
    Mutate(Box<dyn FnOnce(&Manager, &mut Component)>),
}

/// Value snapshot of a component. `state` is structurally deep-copied, so
/// later mutation of the live component does not alter a snapshot taken
/// earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub identifier: Identifier,
    pub entity: Identifier,
    pub type_name: String,
    pub version: u64,
    pub state: Value,
}
