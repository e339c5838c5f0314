use std::any::Any;

use crate::world::entity::entity::Entity;
use crate::world::identifier::Identifier;
use crate::world::manager::Manager;

/// Handle naming one system attachment within a Manager.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct SystemId(pub(crate) u64);

/// A pluggable unit attached to a [`Manager`](crate::Manager).
///
/// Every method has a no-op default; a concrete system overrides any subset.
/// Lifecycle: detached → initialized (`initialize` runs once, at attachment)
/// → destroyed (`destroy` runs once, at detachment). Detachment consumes the
/// system, so there is no path back to initialized.
///
/// Notification hooks receive a read view of the Manager; structural changes
/// must be routed through the Manager's own operations from the periodic
/// hooks (`update`/`render`), which receive it mutably.
pub trait System: Any {
    /// Runs once when the system is attached.
    fn initialize(&mut self, manager: &mut Manager) {
        let _ = manager;
    }

    /// Runs once when the system is detached.
    fn destroy(&mut self, manager: &mut Manager) {
        let _ = manager;
    }

    /// Periodic work, driven by [`Manager::update`].
    fn update(&mut self, manager: &mut Manager, delta_seconds: f64) {
        let _ = (manager, delta_seconds);
    }

    /// Periodic presentation work, driven by [`Manager::render`].
    fn render(&mut self, manager: &mut Manager) {
        let _ = manager;
    }

    /// A component was added; it is already registered when this fires.
    fn component_added(&mut self, manager: &Manager, component: Identifier) {
        let _ = (manager, component);
    }

    /// A component's state was mutated and its version bumped.
    fn component_updated(&mut self, manager: &Manager, component: Identifier) {
        let _ = (manager, component);
    }

    /// A component is about to be detached; it is still fully registered and
    /// still attached to its entity when this fires.
    fn component_will_be_deleted(&mut self, manager: &Manager, component: Identifier) {
        let _ = (manager, component);
    }

    /// An entity is about to be torn down; all of its components are still
    /// attached when this fires.
    fn entity_will_be_deleted(&mut self, manager: &Manager, entity: Entity) {
        let _ = (manager, entity);
    }

    /// A named capability other systems can look up through
    /// [`Manager::service`]. Return the service instance to become
    /// discoverable while attached.
    fn service(&self) -> Option<&dyn Any> {
        None
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) enum SystemState {
    Detached,
    Initialized,
}

pub(crate) struct SystemSlot {
    pub id: SystemId,
    pub state: SystemState,
    pub system: Box<dyn System>,
}

// Stand-in occupying a slot while its real system is borrowed out to run a
// hook. Exposes no service and does nothing.
pub(crate) struct NullSystem;

impl System for NullSystem {}
