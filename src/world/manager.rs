use std::any::Any;
use std::collections::HashMap;

use log::{info, trace};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::checked_map::CheckedMap;
use super::component::component::{Component, ComponentSnapshot, ComponentUpdate};
use super::component::error::{ComponentError, TypeError};
use super::component::relation::RelationSlot;
use super::component::state::ComponentState;
use super::component::type_registry::{TypeKind, TypeRegistry};
use super::entity::entity::Entity;
use super::entity::error::EntityError;
use super::identifier::{
    Identifier, IdentifierError, IdentifierGenerator, IdentifierSpace, SequentialGenerator,
};
use super::system::error::ServiceError;
use super::system::system::{NullSystem, System, SystemId, SystemSlot, SystemState};

struct EntityRecord {
    // Keyed by the exact registered kind; class-level uniqueness is enforced
    // at insertion and lookups compare equivalence classes through the
    // registry, so later alias declarations cannot stale this index.
    components: HashMap<TypeKind, Identifier>,
}

impl EntityRecord {
    fn new() -> Self {
        Self {
            components: HashMap::new(),
        }
    }
}

// Split-borrow view so the generator (held by the same Manager) can consult
// the live identifier set while being driven mutably.
struct SpaceView<'a> {
    entities: &'a CheckedMap<Identifier, EntityRecord>,
    components: &'a CheckedMap<Identifier, Component>,
}

impl IdentifierSpace for SpaceView<'_> {
    fn contains_identifier(&self, identifier: Identifier) -> bool {
        self.entities.contains_key(&identifier) || self.components.contains_key(&identifier)
    }
}

/// The central store: owns all entities and components for one scope,
/// exposes typed queries, performs cascading deletion, and notifies attached
/// [`System`]s of lifecycle events.
///
/// The Manager is the sole mutator of its indices. All operations are
/// synchronous and atomic with respect to each other; validation completes
/// before any index is touched, so a failed call never leaves the store
/// inconsistent.
pub struct Manager {
    registry: TypeRegistry,
    generator: Box<dyn IdentifierGenerator>,
    entities: CheckedMap<Identifier, EntityRecord>,
    components: CheckedMap<Identifier, Component>,
    // Global insertion order of live components; entries are removed on
    // deletion and resolution is always by identifier.
    component_order: Vec<Identifier>,
    systems: Vec<SystemSlot>,
    next_system_id: u64,
}

impl Manager {
    /// A Manager with the sequential identifier strategy.
    pub fn new() -> Self {
        Self::with_generator(Box::new(SequentialGenerator::new()))
    }

    pub fn with_generator(generator: Box<dyn IdentifierGenerator>) -> Self {
        Self {
            registry: TypeRegistry::new(),
            generator,
            entities: CheckedMap::new(),
            components: CheckedMap::new(),
            component_order: Vec::new(),
            systems: Vec::new(),
            next_system_id: 0,
        }
    }

    // Type registration

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn register_type<C>(&mut self) -> Result<TypeKind, TypeError>
    where
        C: ComponentState + Default + Clone + Serialize + DeserializeOwned,
    {
        self.registry.register::<C>()
    }

    pub fn register_type_named<C>(&mut self, name: &'static str) -> Result<TypeKind, TypeError>
    where
        C: ComponentState + Default + Clone + Serialize + DeserializeOwned,
    {
        self.registry.register_named::<C>(name)
    }

    /// Declare two registered types as structurally interchangeable.
    pub fn alias_types<A: ComponentState, B: ComponentState>(
        &mut self,
    ) -> Result<(), TypeError> {
        self.registry.alias_types::<A, B>()
    }

    // Entities

    pub fn add_entity(&mut self, identifier: Option<Identifier>) -> Result<Entity, EntityError> {
        let identifier = match identifier {
            Some(identifier) => {
                if self.contains_identifier(identifier) {
                    return Err(EntityError::DuplicateEntity { identifier });
                }
                identifier
            }
            None => self.next_identifier()?,
        };

        self.entities.insert(identifier, EntityRecord::new());
        trace!("Manager: Adding Entity {:?}", identifier);
        Ok(Entity::new(identifier))
    }

    /// Cascading teardown: every system is notified that the entity will be
    /// deleted, then each owned component (in ascending type-registration
    /// order) is notified and detached, and only then is the entity itself
    /// detached. A system therefore never observes a component whose entity
    /// is already gone.
    pub fn delete_entity(&mut self, entity: Entity) -> Result<(), EntityError> {
        let identifier = entity.identifier();
        let Some(record) = self.entities.get(&identifier) else {
            return Err(EntityError::EntityNotFound { identifier });
        };

        let mut owned: Vec<(usize, Identifier)> = record
            .components
            .iter()
            .map(|(kind, component)| {
                let ordinal = self
                    .registry
                    .record(*kind)
                    .map(|record| record.ordinal())
                    .unwrap_or(usize::MAX);
                (ordinal, *component)
            })
            .collect();
        owned.sort_by_key(|(ordinal, _)| *ordinal);

        self.notify_systems(|system, manager| system.entity_will_be_deleted(manager, entity));

        for (_, component) in owned {
            self.detach_component(component);
        }

        self.entities.remove(&identifier);
        trace!("Manager: Deleting Entity {:?}", identifier);
        Ok(())
    }

    pub fn has_entity(&self, identifier: Identifier) -> bool {
        self.entities.contains_key(&identifier)
    }

    /// Look an entity handle back up by identifier, e.g. from an external
    /// mutation intent.
    pub fn entity(&self, identifier: Identifier) -> Option<Entity> {
        if self.entities.contains_key(&identifier) {
            Some(Entity::new(identifier))
        } else {
            None
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities
            .iter()
            .map(|(identifier, _)| Entity::new(*identifier))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Duplicate an entity: a fresh entity receives a deep copy of every
    /// component the source owns, each starting back at version 0.
    pub fn duplicate_entity(&mut self, source: Entity) -> Result<Entity, ComponentError> {
        let source_id = source.identifier();
        let Some(record) = self.entities.get(&source_id) else {
            return Err(ComponentError::InvalidComponentEntity { entity: source_id });
        };

        let mut copies: Vec<(usize, TypeKind, Box<dyn ComponentState>)> = Vec::new();
        for (kind, component) in record.components.iter() {
            let ordinal = self.registry.record(*kind)?.ordinal();
            let duplicate = self.registry.vtable(*kind)?.duplicate;
            let Some(component) = self.components.get(component) else {
                continue;
            };
            copies.push((ordinal, *kind, duplicate(component.state_dyn())));
        }
        copies.sort_by_key(|(ordinal, ..)| *ordinal);

        // Reserve every identifier up front; generator output is distinct
        // from prior output even before insertion.
        let entity_id = self.next_identifier()?;
        let mut component_ids = Vec::with_capacity(copies.len());
        for _ in 0..copies.len() {
            component_ids.push(self.next_identifier()?);
        }

        self.entities.insert(entity_id, EntityRecord::new());
        trace!("Manager: Adding Entity {:?} (duplicate of {:?})", entity_id, source_id);

        for ((_, kind, state), component_id) in copies.into_iter().zip(component_ids) {
            self.components
                .insert(component_id, Component::new(component_id, entity_id, kind, state));
            self.component_order.push(component_id);
            if let Some(record) = self.entities.get_mut(&entity_id) {
                record.components.insert(kind, component_id);
            }
            self.notify_systems(|system, manager| system.component_added(manager, component_id));
        }

        Ok(Entity::new(entity_id))
    }

    // Components

    pub fn add_component<C: ComponentState>(
        &mut self,
        entity: Entity,
        identifier: Option<Identifier>,
    ) -> Result<Identifier, ComponentError> {
        self.add_component_of_kind(entity, TypeKind::of::<C>(), identifier)
    }

    pub fn add_component_of_kind(
        &mut self,
        entity: Entity,
        kind: TypeKind,
        identifier: Option<Identifier>,
    ) -> Result<Identifier, ComponentError> {
        let entity_id = entity.identifier();
        let create = self.registry.vtable(kind)?.create;

        if !self.entities.contains_key(&entity_id) {
            return Err(ComponentError::InvalidComponentEntity { entity: entity_id });
        }
        if let Some(existing) = self.find_component_in_class(entity_id, kind) {
            return Err(ComponentError::DuplicatedComponent {
                identifier: existing,
                context: "entity already owns a component of an aliased type",
            });
        }
        let identifier = match identifier {
            Some(identifier) => {
                if self.contains_identifier(identifier) {
                    return Err(ComponentError::DuplicatedComponent {
                        identifier,
                        context: "identifier already registered in this Manager",
                    });
                }
                identifier
            }
            None => self.next_identifier()?,
        };

        let state = create();
        self.components
            .insert(identifier, Component::new(identifier, entity_id, kind, state));
        self.component_order.push(identifier);
        if let Some(record) = self.entities.get_mut(&entity_id) {
            record.components.insert(kind, identifier);
        }
        trace!("Manager: Adding Component {:?} to Entity {:?}", identifier, entity_id);

        self.notify_systems(|system, manager| system.component_added(manager, identifier));
        Ok(identifier)
    }

    pub fn delete_component(&mut self, identifier: Identifier) -> Result<(), ComponentError> {
        if !self.components.contains_key(&identifier) {
            return Err(ComponentError::ComponentNotFound { identifier });
        }
        self.detach_component(identifier);
        Ok(())
    }

    pub fn component(&self, identifier: Identifier) -> Option<&Component> {
        self.components.get(&identifier)
    }

    pub fn has_component<C: ComponentState>(&self, entity: Entity) -> bool {
        self.get_component::<C>(entity).is_some()
    }

    pub fn has_component_of_kind(&self, entity: Entity, kind: TypeKind) -> bool {
        self.get_component_of_kind(entity, kind).is_some()
    }

    /// At most one component per type equivalence class per entity, by
    /// construction.
    pub fn get_component<C: ComponentState>(&self, entity: Entity) -> Option<&Component> {
        self.get_component_of_kind(entity, TypeKind::of::<C>())
    }

    pub fn get_component_of_kind(&self, entity: Entity, kind: TypeKind) -> Option<&Component> {
        let record = self.entities.get(&entity.identifier())?;
        for (owned_kind, identifier) in record.components.iter() {
            if self
                .registry
                .is_same_class(*owned_kind, kind)
                .unwrap_or(false)
            {
                return self.components.get(identifier);
            }
        }
        None
    }

    /// Typed read access to an entity's state payload of type `C`.
    pub fn state<C: ComponentState>(&self, entity: Entity) -> Option<&C> {
        self.get_component::<C>(entity)?.state::<C>()
    }

    /// All live components in insertion order. Resolution is by identifier,
    /// so an entry deleted since the order list was built is skipped and no
    /// component is ever yielded twice.
    pub fn components(&self) -> impl Iterator<Item = &Component> + '_ {
        self.component_order
            .iter()
            .filter_map(move |identifier| self.components.get(identifier))
    }

    /// Live components whose kind is in `kind`'s equivalence class, in
    /// insertion order.
    pub fn components_of_kind(&self, kind: TypeKind) -> impl Iterator<Item = &Component> + '_ {
        self.components().filter(move |component| {
            self.registry
                .is_same_class(component.kind(), kind)
                .unwrap_or(false)
        })
    }

    pub fn components_of<C: ComponentState>(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components_of_kind(TypeKind::of::<C>())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // Mutation

    /// Apply an update to a component's state. The version counter is
    /// incremented exactly once per call, regardless of how many fields
    /// changed and without any content-based short-circuit, and systems are
    /// notified afterwards. Returns the new version.
    pub fn update_component(
        &mut self,
        identifier: Identifier,
        update: ComponentUpdate,
    ) -> Result<u64, ComponentError> {
        let version = match update {
            ComponentUpdate::Merge(patch) => {
                let Value::Object(fields) = patch else {
                    return Err(ComponentError::InvalidPatch {
                        reason: "merge patch must be a JSON object",
                    });
                };
                let Some(component) = self.components.get_mut(&identifier) else {
                    return Err(ComponentError::ComponentNotFound { identifier });
                };
                let merge = self.registry.vtable(component.kind())?.merge;
                merge(component.state_dyn_mut(), &fields)?;
                component.bump_version();
                component.version()
            }
            ComponentUpdate::Mutate(mutator) => {
                if !self.components.contains_key(&identifier) {
                    return Err(ComponentError::ComponentNotFound { identifier });
                }
                // Lend the component out of the index so the mutator can
                // read the rest of the Manager while editing it.
                let mut component = self.components.remove(&identifier);
                mutator(&*self, &mut component);
                component.bump_version();
                let version = component.version();
                self.components.insert(identifier, component);
                version
            }
        };

        self.notify_systems(|system, manager| system.component_updated(manager, identifier));
        Ok(version)
    }

    /// Reset a component's state to its freshly-initialized defaults. Counts
    /// as an update: the version is bumped and systems are notified. Returns
    /// the new version.
    pub fn clear_component(&mut self, identifier: Identifier) -> Result<u64, ComponentError> {
        let Some(component) = self.components.get_mut(&identifier) else {
            return Err(ComponentError::ComponentNotFound { identifier });
        };
        let clear = self.registry.vtable(component.kind())?.clear;
        clear(component.state_dyn_mut());
        component.bump_version();
        let version = component.version();

        self.notify_systems(|system, manager| system.component_updated(manager, identifier));
        Ok(version)
    }

    /// Typed sugar over [`update_component`](Manager::update_component) with
    /// a mutator.
    pub fn update_state<C: ComponentState>(
        &mut self,
        identifier: Identifier,
        mutator: impl FnOnce(&mut C) + 'static,
    ) -> Result<u64, ComponentError> {
        let Some(component) = self.components.get(&identifier) else {
            return Err(ComponentError::ComponentNotFound { identifier });
        };
        if component.state::<C>().is_none() {
            return Err(ComponentError::StateTypeMismatch {
                expected: C::type_name(),
            });
        }
        self.update_component(
            identifier,
            ComponentUpdate::Mutate(Box::new(move |_, component| {
                if let Some(concrete) = component.state_mut::<C>() {
                    mutator(concrete);
                }
            })),
        )
    }

    /// Write a relation field on `owner`'s state of type `C`.
    ///
    /// For typed slots the target's resolved type must be in the declared
    /// target type's equivalence class. Only the identifier is stored; the
    /// owner's version is bumped and systems are notified, exactly as for
    /// any other update. Nothing is mutated when validation fails.
    pub fn link<C: ComponentState, S: RelationSlot>(
        &mut self,
        owner: Identifier,
        accessor: impl FnOnce(&mut C) -> &mut S,
        target: Option<Identifier>,
    ) -> Result<u64, ComponentError> {
        if let Some(target_id) = target {
            let Some(target_component) = self.components.get(&target_id) else {
                return Err(ComponentError::ComponentNotFound {
                    identifier: target_id,
                });
            };
            if let Some(required) = S::target_kind() {
                if !self
                    .registry
                    .is_same_class(target_component.kind(), required)?
                {
                    return Err(ComponentError::IncompatibleComponentType {
                        expected: self.registry.name_of(required)?,
                        found: self.registry.name_of(target_component.kind())?,
                    });
                }
            }
        }

        let Some(component) = self.components.get_mut(&owner) else {
            return Err(ComponentError::ComponentNotFound { identifier: owner });
        };
        let Some(state) = component.state_dyn_mut().as_any_mut().downcast_mut::<C>() else {
            return Err(ComponentError::StateTypeMismatch {
                expected: C::type_name(),
            });
        };
        accessor(state).store(target);
        component.bump_version();
        let version = component.version();

        self.notify_systems(|system, manager| system.component_updated(manager, owner));
        Ok(version)
    }

    /// Value snapshot of a component:
    /// `{identifier, entity, type_name, version, state}` with `state`
    /// structurally deep-copied.
    pub fn snapshot_component(
        &self,
        identifier: Identifier,
    ) -> Result<ComponentSnapshot, ComponentError> {
        let Some(component) = self.components.get(&identifier) else {
            return Err(ComponentError::ComponentNotFound { identifier });
        };
        let to_value = self.registry.vtable(component.kind())?.to_value;
        Ok(ComponentSnapshot {
            identifier: component.identifier(),
            entity: component.entity(),
            type_name: self.registry.name_of(component.kind())?.to_string(),
            version: component.version(),
            state: to_value(component.state_dyn())?,
        })
    }

    // Systems

    /// Attach a system; its `initialize` hook runs once, immediately.
    pub fn attach_system(&mut self, system: Box<dyn System>) -> SystemId {
        let id = SystemId(self.next_system_id);
        self.next_system_id += 1;

        let mut slot = SystemSlot {
            id,
            state: SystemState::Detached,
            system,
        };
        slot.system.initialize(self);
        slot.state = SystemState::Initialized;
        self.systems.push(slot);

        info!("Manager: Attached System {:?}", id);
        id
    }

    /// Detach a system; its `destroy` hook runs once and the system is
    /// consumed, so it can never transition back to initialized. Returns
    /// whether a system with that id was attached.
    pub fn detach_system(&mut self, id: SystemId) -> bool {
        let Some(position) = self.systems.iter().position(|slot| slot.id == id) else {
            return false;
        };
        let mut slot = self.systems.remove(position);
        slot.system.destroy(self);

        info!("Manager: Detached System {:?}", id);
        true
    }

    /// Attached systems, in attachment order.
    pub fn systems(&self) -> impl Iterator<Item = &dyn System> + '_ {
        self.systems.iter().map(|slot| slot.system.as_ref())
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Look up the service instance of type `S` exposed by an attached
    /// system.
    pub fn service<S: Any>(&self) -> Result<&S, ServiceError> {
        for slot in &self.systems {
            if slot.state != SystemState::Initialized {
                continue;
            }
            if let Some(service) = slot.system.service() {
                if let Some(typed) = service.downcast_ref::<S>() {
                    return Ok(typed);
                }
            }
        }
        Err(ServiceError::UnknownService {
            service: std::any::type_name::<S>(),
        })
    }

    /// Drive every attached system's `update` hook, in attachment order.
    /// Systems attached from inside a hook start receiving hooks on the next
    /// drive.
    pub fn update(&mut self, delta_seconds: f64) {
        for id in self.driven_ids() {
            let Some(mut system) = self.lend_system(id) else {
                continue;
            };
            system.update(self, delta_seconds);
            self.restore_system(id, system);
        }
    }

    /// Drive every attached system's `render` hook, in attachment order.
    pub fn render(&mut self) {
        for id in self.driven_ids() {
            let Some(mut system) = self.lend_system(id) else {
                continue;
            };
            system.render(self);
            self.restore_system(id, system);
        }
    }

    // Internal

    fn next_identifier(&mut self) -> Result<Identifier, IdentifierError> {
        self.generator.next(&SpaceView {
            entities: &self.entities,
            components: &self.components,
        })
    }

    fn find_component_in_class(&self, entity: Identifier, kind: TypeKind) -> Option<Identifier> {
        let record = self.entities.get(&entity)?;
        for (owned_kind, identifier) in record.components.iter() {
            if self
                .registry
                .is_same_class(*owned_kind, kind)
                .unwrap_or(false)
            {
                return Some(*identifier);
            }
        }
        None
    }

    // Notifies systems about the component, then detaches it from the type
    // index and the entity index. Callers have already validated existence.
    fn detach_component(&mut self, identifier: Identifier) {
        self.notify_systems(|system, manager| {
            system.component_will_be_deleted(manager, identifier)
        });

        let component = self.components.remove(&identifier);
        self.component_order.retain(|entry| *entry != identifier);
        if let Some(record) = self.entities.get_mut(&component.entity()) {
            record.components.remove(&component.kind());
        }
        trace!("Manager: Deleting Component {:?}", identifier);
    }

    // Runs a notification hook over every initialized system, in attachment
    // order. Only the system being driven is swapped out of its slot, so the
    // rest stay discoverable through `systems()` and `service()` while the
    // hook runs. Notification hooks receive the Manager read-only, so the
    // slot list cannot change under the loop.
    fn notify_systems(&mut self, mut notify: impl FnMut(&mut dyn System, &Manager)) {
        for index in 0..self.systems.len() {
            if self.systems[index].state != SystemState::Initialized {
                continue;
            }
            let mut system =
                std::mem::replace(&mut self.systems[index].system, Box::new(NullSystem));
            notify(&mut *system, self);
            self.systems[index].system = system;
        }
    }

    // Attachment-order snapshot of the ids to drive this pass.
    fn driven_ids(&self) -> Vec<SystemId> {
        self.systems
            .iter()
            .filter(|slot| slot.state == SystemState::Initialized)
            .map(|slot| slot.id)
            .collect()
    }

    // Borrows a system out of its slot, leaving a stand-in behind so every
    // other system stays visible while the hook runs. `None` when the system
    // was detached by an earlier hook in the same pass.
    fn lend_system(&mut self, id: SystemId) -> Option<Box<dyn System>> {
        let slot = self.systems.iter_mut().find(|slot| slot.id == id)?;
        Some(std::mem::replace(&mut slot.system, Box::new(NullSystem)))
    }

    // Puts a lent-out system back. When the hook detached its own slot, the
    // stand-in already received `destroy`; finish the teardown on the real
    // system here.
    fn restore_system(&mut self, id: SystemId, mut system: Box<dyn System>) {
        match self.systems.iter_mut().find(|slot| slot.id == id) {
            Some(slot) => slot.system = system,
            None => system.destroy(self),
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierSpace for Manager {
    fn contains_identifier(&self, identifier: Identifier) -> bool {
        self.entities.contains_key(&identifier) || self.components.contains_key(&identifier)
    }
}
