//! # Cradle ECS
//! Entity-component substrate: a [`Manager`] owns every live entity and
//! component for one scope, drives attached [`System`]s, and resolves weak,
//! type-checked [`Relation`]s between components.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod world;

pub use world::{
    checked_map::CheckedMap,
    component::{
        component::{Component, ComponentSnapshot, ComponentUpdate},
        error::{ComponentError, TypeError},
        relation::{AnyRelation, Relation, RelationSlot},
        state::{AsAny, ComponentState},
        type_registry::{TypeKind, TypeRecord, TypeRegistry},
    },
    entity::{entity::Entity, error::EntityError},
    identifier::{
        Identifier, IdentifierError, IdentifierGenerator, IdentifierSpace, RandomGenerator,
        SequentialGenerator,
    },
    manager::Manager,
    system::{
        error::ServiceError,
        system::{System, SystemId},
    },
};
