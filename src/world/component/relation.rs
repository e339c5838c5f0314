use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::world::identifier::Identifier;
use crate::world::manager::Manager;

use super::component::Component;
use super::state::ComponentState;
use super::type_registry::TypeKind;

/// A weak, type-checked reference from one component to another.
///
/// Only the target's identifier is stored, never the instance, so deleting
/// the referenced component can never leave a dangling strong handle. Reads
/// resolve through the Manager at access time and return `None` once the
/// target is gone; every reader must tolerate an absent result.
///
/// Writes go through [`Manager::link`](crate::Manager::link), which enforces
/// that the assigned component's resolved type is in `T`'s equivalence class
/// and bumps the owning component's version.
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Relation<T: ComponentState> {
    target: Option<Identifier>,
    #[serde(skip)]
    marker: PhantomData<fn() -> T>,
}

impl<T: ComponentState> Relation<T> {
    pub fn new() -> Self {
        Self {
            target: None,
            marker: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_none()
    }

    /// The stored identifier, without resolving it.
    pub fn raw(&self) -> Option<Identifier> {
        self.target
    }

    /// Resolve through `manager`. `None` if the relation is empty or the
    /// stored identifier no longer denotes a live component.
    pub fn resolve<'m>(&self, manager: &'m Manager) -> Option<&'m Component> {
        manager.component(self.target?)
    }
}

impl<T: ComponentState> Default for Relation<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ComponentState> Clone for Relation<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ComponentState> Copy for Relation<T> {}

impl<T: ComponentState> fmt::Debug for Relation<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Relation").field(&self.target).finish()
    }
}

impl<T: ComponentState> PartialEq for Relation<T> {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl<T: ComponentState> Eq for Relation<T> {}

/// An untyped weak reference: same storage and resolution semantics as
/// [`Relation`], but writes skip the target type check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnyRelation {
    target: Option<Identifier>,
}

impl AnyRelation {
    pub fn new() -> Self {
        Self { target: None }
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_none()
    }

    pub fn raw(&self) -> Option<Identifier> {
        self.target
    }

    pub fn resolve<'m>(&self, manager: &'m Manager) -> Option<&'m Component> {
        manager.component(self.target?)
    }
}

/// Storage interface the Manager's accessor layer writes through. Declared
/// relation fields implement this; it is what makes a field eligible as a
/// [`Manager::link`](crate::Manager::link) target.
pub trait RelationSlot: 'static {
    /// Declared target type, or `None` for untyped references.
    fn target_kind() -> Option<TypeKind>;

    fn raw(&self) -> Option<Identifier>;

    fn store(&mut self, target: Option<Identifier>);
}

impl<T: ComponentState> RelationSlot for Relation<T> {
    fn target_kind() -> Option<TypeKind> {
        Some(TypeKind::of::<T>())
    }

    fn raw(&self) -> Option<Identifier> {
        self.target
    }

    fn store(&mut self, target: Option<Identifier>) {
        self.target = target;
    }
}

impl RelationSlot for AnyRelation {
    fn target_kind() -> Option<TypeKind> {
        None
    }

    fn raw(&self) -> Option<Identifier> {
        self.target
    }

    fn store(&mut self, target: Option<Identifier>) {
        self.target = target;
    }
}
