use std::any::TypeId;
use std::collections::HashMap;

use log::info;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::component::Component;
use super::error::{ComponentError, TypeError};
use super::state::ComponentState;

/// Stable identity of a registered component state type.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct TypeKind(TypeId);

impl TypeKind {
    pub fn of<C: ComponentState>() -> Self {
        Self(TypeId::of::<C>())
    }
}

/// Registered identity of a component shape: kind, human-readable name, and
/// the ordinal assigned at registration (used for deterministic teardown
/// ordering).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRecord {
    kind: TypeKind,
    name: &'static str,
    ordinal: usize,
}

impl TypeRecord {
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// Erased lifecycle hooks, monomorphized once at registration.
pub(crate) struct StateVtable {
    pub create: fn() -> Box<dyn ComponentState>,
    pub clear: fn(&mut dyn ComponentState),
    pub duplicate: fn(&dyn ComponentState) -> Box<dyn ComponentState>,
    pub to_value: fn(&dyn ComponentState) -> Result<Value, ComponentError>,
    pub merge: fn(&mut dyn ComponentState, &serde_json::Map<String, Value>) -> Result<(), ComponentError>,
}

/// Maps component state types to [`TypeRecord`]s and tracks which types were
/// declared structurally interchangeable (aliasing).
///
/// Aliasing is an equivalence relation: declaring A↔B and B↔C behaves as
/// A↔C for every lookup. Each [`Manager`](crate::Manager) owns its own
/// registry; there is no process-wide type database.
pub struct TypeRegistry {
    records: HashMap<TypeKind, TypeRecord>,
    vtables: HashMap<TypeKind, StateVtable>,
    // Union-find parent links over registered kinds. Roots map to themselves.
    parents: HashMap<TypeKind, TypeKind>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            vtables: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    /// Register a state type under its own [`ComponentState::type_name`].
    pub fn register<C>(&mut self) -> Result<TypeKind, TypeError>
    where
        C: ComponentState + Default + Clone + Serialize + DeserializeOwned,
    {
        self.register_named::<C>(C::type_name())
    }

    /// Register a state type under an explicit name.
    pub fn register_named<C>(&mut self, name: &'static str) -> Result<TypeKind, TypeError>
    where
        C: ComponentState + Default + Clone + Serialize + DeserializeOwned,
    {
        let kind = TypeKind::of::<C>();
        if self.records.contains_key(&kind) {
            return Err(TypeError::DuplicateType { name });
        }

        let ordinal = self.records.len();
        self.records.insert(
            kind,
            TypeRecord {
                kind,
                name,
                ordinal,
            },
        );
        self.vtables.insert(
            kind,
            StateVtable {
                create: create_state::<C>,
                clear: clear_state::<C>,
                duplicate: duplicate_state::<C>,
                to_value: state_to_value::<C>,
                merge: merge_state::<C>,
            },
        );
        self.parents.insert(kind, kind);

        info!("TypeRegistry: Registering component type {}", name);
        Ok(kind)
    }

    /// Declare two registered types as denoting the same logical type.
    pub fn alias(&mut self, a: TypeKind, b: TypeKind) -> Result<(), TypeError> {
        if !self.records.contains_key(&a) || !self.records.contains_key(&b) {
            return Err(TypeError::UnknownType);
        }
        let root_a = self.root(a);
        let root_b = self.root(b);
        if root_a != root_b {
            self.parents.insert(root_a, root_b);
        }
        Ok(())
    }

    /// Generic sugar over [`alias`](TypeRegistry::alias).
    pub fn alias_types<A: ComponentState, B: ComponentState>(&mut self) -> Result<(), TypeError> {
        self.alias(TypeKind::of::<A>(), TypeKind::of::<B>())
    }

    pub fn contains(&self, kind: TypeKind) -> bool {
        self.records.contains_key(&kind)
    }

    /// Resolve a kind to its record.
    pub fn record(&self, kind: TypeKind) -> Result<&TypeRecord, TypeError> {
        self.records.get(&kind).ok_or(TypeError::UnknownType)
    }

    /// Resolve a state type to its record.
    pub fn resolve<C: ComponentState>(&self) -> Result<&TypeRecord, TypeError> {
        self.record(TypeKind::of::<C>())
    }

    pub fn name_of(&self, kind: TypeKind) -> Result<&'static str, TypeError> {
        Ok(self.record(kind)?.name)
    }

    /// Whether two registered kinds belong to the same equivalence class.
    pub fn is_same_class(&self, a: TypeKind, b: TypeKind) -> Result<bool, TypeError> {
        if !self.records.contains_key(&a) || !self.records.contains_key(&b) {
            return Err(TypeError::UnknownType);
        }
        Ok(self.root(a) == self.root(b))
    }

    /// Whether `component`'s resolved type is in the same equivalence class
    /// as `C`. Unregistered kinds are never considered a match.
    pub fn is_of_type<C: ComponentState>(&self, component: &Component) -> bool {
        self.is_same_class(component.kind(), TypeKind::of::<C>())
            .unwrap_or(false)
    }

    pub(crate) fn vtable(&self, kind: TypeKind) -> Result<&StateVtable, TypeError> {
        self.vtables.get(&kind).ok_or(TypeError::UnknownType)
    }

    // Walks parent links without path compression; alias chains stay short
    // and lookups must work through `&self`.
    fn root(&self, kind: TypeKind) -> TypeKind {
        let mut current = kind;
        loop {
            let parent = self.parents[&current];
            if parent == current {
                return current;
            }
            current = parent;
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Monomorphized hook implementations. A downcast failure here means a
// component record carries a kind that does not match its payload, which the
// Manager's construction paths make impossible.

fn create_state<C>() -> Box<dyn ComponentState>
where
    C: ComponentState + Default,
{
    let mut state = C::default();
    state.initialize();
    Box::new(state)
}

fn clear_state<C>(state: &mut dyn ComponentState)
where
    C: ComponentState + Default,
{
    let Some(concrete) = state.as_any_mut().downcast_mut::<C>() else {
        panic!("Component state does not match its registered kind. Cannot clear.")
    };
    let mut fresh = C::default();
    fresh.initialize();
    *concrete = fresh;
}

fn duplicate_state<C>(state: &dyn ComponentState) -> Box<dyn ComponentState>
where
    C: ComponentState + Clone,
{
    let Some(concrete) = state.as_any().downcast_ref::<C>() else {
        panic!("Component state does not match its registered kind. Cannot copy.")
    };
    Box::new(concrete.clone())
}

fn state_to_value<C>(state: &dyn ComponentState) -> Result<Value, ComponentError>
where
    C: ComponentState + Serialize,
{
    let Some(concrete) = state.as_any().downcast_ref::<C>() else {
        panic!("Component state does not match its registered kind. Cannot snapshot.")
    };
    serde_json::to_value(concrete).map_err(|err| ComponentError::StateSerialization {
        type_name: C::type_name(),
        message: err.to_string(),
    })
}

fn merge_state<C>(
    state: &mut dyn ComponentState,
    patch: &serde_json::Map<String, Value>,
) -> Result<(), ComponentError>
where
    C: ComponentState + Serialize + DeserializeOwned,
{
    let Some(concrete) = state.as_any_mut().downcast_mut::<C>() else {
        panic!("Component state does not match its registered kind. Cannot merge.")
    };
    let mut value =
        serde_json::to_value(&*concrete).map_err(|err| ComponentError::StateSerialization {
            type_name: C::type_name(),
            message: err.to_string(),
        })?;
    let Some(fields) = value.as_object_mut() else {
        return Err(ComponentError::InvalidPatch {
            reason: "component state does not serialize to an object",
        });
    };
    for (key, field) in patch {
        fields.insert(key.clone(), field.clone());
    }
    // Assign only after the merged value deserializes cleanly, so a bad patch
    // leaves the live state untouched.
    let merged =
        serde_json::from_value::<C>(value).map_err(|err| ComponentError::StateSerialization {
            type_name: C::type_name(),
            message: err.to_string(),
        })?;
    *concrete = merged;
    Ok(())
}
