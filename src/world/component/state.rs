use std::any::Any;

/// Downcast support for trait objects. Blanket-implemented; component state
/// types get it for free through [`ComponentState`]'s supertrait bound.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The application-defined payload of a [`Component`](crate::Component).
///
/// A state type opts in by implementing this trait; registration with a
/// [`TypeRegistry`](crate::TypeRegistry) additionally requires
/// `Default + Clone + Serialize + DeserializeOwned`, from which the registry
/// derives the erased lifecycle hooks (clear, copy, snapshot, merge).
///
/// `initialize` runs exactly once at creation, after `Default`, so a fresh
/// component's payload is always in a well-defined shape.
pub trait ComponentState: AsAny + 'static {
    /// Human-readable type name used in registry records and snapshots.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Establish default state. Runs once at creation and again on `clear`.
    fn initialize(&mut self) {}
}
