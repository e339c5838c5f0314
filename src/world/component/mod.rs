pub mod component;
pub mod error;
pub mod relation;
pub mod state;
pub mod type_registry;
