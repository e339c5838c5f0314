pub mod checked_map;
pub mod component;
pub mod entity;
pub mod identifier;
pub mod manager;
pub mod system;
