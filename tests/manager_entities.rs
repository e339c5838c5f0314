use serde::{Deserialize, Serialize};

use cradle_ecs::{
    ComponentState, ComponentUpdate, Entity, EntityError, Identifier, Manager, RandomGenerator,
};

#[derive(Default, Clone, Serialize, Deserialize)]
struct Position {
    x: f64,
    y: f64,
}

impl ComponentState for Position {}

#[derive(Default, Clone, Serialize, Deserialize)]
struct Health {
    current: u32,
    maximum: u32,
}

impl ComponentState for Health {}

#[test]
fn entities_receive_generated_identifiers() {
    let mut manager = Manager::new();

    let first = Entity::create(&mut manager, None).unwrap();
    let second = Entity::create(&mut manager, None).unwrap();

    assert_ne!(first.identifier(), second.identifier());
    assert_eq!(manager.entity_count(), 2);
    assert!(manager.has_entity(first.identifier()));
    assert_eq!(manager.entity(first.identifier()), Some(first));
}

#[test]
fn explicit_identifiers_are_honored() {
    let mut manager = Manager::new();
    let identifier = Identifier::from_u64(40);

    let entity = manager.add_entity(Some(identifier)).unwrap();
    assert_eq!(entity.identifier(), identifier);

    // Generated identifiers must skip over the explicit one.
    let other = manager.add_entity(None).unwrap();
    assert_ne!(other.identifier(), identifier);
}

#[test]
fn duplicate_entity_identifier_is_rejected() {
    let mut manager = Manager::new();
    let identifier = Identifier::from_u64(7);

    manager.add_entity(Some(identifier)).unwrap();
    let result = manager.add_entity(Some(identifier));

    assert_eq!(result, Err(EntityError::DuplicateEntity { identifier }));
    assert_eq!(manager.entity_count(), 1);
}

#[test]
fn deleting_an_unknown_entity_fails() {
    let mut manager = Manager::new();
    let entity = manager.add_entity(None).unwrap();
    manager.delete_entity(entity).unwrap();

    let result = manager.delete_entity(entity);
    assert_eq!(
        result,
        Err(EntityError::EntityNotFound {
            identifier: entity.identifier()
        })
    );
}

#[test]
fn deleting_an_entity_deletes_its_components() {
    let mut manager = Manager::new();
    manager.register_type::<Position>().unwrap();
    manager.register_type::<Health>().unwrap();

    let entity = manager.add_entity(None).unwrap();
    let position = manager.add_component::<Position>(entity, None).unwrap();
    let health = manager.add_component::<Health>(entity, None).unwrap();

    let survivor = manager.add_entity(None).unwrap();
    let survivor_position = manager.add_component::<Position>(survivor, None).unwrap();

    manager.delete_entity(entity).unwrap();

    assert!(!manager.has_entity(entity.identifier()));
    assert!(manager.component(position).is_none());
    assert!(manager.component(health).is_none());
    assert!(manager.component(survivor_position).is_some());
    assert_eq!(manager.component_count(), 1);
}

#[test]
fn duplicating_an_entity_deep_copies_its_components() {
    let mut manager = Manager::new();
    manager.register_type::<Position>().unwrap();
    manager.register_type::<Health>().unwrap();

    let source = manager.add_entity(None).unwrap();
    let position = manager.add_component::<Position>(source, None).unwrap();
    manager.add_component::<Health>(source, None).unwrap();
    manager
        .update_component(
            position,
            ComponentUpdate::Merge(serde_json::json!({ "x": 3.0 })),
        )
        .unwrap();

    let copy = manager.duplicate_entity(source).unwrap();

    assert_ne!(copy.identifier(), source.identifier());
    assert_eq!(manager.entity_count(), 2);
    assert_eq!(manager.component_count(), 4);

    // Same payload, fresh version.
    let copied_position = manager.get_component::<Position>(copy).unwrap();
    assert_eq!(copied_position.version(), 0);
    assert_eq!(copied_position.state::<Position>().unwrap().x, 3.0);

    // Copies are independent afterwards.
    let copied_id = copied_position.identifier();
    manager
        .update_component(
            copied_id,
            ComponentUpdate::Merge(serde_json::json!({ "x": 9.0 })),
        )
        .unwrap();
    assert_eq!(manager.state::<Position>(source).unwrap().x, 3.0);
    assert_eq!(manager.state::<Position>(copy).unwrap().x, 9.0);
}

#[test]
fn random_generator_strategy_is_pluggable() {
    let mut manager = Manager::with_generator(Box::new(RandomGenerator::new()));

    let first = manager.add_entity(None).unwrap();
    let second = manager.add_entity(None).unwrap();

    assert_ne!(first.identifier(), second.identifier());
    assert_eq!(manager.entity_count(), 2);
}
