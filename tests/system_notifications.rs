use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use cradle_ecs::{
    ComponentState, ComponentUpdate, Entity, Identifier, Manager, ServiceError, System,
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
}

impl ComponentState for Health {}

type EventLog = Rc<RefCell<Vec<String>>>;

struct Recorder {
    log: EventLog,
}

impl System for Recorder {
    fn initialize(&mut self, _manager: &mut Manager) {
        self.log.borrow_mut().push("initialize".to_string());
    }

    fn destroy(&mut self, _manager: &mut Manager) {
        self.log.borrow_mut().push("destroy".to_string());
    }

    fn update(&mut self, _manager: &mut Manager, delta_seconds: f64) {
        self.log.borrow_mut().push(format!("update {delta_seconds}"));
    }

    fn render(&mut self, _manager: &mut Manager) {
        self.log.borrow_mut().push("render".to_string());
    }

    fn component_added(&mut self, manager: &Manager, component: Identifier) {
        let name = component_name(manager, component);
        self.log.borrow_mut().push(format!("added {name}"));
    }

    fn component_updated(&mut self, manager: &Manager, component: Identifier) {
        let version = manager.component(component).map(|c| c.version()).unwrap_or(0);
        self.log.borrow_mut().push(format!("updated v{version}"));
    }

    fn component_will_be_deleted(&mut self, manager: &Manager, component: Identifier) {
        // The component must still be fully registered at this point.
        assert!(manager.component(component).is_some());
        let name = component_name(manager, component);
        self.log.borrow_mut().push(format!("component_will_be_deleted {name}"));
    }

    fn entity_will_be_deleted(&mut self, manager: &Manager, entity: Entity) {
        // All owned components must still be attached at this point.
        assert!(manager.has_entity(entity.identifier()));
        self.log.borrow_mut().push("entity_will_be_deleted".to_string());
    }
}

fn component_name(manager: &Manager, component: Identifier) -> String {
    let kind = manager.component(component).map(|c| c.kind());
    kind.and_then(|kind| manager.registry().name_of(kind).ok())
        .unwrap_or("?")
        .to_string()
}

#[test]
fn systems_initialize_once_at_attachment() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut manager = Manager::new();

    manager.attach_system(Box::new(Recorder { log: log.clone() }));

    assert_eq!(*log.borrow(), vec!["initialize"]);
    assert_eq!(manager.system_count(), 1);
}

#[test]
fn detaching_destroys_exactly_once_and_stops_delivery() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut manager = Manager::new();
    manager.register_type::<Position>().unwrap();

    let id = manager.attach_system(Box::new(Recorder { log: log.clone() }));
    assert!(manager.detach_system(id));
    assert!(!manager.detach_system(id));

    // No further notifications after detachment.
    let entity = manager.add_entity(None).unwrap();
    manager.add_component::<Position>(entity, None).unwrap();
    manager.update(0.016);

    assert_eq!(*log.borrow(), vec!["initialize", "destroy"]);
    assert_eq!(manager.system_count(), 0);
}

#[test]
fn update_and_render_drive_systems_in_attachment_order() {
    let first: EventLog = Rc::new(RefCell::new(Vec::new()));
    let second: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut manager = Manager::new();

    manager.attach_system(Box::new(Recorder { log: first.clone() }));
    manager.attach_system(Box::new(Recorder { log: second.clone() }));

    manager.update(0.5);
    manager.render();

    assert_eq!(*first.borrow(), vec!["initialize", "update 0.5", "render"]);
    assert_eq!(*second.borrow(), vec!["initialize", "update 0.5", "render"]);
}

#[test]
fn structural_changes_are_announced() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut manager = Manager::new();
    manager.register_type::<Position>().unwrap();
    manager.attach_system(Box::new(Recorder { log: log.clone() }));

    let entity = manager.add_entity(None).unwrap();
    let position = manager.add_component::<Position>(entity, None).unwrap();
    manager
        .update_component(
            position,
            ComponentUpdate::Merge(serde_json::json!({ "x": 1.0 })),
        )
        .unwrap();
    manager.delete_component(position).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "initialize",
            "added Position",
            "updated v1",
            "component_will_be_deleted Position",
        ]
    );
}

#[test]
fn entity_teardown_notifies_in_registration_order() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut manager = Manager::new();
    // Registration order decides teardown order, not attachment order.
    manager.register_type::<Position>().unwrap();
    manager.register_type::<Health>().unwrap();
    manager.attach_system(Box::new(Recorder { log: log.clone() }));

    let entity = manager.add_entity(None).unwrap();
    manager.add_component::<Health>(entity, None).unwrap();
    manager.add_component::<Position>(entity, None).unwrap();

    manager.delete_entity(entity).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "initialize",
            "added Health",
            "added Position",
            "entity_will_be_deleted",
            "component_will_be_deleted Position",
            "component_will_be_deleted Health",
        ]
    );
}

struct Cache {
    capacity: u32,
}

struct CacheSystem {
    cache: Cache,
}

impl System for CacheSystem {
    fn service(&self) -> Option<&dyn Any> {
        Some(&self.cache)
    }
}

struct CacheReader {
    log: EventLog,
}

impl System for CacheReader {
    fn render(&mut self, manager: &mut Manager) {
        let capacity = manager.service::<Cache>().map(|cache| cache.capacity);
        self.log.borrow_mut().push(format!("render cache {capacity:?}"));
    }

    fn component_added(&mut self, manager: &Manager, _component: Identifier) {
        let capacity = manager.service::<Cache>().map(|cache| cache.capacity);
        self.log.borrow_mut().push(format!("added cache {capacity:?}"));
    }
}

#[test]
fn services_stay_discoverable_from_inside_hooks() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut manager = Manager::new();
    manager.register_type::<Position>().unwrap();
    manager.attach_system(Box::new(CacheSystem {
        cache: Cache { capacity: 64 },
    }));
    manager.attach_system(Box::new(CacheReader { log: log.clone() }));

    let entity = manager.add_entity(None).unwrap();
    manager.add_component::<Position>(entity, None).unwrap();
    manager.render();

    assert_eq!(
        *log.borrow(),
        vec!["added cache Ok(64)", "render cache Ok(64)"]
    );
}

#[derive(Debug)]
struct Scoreboard {
    best: u32,
}

struct ScoreSystem {
    scoreboard: Scoreboard,
}

impl System for ScoreSystem {
    fn service(&self) -> Option<&dyn Any> {
        Some(&self.scoreboard)
    }
}

#[test]
fn services_are_discoverable_while_attached() {
    let mut manager = Manager::new();
    let id = manager.attach_system(Box::new(ScoreSystem {
        scoreboard: Scoreboard { best: 42 },
    }));

    let scoreboard = manager.service::<Scoreboard>().unwrap();
    assert_eq!(scoreboard.best, 42);

    manager.detach_system(id);
    assert_eq!(
        manager.service::<Scoreboard>().unwrap_err(),
        ServiceError::UnknownService {
            service: std::any::type_name::<Scoreboard>()
        }
    );
}

#[test]
fn unprovided_services_report_an_error() {
    let manager = Manager::new();

    let result = manager.service::<Scoreboard>();

    assert!(matches!(result, Err(ServiceError::UnknownService { .. })));
}
