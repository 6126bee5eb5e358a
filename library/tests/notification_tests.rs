use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use fieldflow::model::{FloatValue, Int32Value};
use fieldflow::{
    ConverterRegistry, FieldGraph, GraphConfig, NotificationList, SensorEvent, StatusFlags,
};

fn graph() -> FieldGraph {
    let _ = env_logger::builder().is_test(true).try_init();
    FieldGraph::new(Arc::new(ConverterRegistry::with_builtin_converters()))
}

fn recorder() -> (Rc<RefCell<Vec<SensorEvent>>>, Box<dyn FnMut(SensorEvent)>) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    (events, Box::new(move |event| sink.borrow_mut().push(event)))
}

#[test]
fn test_cycle_terminates() {
    let mut graph = graph();
    let node = graph.create_node("Loop", None);
    let a = graph.add_field(node, "a", FloatValue::from(1.0)).unwrap();
    let b = graph.add_field(node, "b", FloatValue::from(2.0)).unwrap();
    graph.connect_from(a, b, false, false).unwrap();
    graph.connect_from(b, a, false, false).unwrap();

    let _ = graph.get::<f32>(a);
    let _ = graph.get::<f32>(b);
    assert!(!graph.is_dirty(a));
    assert!(!graph.is_dirty(b));

    graph.touch(a);

    assert!(graph.is_dirty(b));
    assert!(!graph.is_dirty(a), "the origin of a pass is not marked dirty");
    for field in [a, b] {
        let flags = graph.status(field).unwrap();
        assert!(!flags.contains(StatusFlags::NOTIFIED));
        assert!(!flags.contains(StatusFlags::EVALUATING));
    }
}

#[test]
fn test_cycle_values_settle() {
    let mut graph = graph();
    let node = graph.create_node("Loop", None);
    let a = graph.add_field(node, "a", FloatValue::from(1.0)).unwrap();
    let b = graph.add_field(node, "b", FloatValue::from(2.0)).unwrap();
    graph.connect_from(a, b, false, false).unwrap();
    graph.connect_from(b, a, false, false).unwrap();

    graph.set(a, 9.0f32).unwrap();
    assert_eq!(graph.get::<f32>(b), Some(9.0));
    assert_eq!(graph.get::<f32>(a), Some(9.0));
}

#[test]
fn test_disabled_notify_stops_propagation_but_marks_dirty() {
    let mut graph = graph();
    let node = graph.create_node("Chain", None);
    let a = graph.add_field(node, "a", FloatValue::default()).unwrap();
    let b = graph.create_field(FloatValue::default());
    let c = graph.create_field(FloatValue::default());
    graph.connect_from(b, a, false, false).unwrap();
    graph.connect_from(c, b, false, false).unwrap();
    let _ = graph.get::<f32>(c);
    let _ = graph.get::<f32>(b);

    assert!(graph.enable_notify(b, false));
    graph.set(a, 1.0f32).unwrap();

    assert!(graph.is_dirty(b));
    assert!(!graph.is_dirty(c));
}

#[test]
fn test_touch_without_container_is_inert() {
    let mut graph = graph();
    let master = graph.create_field(FloatValue::default());
    let slave = graph.create_field(FloatValue::default());
    graph.connect_from(slave, master, false, false).unwrap();
    let _ = graph.get::<f32>(slave);
    let passes = graph.coordinator().completed_passes();

    graph.touch(master);

    assert!(!graph.is_dirty(slave));
    assert_eq!(graph.coordinator().completed_passes(), passes);
}

#[test]
fn test_explicit_notify_marks_downstream_dirty() {
    let mut graph = graph();
    let master = graph.create_field(FloatValue::default());
    let slave = graph.create_field(FloatValue::default());
    graph.connect_from(slave, master, false, false).unwrap();
    let _ = graph.get::<f32>(slave);

    let mut list = NotificationList::new();
    graph.notify(master, &mut list);

    assert!(graph.is_dirty(slave));
    assert!(!graph.is_dirty(master));
    assert_eq!(list.first_field(), Some(master));
}

#[test]
fn test_container_is_notified() {
    let mut graph = graph();
    let node = graph.create_node("Material", None);
    let field = graph.add_field(node, "shininess", FloatValue::default()).unwrap();
    assert_eq!(graph.notify_count(node), 0);

    graph.set(field, 0.5f32).unwrap();
    graph.touch(field);

    assert_eq!(graph.notify_count(node), 2);
}

#[test]
fn test_container_auditor() {
    let mut graph = graph();
    let source = graph.create_node("Source", None);
    let watcher = graph.create_node("Watcher", None);
    let field = graph.add_field(source, "value", Int32Value::default()).unwrap();
    graph.audit_field(watcher, field).unwrap();

    graph.set(field, 4).unwrap();
    assert_eq!(graph.notify_count(watcher), 1);

    graph.unaudit_field(watcher, field);
    graph.set(field, 5).unwrap();
    assert_eq!(graph.notify_count(watcher), 1);
}

#[test]
fn test_sensor_fires_once_per_pass_with_origin() {
    let mut graph = graph();
    let node = graph.create_node("Source", None);
    let a = graph.add_field(node, "a", FloatValue::default()).unwrap();
    let x = graph.create_field(FloatValue::default());
    graph.append_connection(x, a, true).unwrap();
    graph.append_connection(x, a, true).unwrap();
    let (events, callback) = recorder();
    let sensor = graph.attach_sensor(x, callback).unwrap();
    assert_eq!(graph.sensor_field(sensor), Some(x));

    graph.set(a, 1.0f32).unwrap();

    assert_eq!(*events.borrow(), vec![SensorEvent::Triggered { origin: Some(a) }]);

    graph.detach_sensor(sensor);
    graph.set(a, 2.0f32).unwrap();
    assert_eq!(events.borrow().len(), 1);
    assert!(graph.sensor_field(sensor).is_none());
}

#[test]
fn test_sensor_on_origin_field() {
    let mut graph = graph();
    let node = graph.create_node("Source", None);
    let a = graph.add_field(node, "a", FloatValue::default()).unwrap();
    let (events, callback) = recorder();
    graph.attach_sensor(a, callback).unwrap();

    graph.set(a, 1.0f32).unwrap();
    graph.set(a, 2.0f32).unwrap();

    assert_eq!(events.borrow().len(), 2);
    assert_eq!(graph.coordinator().depth(), 0);
}

#[test]
fn test_ignoring_a_field_notifies() {
    let mut graph = graph();
    let node = graph.create_node("Source", None);
    let a = graph.add_field(node, "a", FloatValue::default()).unwrap();
    let x = graph.create_field(FloatValue::default());
    graph.connect_from(x, a, false, false).unwrap();
    let _ = graph.get::<f32>(x);

    graph.set_ignored(a, true);
    assert!(graph.is_dirty(x));
    assert!(graph.is_default(a), "ignoring does not touch the default flag");

    let _ = graph.get::<f32>(x);
    graph.set_ignored(a, true);
    assert!(!graph.is_dirty(x), "unchanged flag does not notify");
}

#[test]
fn test_trace_notifications_config() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = GraphConfig {
        trace_notifications: true,
        ..GraphConfig::default()
    };
    let mut graph = FieldGraph::with_config(Arc::new(ConverterRegistry::new()), config);
    let node = graph.create_node("Source", None);
    let a = graph.add_field(node, "a", FloatValue::default()).unwrap();
    graph.set(a, 3.0f32).unwrap();
    assert!(graph.config().trace_notifications);
    assert_eq!(graph.coordinator().completed_passes(), 1);
}
