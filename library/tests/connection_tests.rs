use std::rc::Rc;
use std::sync::Arc;

use fieldflow::model::{FloatValue, Int32Value, MultiStringValue, StringValue, Vec3fValue};
use fieldflow::{
    Auditor, ContainerKind, ConverterRegistry, Engine, EngineContext, FieldError, FieldGraph, FieldType,
    FieldValue, Master,
};

fn graph() -> FieldGraph {
    let _ = env_logger::builder().is_test(true).try_init();
    FieldGraph::new(Arc::new(ConverterRegistry::with_builtin_converters()))
}

struct Doubler;

impl Engine for Doubler {
    fn type_name(&self) -> &str {
        "Doubler"
    }

    fn inputs(&self) -> Vec<(String, Box<dyn FieldValue>)> {
        vec![("input".to_string(), Box::new(FloatValue::from(0.0)))]
    }

    fn outputs(&self) -> Vec<(String, FieldType)> {
        vec![("output".to_string(), FieldType::FLOAT)]
    }

    fn evaluate(&self, ctx: &mut EngineContext<'_>) {
        let value = ctx.input_as::<f32>("input").unwrap_or_default();
        ctx.set_output_as("output", value * 2.0);
    }
}

#[test]
fn test_same_type_connection_is_direct() {
    let mut graph = graph();
    let node = graph.create_node("Source", None);
    let master = graph.add_field(node, "size", FloatValue::from(1.0)).unwrap();
    let slave = graph.create_field(FloatValue::default());
    let containers = graph.container_count();

    graph.connect_from(slave, master, false, false).unwrap();

    assert_eq!(graph.container_count(), containers);
    assert!(graph.converter_for(slave, Master::Field(master)).is_none());
    assert!(graph.has_extended_storage(slave));
    assert!(graph.has_extended_storage(master));
    assert_eq!(graph.auditors(master), vec![Auditor::Field(slave)]);
    assert_eq!(graph.forward_connections(master), vec![slave]);
    assert_eq!(graph.connections(slave), vec![master]);
    assert!(graph.is_connected_from_field(slave));
    assert!(!graph.is_connected_from_engine(slave));
    assert!(graph.is_dirty(slave));
    assert!(!graph.is_default(slave));
}

#[test]
fn test_slave_follows_master() {
    let mut graph = graph();
    let node = graph.create_node("Source", None);
    let y = graph.add_field(node, "y", Int32Value::from(0)).unwrap();
    let x = graph.create_field(Int32Value::from(0));
    graph.connect_from(x, y, false, false).unwrap();
    assert_eq!(graph.get::<i32>(x), Some(0));
    assert!(!graph.is_dirty(x));

    graph.set(y, 5).unwrap();
    graph.touch(y);
    assert!(graph.is_dirty(x));
    assert_eq!(graph.get::<i32>(x), Some(5));
    assert!(!graph.is_dirty(x));
}

#[test]
fn test_converter_is_spliced_for_different_types() {
    let mut graph = graph();
    let node = graph.create_node("Source", None);
    let z = graph.add_field(node, "z", FloatValue::from(0.0)).unwrap();
    let x = graph.create_field(Int32Value::from(0));
    let containers = graph.container_count();

    graph.connect_from(x, z, false, false).unwrap();

    assert_eq!(graph.container_count(), containers + 1);
    let converter = graph.converter_for(x, Master::Field(z)).unwrap();
    assert_eq!(graph.container_kind(converter), Some(ContainerKind::Converter));
    // The converter's input is not a visible slave of the master.
    assert_eq!(graph.forward_connections(z), vec![x]);
    assert_eq!(graph.connected_field(x), Some(z));

    graph.set(z, 2.7f32).unwrap();
    assert_eq!(graph.get::<i32>(x), Some(2));
}

#[test]
fn test_unsupported_conversion_leaves_no_link() {
    let mut graph = graph();
    let master = graph.create_field(StringValue::from("up".to_string()));
    let other = graph.create_field(StringValue::default());
    graph.connect_from(other, master, false, false).unwrap();
    let slave = graph.create_field(Vec3fValue::default());
    let containers = graph.container_count();

    let result = graph.connect_from(slave, master, false, false);

    assert!(matches!(result, Err(FieldError::UnsupportedConversion { .. })));
    assert!(!graph.is_connected(slave));
    assert_eq!(graph.forward_connections(master), vec![other]);
    assert_eq!(graph.container_count(), containers);
    assert!(graph.is_default(slave));
}

#[test]
fn test_failed_conversion_keeps_existing_connection() {
    let mut graph = graph();
    let first = graph.create_field(Vec3fValue::default());
    let slave = graph.create_field(Vec3fValue::default());
    graph.connect_from(slave, first, false, false).unwrap();

    let text = graph.create_field(StringValue::default());
    assert!(graph.connect_from(slave, text, false, false).is_err());
    assert_eq!(graph.connections(slave), vec![first]);
}

#[test]
fn test_append_keeps_insertion_order_and_last_wins() {
    let mut graph = graph();
    let node = graph.create_node("Sources", None);
    let m1 = graph.add_field(node, "m1", FloatValue::from(1.0)).unwrap();
    let m2 = graph.add_field(node, "m2", FloatValue::from(2.0)).unwrap();
    let x = graph.create_field(FloatValue::default());

    graph.append_connection(x, m1, false).unwrap();
    graph.append_connection(x, m2, false).unwrap();

    assert_eq!(graph.connections(x), vec![m1, m2]);
    assert_eq!(graph.num_connections(x), 2);
    assert_eq!(graph.connected_field(x), Some(m2));
    assert_eq!(graph.get::<f32>(x), Some(2.0));

    graph.set(m1, 10.0f32).unwrap();
    assert!(graph.is_dirty(x));
    assert_eq!(graph.get::<f32>(x), Some(2.0));
}

#[test]
fn test_connect_replaces_by_default() {
    let mut graph = graph();
    let m1 = graph.create_field(FloatValue::from(1.0));
    let m2 = graph.create_field(FloatValue::from(2.0));
    let x = graph.create_field(FloatValue::default());

    graph.connect_from(x, m1, false, false).unwrap();
    graph.connect_from(x, m2, false, false).unwrap();

    assert_eq!(graph.connections(x), vec![m2]);
    assert!(graph.forward_connections(m1).is_empty());
    assert!(graph.auditors(m1).is_empty());
}

#[test]
fn test_suppressed_notify_leaves_slave_clean() {
    let mut graph = graph();
    let master = graph.create_field(FloatValue::from(4.0));
    let slave = graph.create_field(FloatValue::default());
    graph.connect_from(slave, master, true, false).unwrap();
    assert!(!graph.is_dirty(slave));
    assert!(graph.is_default(slave));
    assert_eq!(graph.get::<f32>(slave), Some(0.0));
}

#[test]
fn test_disconnect_pulls_last_value_first() {
    let mut graph = graph();
    let node = graph.create_node("Source", None);
    let y = graph.add_field(node, "y", FloatValue::from(0.0)).unwrap();
    let x = graph.create_field(FloatValue::default());
    graph.connect_from(x, y, false, false).unwrap();

    graph.set(y, 7.0f32).unwrap();
    assert!(graph.is_dirty(x));
    graph.disconnect(x, y);

    assert!(!graph.is_connected(x));
    assert!(!graph.is_dirty(x));
    assert!(graph.forward_connections(y).is_empty());
    assert!(graph.auditors(y).is_empty());
    assert_eq!(graph.get::<f32>(x), Some(7.0));
}

#[test]
fn test_disconnect_releases_converter() {
    let mut graph = graph();
    let z = graph.create_field(FloatValue::from(1.5));
    let x = graph.create_field(Int32Value::default());
    let containers = graph.container_count();
    graph.connect_from(x, z, false, false).unwrap();
    let converter = graph.converter_for(x, Master::Field(z)).unwrap();

    graph.disconnect(x, z);

    assert!(!graph.has_container(converter));
    assert_eq!(graph.container_count(), containers);
    assert!(graph.auditors(z).is_empty());
    assert!(graph.auditors(x).is_empty());
    assert_eq!(graph.get::<i32>(x), Some(1));
}

#[test]
fn test_engine_output_connection() {
    let mut graph = graph();
    let engine = graph.create_engine(Rc::new(Doubler), None);
    let input = graph.field_by_name(engine, "input").unwrap();
    let output = graph.output_by_name(engine, "output").unwrap();
    let slave = graph.create_field(FloatValue::default());

    graph.connect_from_output(slave, output, false, false).unwrap();
    assert_eq!(graph.ref_count(engine), 1);
    assert!(graph.is_connected_from_engine(slave));
    assert_eq!(graph.connected_engine(slave), Some(output));
    assert_eq!(graph.output_connections(output), vec![slave]);
    assert_eq!(graph.auditors(slave), vec![Auditor::EngineOutput(output)]);

    graph.set(input, 3.0f32).unwrap();
    assert!(graph.is_dirty(slave));
    assert_eq!(graph.get::<f32>(slave), Some(6.0));

    graph.disconnect_output(slave, output);
    assert!(!graph.is_connected(slave));
    assert!(!graph.has_container(engine), "engine dies with its last connection");
    assert_eq!(graph.get::<f32>(slave), Some(6.0));
}

#[test]
fn test_engine_output_through_converter() {
    let mut graph = graph();
    let engine = graph.create_engine(Rc::new(Doubler), Some("doubler"));
    graph.ref_container(engine);
    let input = graph.field_by_name(engine, "input").unwrap();
    let output = graph.output_by_name(engine, "output").unwrap();
    let slave = graph.create_field(Int32Value::default());

    graph.connect_from_output(slave, output, false, false).unwrap();
    let converter = graph.converter_for(slave, Master::Output(output)).unwrap();
    assert_eq!(graph.ref_count(engine), 2);

    graph.set(input, 1.3f32).unwrap();
    assert_eq!(graph.get::<i32>(slave), Some(2));

    graph.disconnect_output(slave, output);
    assert!(!graph.has_container(converter));
    assert_eq!(graph.ref_count(engine), 1);
    assert!(graph.output_connections(output).is_empty());
}

#[test]
fn test_failed_output_connection_keeps_fresh_engine() {
    let mut graph = graph();
    let engine = graph.create_engine(Rc::new(Doubler), None);
    let output = graph.output_by_name(engine, "output").unwrap();
    let slave = graph.create_field(MultiStringValue::default());

    let result = graph.connect_from_output(slave, output, false, false);

    assert!(matches!(result, Err(FieldError::UnsupportedConversion { .. })));
    assert!(graph.has_container(engine));
    assert_eq!(graph.ref_count(engine), 0);
    assert!(graph.output_connections(output).is_empty());
    assert!(!graph.is_connected(slave));
}

#[test]
fn test_disconnect_all_with_mixed_masters() {
    let mut graph = graph();
    let engine = graph.create_engine(Rc::new(Doubler), None);
    let output = graph.output_by_name(engine, "output").unwrap();
    let m1 = graph.create_field(FloatValue::from(1.0));
    let m2 = graph.create_field(Int32Value::from(2));
    let x = graph.create_field(FloatValue::default());

    graph.append_connection(x, m1, false).unwrap();
    graph.append_connection(x, m2, false).unwrap();
    graph.append_output_connection(x, output, false).unwrap();
    assert_eq!(graph.num_connections(x), 2);
    assert!(graph.is_connected_from_engine(x));

    graph.disconnect_all(x);

    assert!(!graph.is_connected(x));
    assert!(graph.auditors(x).is_empty());
    assert!(graph.forward_connections(m1).is_empty());
    assert!(graph.forward_connections(m2).is_empty());
    assert!(!graph.has_container(engine));
}

#[test]
fn test_same_master_appended_twice_across_converter() {
    let mut graph = graph();
    let node = graph.create_node("Source", None);
    let master = graph.add_field(node, "m", FloatValue::from(1.0)).unwrap();
    let x = graph.create_field(Int32Value::default());
    let containers = graph.container_count();

    graph.append_connection(x, master, false).unwrap();
    graph.append_connection(x, master, false).unwrap();
    assert_eq!(graph.connections(x), vec![master, master]);
    assert_eq!(graph.container_count(), containers + 2);
    assert_eq!(graph.forward_connections(master), vec![x, x]);

    graph.set(master, 4.5f32).unwrap();
    assert_eq!(graph.get::<i32>(x), Some(4));

    graph.disconnect(x, master);
    assert_eq!(graph.container_count(), containers + 1);
    assert_eq!(graph.connections(x), vec![master]);
    assert!(graph.converter_for(x, Master::Field(master)).is_some());
    graph.set(master, 7.0f32).unwrap();
    assert_eq!(graph.get::<i32>(x), Some(7));

    graph.disconnect_all(x);
    assert!(!graph.is_connected(x));
    assert_eq!(graph.container_count(), containers);
    assert!(graph.auditors(master).is_empty());
    assert!(graph.forward_connections(master).is_empty());
}

#[test]
fn test_unknown_ids_are_rejected() {
    let mut graph = graph();
    let real = graph.create_field(FloatValue::default());
    let ghost = graph.create_field(FloatValue::default());
    graph.destroy_field(ghost);

    assert!(matches!(
        graph.connect_from(real, ghost, false, false),
        Err(FieldError::InvalidArgument(_))
    ));
    assert!(!graph.is_connected(real));
}

#[test]
#[should_panic(expected = "is not a slave of field")]
fn test_disconnecting_unconnected_pair_panics() {
    let mut graph = graph();
    let a = graph.create_field(FloatValue::default());
    let b = graph.create_field(FloatValue::default());
    let c = graph.create_field(FloatValue::default());
    graph.connect_from(a, b, false, false).unwrap();
    graph.connect_from(c, b, false, false).unwrap();
    graph.disconnect(a, c);
}
