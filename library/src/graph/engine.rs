//! Engine behaviour.

use log::warn;

use crate::graph::FieldGraph;
use crate::model::{ContainerId, FieldType, FieldValue, Scalar, SingleValue, StatusFlags};

/// Computation unit owning input fields and output ports.
///
/// The graph instantiates one input field per entry of [`inputs`] and one
/// output port per entry of [`outputs`], then calls [`evaluate`] whenever a
/// field connected from one of the outputs needs a fresh value.
///
/// [`inputs`]: Engine::inputs
/// [`outputs`]: Engine::outputs
/// [`evaluate`]: Engine::evaluate
pub trait Engine {
    fn type_name(&self) -> &str;

    /// Input field names with their initial values.
    fn inputs(&self) -> Vec<(String, Box<dyn FieldValue>)>;

    /// Output port names with their value types.
    fn outputs(&self) -> Vec<(String, FieldType)>;

    fn evaluate(&self, ctx: &mut EngineContext<'_>);
}

/// Access to the graph for a running engine.
pub struct EngineContext<'a> {
    graph: &'a mut FieldGraph,
    engine: ContainerId,
}

impl<'a> EngineContext<'a> {
    pub(crate) fn new(graph: &'a mut FieldGraph, engine: ContainerId) -> Self {
        Self { graph, engine }
    }

    pub fn engine(&self) -> ContainerId {
        self.engine
    }

    /// Current value of an input field, evaluated first.
    pub fn input(&mut self, name: &str) -> Option<Box<dyn FieldValue>> {
        let field = self.graph.field_by_name(self.engine, name)?;
        self.graph.evaluate(field);
        self.graph.fields.get(&field).map(|r| r.value.clone_value())
    }

    pub fn input_as<T: Scalar>(&mut self, name: &str) -> Option<T> {
        let value = self.input(name)?;
        value.downcast_ref::<SingleValue<T>>().map(|v| v.0.clone())
    }

    /// Writes `value` into every field connected from the named output.
    ///
    /// Disabled outputs write nothing. Fields in the middle of their own
    /// value change are skipped.
    pub fn set_output(&mut self, name: &str, value: &dyn FieldValue) {
        let Some(output) = self.graph.output_by_name(self.engine, name) else {
            warn!("engine {} has no output \"{name}\"", self.engine);
            return;
        };
        let Some(port) = self.graph.outputs.get(&output) else {
            return;
        };
        if !port.enabled {
            return;
        }
        for field in port.connections.clone() {
            let Some(record) = self.graph.fields.get_mut(&field) else {
                continue;
            };
            if record.flags.contains(StatusFlags::READ_ONLY) {
                continue;
            }
            if record.value.copy_from(value) {
                record.flags.remove(StatusFlags::DIRTY | StatusFlags::DEFAULT);
            } else {
                warn!(
                    "output \"{name}\" produced {} but field {field} holds {}",
                    value.field_type(),
                    record.value.field_type()
                );
            }
        }
    }

    pub fn set_output_as<T: Scalar>(&mut self, name: &str, value: T) {
        self.set_output(name, &SingleValue(value));
    }
}
