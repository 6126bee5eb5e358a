//! Containers and output ports.

use std::rc::Rc;

use log::debug;

use crate::error::FieldError;
use crate::graph::{Auditor, Engine, FieldGraph, FieldRecord};
use crate::model::{ContainerId, FieldId, FieldType, FieldValue, OutputId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Plain field holder.
    Node,
    /// Computes its outputs from its input fields.
    Engine,
    /// Engine spliced into a connection between fields of different types.
    Converter,
}

pub(crate) struct Container {
    pub(crate) name: Option<String>,
    pub(crate) type_name: String,
    pub(crate) kind: ContainerKind,
    pub(crate) fields: Vec<(String, FieldId)>,
    pub(crate) outputs: Vec<(String, OutputId)>,
    pub(crate) ref_count: u32,
    pub(crate) notifying: bool,
    pub(crate) evaluating: bool,
    pub(crate) notify_count: u64,
    pub(crate) engine: Option<Rc<dyn Engine>>,
    pub(crate) destructing: bool,
}

impl Container {
    fn new(type_name: String, name: Option<String>, kind: ContainerKind) -> Self {
        Self {
            name,
            type_name,
            kind,
            fields: Vec::new(),
            outputs: Vec::new(),
            ref_count: 0,
            notifying: false,
            evaluating: false,
            notify_count: 0,
            engine: None,
            destructing: false,
        }
    }
}

/// Typed production point of an engine.
#[derive(Debug)]
pub(crate) struct OutputPort {
    pub(crate) container: ContainerId,
    pub(crate) value_type: FieldType,
    pub(crate) enabled: bool,
    /// Fields connected from this port, in connection order.
    pub(crate) connections: Vec<FieldId>,
}

impl FieldGraph {
    /// Creates an empty node. Containers start with no references.
    pub fn create_node(&mut self, type_name: &str, name: Option<&str>) -> ContainerId {
        let id = ContainerId::new();
        self.containers.insert(
            id,
            Container::new(type_name.to_string(), name.map(str::to_string), ContainerKind::Node),
        );
        id
    }

    /// Adds a named field to `container`.
    pub fn add_field<V: FieldValue>(&mut self, container: ContainerId, name: &str, value: V) -> Result<FieldId, FieldError> {
        self.add_field_boxed(container, name, Box::new(value))
    }

    pub fn add_field_boxed(
        &mut self,
        container: ContainerId,
        name: &str,
        value: Box<dyn FieldValue>,
    ) -> Result<FieldId, FieldError> {
        let Some(entry) = self.containers.get_mut(&container) else {
            return Err(FieldError::invalid_argument(format!("unknown container {container}")));
        };
        if entry.fields.iter().any(|(existing, _)| existing == name) {
            return Err(FieldError::invalid_argument(format!(
                "container {} already has a field named \"{name}\"",
                entry.type_name
            )));
        }
        let id = FieldId::new();
        entry.fields.push((name.to_string(), id));

        let mut record = FieldRecord::new(value);
        record.set_container(Some(container));
        self.fields.insert(id, record);
        Ok(id)
    }

    /// Instantiates `engine`: one field per declared input and one port per
    /// declared output.
    pub fn create_engine(&mut self, engine: Rc<dyn Engine>, name: Option<&str>) -> ContainerId {
        self.instantiate_engine(engine, name, ContainerKind::Engine)
    }

    pub(crate) fn instantiate_engine(
        &mut self,
        engine: Rc<dyn Engine>,
        name: Option<&str>,
        kind: ContainerKind,
    ) -> ContainerId {
        let id = ContainerId::new();
        let mut container = Container::new(engine.type_name().to_string(), name.map(str::to_string), kind);

        for (input_name, value) in engine.inputs() {
            let field = FieldId::new();
            let mut record = FieldRecord::new(value);
            record.set_container(Some(id));
            self.fields.insert(field, record);
            container.fields.push((input_name, field));
        }
        for (output_name, value_type) in engine.outputs() {
            let output = OutputId::new();
            self.outputs.insert(
                output,
                OutputPort {
                    container: id,
                    value_type,
                    enabled: true,
                    connections: Vec::new(),
                },
            );
            container.outputs.push((output_name, output));
        }

        container.engine = Some(engine);
        self.containers.insert(id, container);
        id
    }

    pub fn has_container(&self, id: ContainerId) -> bool {
        self.containers.contains_key(&id)
    }

    pub fn container_kind(&self, id: ContainerId) -> Option<ContainerKind> {
        self.containers.get(&id).map(|c| c.kind)
    }

    pub fn container_name(&self, id: ContainerId) -> Option<&str> {
        self.containers.get(&id)?.name.as_deref()
    }

    pub fn set_container_name(&mut self, id: ContainerId, name: Option<&str>) {
        if let Some(container) = self.containers.get_mut(&id) {
            container.name = name.map(str::to_string);
        }
    }

    pub fn container_type_name(&self, id: ContainerId) -> Option<&str> {
        self.containers.get(&id).map(|c| c.type_name.as_str())
    }

    pub fn container_by_name(&self, name: &str) -> Option<ContainerId> {
        self.containers
            .iter()
            .find(|(_, c)| c.name.as_deref() == Some(name))
            .map(|(id, _)| *id)
    }

    pub fn container_fields(&self, id: ContainerId) -> Vec<FieldId> {
        self.containers
            .get(&id)
            .map(|c| c.fields.iter().map(|(_, f)| *f).collect())
            .unwrap_or_default()
    }

    pub fn container_outputs(&self, id: ContainerId) -> Vec<OutputId> {
        self.containers
            .get(&id)
            .map(|c| c.outputs.iter().map(|(_, o)| *o).collect())
            .unwrap_or_default()
    }

    pub fn field_by_name(&self, container: ContainerId, name: &str) -> Option<FieldId> {
        let container = self.containers.get(&container)?;
        container.fields.iter().find(|(n, _)| n == name).map(|(_, f)| *f)
    }

    pub fn output_by_name(&self, container: ContainerId, name: &str) -> Option<OutputId> {
        let container = self.containers.get(&container)?;
        container.outputs.iter().find(|(n, _)| n == name).map(|(_, o)| *o)
    }

    pub fn field_name(&self, field: FieldId) -> Option<&str> {
        let container = self.containers.get(&self.container_of(field)?)?;
        container
            .fields
            .iter()
            .find(|(_, f)| *f == field)
            .map(|(n, _)| n.as_str())
    }

    pub fn output_name(&self, output: OutputId) -> Option<&str> {
        let container = self.containers.get(&self.outputs.get(&output)?.container)?;
        container
            .outputs
            .iter()
            .find(|(_, o)| *o == output)
            .map(|(n, _)| n.as_str())
    }

    /// Number of notifications the container has received.
    pub fn notify_count(&self, id: ContainerId) -> u64 {
        self.containers.get(&id).map_or(0, |c| c.notify_count)
    }

    pub fn ref_count(&self, id: ContainerId) -> u32 {
        self.containers.get(&id).map_or(0, |c| c.ref_count)
    }

    pub fn ref_container(&mut self, id: ContainerId) {
        if let Some(container) = self.containers.get_mut(&id) {
            container.ref_count += 1;
        }
    }

    /// Drops a reference; the container is destroyed when none remain.
    pub fn unref_container(&mut self, id: ContainerId) {
        if self.unref_container_no_delete(id) == Some(0) {
            self.destroy_container(id);
        }
    }

    /// Drops a reference without destroying the container at zero.
    pub fn unref_container_no_delete(&mut self, id: ContainerId) -> Option<u32> {
        let container = self.containers.get_mut(&id)?;
        assert!(container.ref_count > 0, "unref of container {id} with no references");
        container.ref_count -= 1;
        if container.destructing {
            return None;
        }
        Some(container.ref_count)
    }

    pub fn output_type(&self, output: OutputId) -> Option<FieldType> {
        self.outputs.get(&output).map(|o| o.value_type)
    }

    pub fn output_container(&self, output: OutputId) -> Option<ContainerId> {
        self.outputs.get(&output).map(|o| o.container)
    }

    pub fn output_connections(&self, output: OutputId) -> Vec<FieldId> {
        self.outputs
            .get(&output)
            .map(|o| o.connections.clone())
            .unwrap_or_default()
    }

    pub fn is_output_enabled(&self, output: OutputId) -> bool {
        self.outputs.get(&output).is_some_and(|o| o.enabled)
    }

    /// A disabled output neither notifies nor writes its connected fields.
    pub fn enable_output(&mut self, output: OutputId, enable: bool) {
        if let Some(port) = self.outputs.get_mut(&output) {
            if port.enabled != enable {
                debug!("output {output} {}", if enable { "enabled" } else { "disabled" });
            }
            port.enabled = enable;
        }
    }

    /// Makes `container` an auditor of `field`: every notification passing
    /// through the field also reaches the container.
    pub fn audit_field(&mut self, container: ContainerId, field: FieldId) -> Result<(), FieldError> {
        self.check_field(field)?;
        if !self.has_container(container) {
            return Err(FieldError::invalid_argument(format!("unknown container {container}")));
        }
        self.add_auditor(field, Auditor::Container(container));
        Ok(())
    }

    /// # Panics
    ///
    /// If `container` does not audit `field`.
    pub fn unaudit_field(&mut self, container: ContainerId, field: FieldId) {
        self.remove_auditor(field, Auditor::Container(container));
    }

    /// Registers `field` as fed by `output`. Each connection holds a reference
    /// on the output's engine.
    pub(crate) fn add_output_connection(&mut self, output: OutputId, field: FieldId) {
        let port = self
            .outputs
            .get_mut(&output)
            .unwrap_or_else(|| panic!("output {output} is not part of this graph"));
        port.connections.push(field);
        let engine = port.container;
        self.ref_container(engine);
        self.add_auditor(field, Auditor::EngineOutput(output));
    }

    pub(crate) fn remove_output_connection(&mut self, output: OutputId, field: FieldId) {
        let port = self
            .outputs
            .get_mut(&output)
            .unwrap_or_else(|| panic!("output {output} is not part of this graph"));
        let index = port
            .connections
            .iter()
            .position(|f| *f == field)
            .unwrap_or_else(|| panic!("field {field} is not connected from output {output}"));
        port.connections.remove(index);
        let engine = port.container;
        self.remove_auditor(field, Auditor::EngineOutput(output));
        self.unref_container(engine);
    }
}
