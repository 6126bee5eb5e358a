//! The field graph.
//!
//! [`FieldGraph`] is an arena owning every field, container, output port and
//! sensor, addressed by uuid ids. Connections are plain id lists inside each
//! field's extended storage, so cycles need no special ownership handling.
//!
//! Change propagation is two-phase:
//!
//! * **notify** (push): a value change walks the slaves, engine outputs and
//!   auditors of a field depth-first, marking everything downstream dirty.
//!   A per-field "notified" mark makes cyclic graphs safe.
//! * **evaluate** (pull): reading a dirty field pulls the value of its most
//!   recently connected master, through a converter engine if one was spliced
//!   in.

mod connect;
mod container;
mod engine;
mod evaluate;
mod field;
mod notify;
mod sensor;
mod storage;
mod teardown;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::GraphConfig;
use crate::error::FieldError;
use crate::model::{ContainerId, FieldId, FieldValue, OutputId, SensorId};
use crate::plugin::ConverterRegistry;

pub use container::ContainerKind;
pub use engine::{Engine, EngineContext};
pub use notify::{NotificationList, NotificationRecord};
pub use sensor::{NotifyCoordinator, SensorCallback, SensorEvent};
pub use storage::{Auditor, AuditorKind, Master};

pub(crate) use container::{Container, OutputPort};
pub(crate) use field::FieldRecord;
pub(crate) use sensor::FieldSensor;

pub struct FieldGraph {
    pub(crate) fields: HashMap<FieldId, FieldRecord>,
    pub(crate) containers: HashMap<ContainerId, Container>,
    pub(crate) outputs: HashMap<OutputId, OutputPort>,
    pub(crate) sensors: HashMap<SensorId, FieldSensor>,
    pub(crate) registry: Arc<ConverterRegistry>,
    pub(crate) coordinator: NotifyCoordinator,
    pub(crate) config: GraphConfig,
}

impl FieldGraph {
    pub fn new(registry: Arc<ConverterRegistry>) -> Self {
        Self::with_config(registry, GraphConfig::default())
    }

    pub fn with_config(registry: Arc<ConverterRegistry>, config: GraphConfig) -> Self {
        Self {
            fields: HashMap::new(),
            containers: HashMap::new(),
            outputs: HashMap::new(),
            sensors: HashMap::new(),
            registry,
            coordinator: NotifyCoordinator::default(),
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ConverterRegistry> {
        &self.registry
    }

    pub fn coordinator(&self) -> &NotifyCoordinator {
        &self.coordinator
    }

    /// Creates a free-standing field with no container.
    pub fn create_field<V: FieldValue>(&mut self, value: V) -> FieldId {
        self.create_field_boxed(Box::new(value))
    }

    pub fn create_field_boxed(&mut self, value: Box<dyn FieldValue>) -> FieldId {
        let id = FieldId::new();
        self.fields.insert(id, FieldRecord::new(value));
        id
    }

    pub fn has_field(&self, id: FieldId) -> bool {
        self.fields.contains_key(&id)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub(crate) fn record(&self, id: FieldId) -> &FieldRecord {
        self.fields
            .get(&id)
            .unwrap_or_else(|| panic!("field {id} is not part of this graph"))
    }

    pub(crate) fn record_mut(&mut self, id: FieldId) -> &mut FieldRecord {
        self.fields
            .get_mut(&id)
            .unwrap_or_else(|| panic!("field {id} is not part of this graph"))
    }

    pub(crate) fn check_field(&self, id: FieldId) -> Result<(), FieldError> {
        if self.fields.contains_key(&id) {
            Ok(())
        } else {
            Err(FieldError::invalid_argument(format!("unknown field {id}")))
        }
    }
}
