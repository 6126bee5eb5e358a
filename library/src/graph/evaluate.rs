//! Pull phase: lazy evaluation of dirty fields.

use log::trace;

use crate::graph::{EngineContext, FieldGraph, Master};
use crate::model::{ContainerId, FieldId, StatusFlags};

impl FieldGraph {
    /// Brings a dirty connected field up to date with its master.
    ///
    /// No-op for fields that are clean, unconnected, being destroyed, or have
    /// their connections disabled.
    ///
    /// # Panics
    ///
    /// If the field is already being evaluated further up the stack.
    pub fn evaluate(&mut self, field: FieldId) {
        let Some(record) = self.fields.get_mut(&field) else {
            return;
        };
        let flags = record.flags;
        if flags.contains(StatusFlags::DESTRUCTING)
            || !flags.contains(StatusFlags::DIRTY)
            || !flags.contains(StatusFlags::CONNECTIONS_ENABLED)
            || !record.is_connected()
        {
            return;
        }
        assert!(
            !flags.contains(StatusFlags::EVALUATING),
            "re-entrant evaluation of field {field}"
        );

        record.flags.insert(StatusFlags::EVALUATING);
        self.evaluate_connection(field);
        if let Some(record) = self.fields.get_mut(&field) {
            record.flags.remove(StatusFlags::EVALUATING | StatusFlags::DIRTY);
        }
    }

    /// Pulls the value from the most recently connected master.
    pub(crate) fn evaluate_connection(&mut self, field: FieldId) {
        let Some(storage) = self.record(field).storage() else {
            return;
        };

        if let Some(&master) = storage.master_fields.last() {
            let converter = storage.converter(Master::Field(master));
            let master_flags = self.record(master).flags;
            // An evaluating master encloses this call and already holds its
            // final value.
            if master_flags.intersects(StatusFlags::DESTRUCTING | StatusFlags::EVALUATING) {
                return;
            }
            match converter {
                Some(converter) => self.evaluate_container(converter),
                None => {
                    self.evaluate(master);
                    let value = self.record(master).value.clone_value();
                    trace!("field {field} pulls from field {master}");
                    self.record_mut(field).value.copy_from(value.as_ref());
                }
            }
        } else if let Some(&output) = storage.master_outputs.last() {
            let source = match storage.converter(Master::Output(output)) {
                Some(converter) => Some(converter),
                None => self.outputs.get(&output).map(|port| port.container),
            };
            if let Some(container) = source {
                trace!("field {field} pulls from output {output}");
                self.evaluate_container(container);
            }
        }
    }

    /// Runs a container's engine, unless it is already running.
    pub(crate) fn evaluate_container(&mut self, id: ContainerId) {
        let Some(container) = self.containers.get_mut(&id) else {
            return;
        };
        if container.evaluating {
            return;
        }
        let Some(engine) = container.engine.clone() else {
            return;
        };
        container.evaluating = true;
        engine.evaluate(&mut EngineContext::new(self, id));
        if let Some(container) = self.containers.get_mut(&id) {
            container.evaluating = false;
        }
    }
}
