//! Destruction of fields and containers.

use log::debug;

use crate::graph::field::FieldLink;
use crate::graph::{Auditor, FieldGraph, FieldRecord};
use crate::model::{ContainerId, FieldId, StatusFlags};

impl FieldGraph {
    /// Destroys a field and every connection touching it.
    ///
    /// Slaves are brought up to date first, so they keep the last value the
    /// field had. Then the field is detached from its masters, its slaves are
    /// disconnected and each remaining auditor gets its dying-reference
    /// notice.
    pub fn destroy_field(&mut self, field: FieldId) {
        if !self.fields.contains_key(&field) {
            return;
        }

        for slave in self.forward_connections(field) {
            self.evaluate(slave);
        }

        self.record_mut(field).flags.insert(StatusFlags::DESTRUCTING);
        self.disconnect_all(field);

        while let Some(slave) = self.forward_connections(field).first().copied() {
            self.disconnect(slave, field);
        }

        while let Some(auditor) = self.auditors(field).last().copied() {
            match auditor {
                Auditor::EngineOutput(output) => self.remove_output_connection(output, field),
                Auditor::Sensor(sensor) => self.sensor_dying_reference(sensor, field),
                Auditor::Field(slave) => {
                    panic!("field {slave} still audits field {field} after its connections were removed")
                }
                Auditor::Container(container) => {
                    self.remove_auditor(field, auditor);
                    debug!("container {container} lost audited field {field}");
                }
            }
        }

        if let Some(entry) = self.container_of(field).and_then(|c| self.containers.get_mut(&c)) {
            entry.fields.retain(|(_, f)| *f != field);
        }

        if let Some(FieldRecord {
            link: FieldLink::Extended(storage),
            ..
        }) = self.fields.remove(&field)
        {
            storage.release();
        }
    }

    /// Destroys a container with its fields and outputs.
    ///
    /// Fields connected from the container's outputs keep their last value.
    pub fn destroy_container(&mut self, id: ContainerId) {
        let Some(container) = self.containers.get_mut(&id) else {
            return;
        };
        if container.destructing {
            return;
        }
        container.destructing = true;
        let outputs: Vec<_> = container.outputs.iter().map(|(_, o)| *o).collect();
        let fields: Vec<_> = container.fields.iter().map(|(_, f)| *f).collect();
        debug!("destroying {} {id}", container.type_name);

        for output in &outputs {
            while let Some(slave) = self.output_connections(*output).first().copied() {
                self.disconnect_output(slave, *output);
            }
        }
        for field in fields {
            self.destroy_field(field);
        }
        for output in outputs {
            self.outputs.remove(&output);
        }
        self.containers.remove(&id);
    }
}
