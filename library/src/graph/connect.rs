//! Connecting and disconnecting fields.

use std::rc::Rc;

use log::{debug, warn};

use crate::error::FieldError;
use crate::graph::{Auditor, ContainerKind, FieldGraph, Master};
use crate::model::{ContainerId, FieldId, FieldType, OutputId, StatusFlags};
use crate::plugin::FieldConverter;
use crate::plugin::adapter::{CONVERTER_INPUT, CONVERTER_OUTPUT};

impl FieldGraph {
    pub(crate) fn add_auditor(&mut self, field: FieldId, auditor: Auditor) {
        let record = self.record_mut(field);
        record.extend_storage().auditors.push(auditor);
        record.value.connection_status_changed(1);
    }

    pub(crate) fn remove_auditor(&mut self, field: FieldId, auditor: Auditor) {
        let record = self.record_mut(field);
        let auditors = &mut record.connected_storage_mut().auditors;
        let index = auditors
            .iter()
            .position(|a| *a == auditor)
            .unwrap_or_else(|| panic!("{auditor:?} is not an auditor of field {field}"));
        auditors.remove(index);
        record.value.connection_status_changed(-1);
    }

    /// Auditors of `field` in registration order.
    pub fn auditors(&self, field: FieldId) -> Vec<Auditor> {
        self.fields
            .get(&field)
            .and_then(|r| r.storage())
            .map(|s| s.auditors.clone())
            .unwrap_or_default()
    }

    fn is_converter_field(&self, field: FieldId) -> bool {
        self.container_of(field)
            .and_then(|c| self.container_kind(c))
            .is_some_and(|kind| kind == ContainerKind::Converter)
    }

    /// Connects `slave` so that it follows `master`.
    ///
    /// Fields of equal type are linked directly. Otherwise a converter for
    /// (master type, slave type) is looked up in the registry and spliced in
    /// between; if there is none the call fails and nothing is linked.
    ///
    /// Unless `append` is set, existing connections of `slave` are removed
    /// first. Unless `suppress_notify` is set, `slave` is marked dirty and a
    /// notification pass is started from it.
    pub fn connect_from(
        &mut self,
        slave: FieldId,
        master: FieldId,
        suppress_notify: bool,
        append: bool,
    ) -> Result<(), FieldError> {
        self.check_field(slave)?;
        self.check_field(master)?;
        self.record_mut(slave).extend_storage();
        self.record_mut(master).extend_storage();

        let slave_type = self.record(slave).value.field_type();
        let master_type = self.record(master).value.field_type();
        if slave_type == master_type {
            if !append {
                self.disconnect_all(slave);
            }
            self.add_auditor(master, Auditor::Field(slave));
        } else {
            let converter = self.create_converter(master_type, slave_type)?;
            if !append {
                self.disconnect_all(slave);
            }
            let input = self.converter_input(converter);
            if let Err(err) = self.connect_from(input, master, false, false) {
                self.unref_container(converter);
                return Err(err);
            }
            let output = self.converter_output(converter);
            self.add_output_connection(output, slave);
            self.record_mut(slave)
                .connected_storage_mut()
                .converters
                .push((Master::Field(master), converter));
        }

        self.record_mut(slave).connected_storage_mut().master_fields.push(master);
        if !self.is_converter_field(slave) {
            self.record_mut(master).connected_storage_mut().slaves.push(slave);
        }
        debug!("field {slave} connected from field {master}");

        self.notify_new_connection(slave, suppress_notify);
        Ok(())
    }

    /// Connects `slave` so that it is fed by an engine output.
    ///
    /// Same semantics as [`connect_from`](Self::connect_from). The engine is
    /// kept alive for the duration of the call even if replacing the old
    /// connections drops its last reference.
    pub fn connect_from_output(
        &mut self,
        slave: FieldId,
        output: OutputId,
        suppress_notify: bool,
        append: bool,
    ) -> Result<(), FieldError> {
        self.check_field(slave)?;
        let Some(engine) = self.output_container(output) else {
            return Err(FieldError::invalid_argument(format!("unknown output {output}")));
        };
        self.ref_container(engine);
        let result = self.connect_output_pinned(slave, output, suppress_notify, append);
        self.unref_container_no_delete(engine);
        result
    }

    fn connect_output_pinned(
        &mut self,
        slave: FieldId,
        output: OutputId,
        suppress_notify: bool,
        append: bool,
    ) -> Result<(), FieldError> {
        self.record_mut(slave).extend_storage();

        let slave_type = self.record(slave).value.field_type();
        let output_type = self.outputs[&output].value_type;
        if slave_type == output_type {
            if !append {
                self.disconnect_all(slave);
            }
            self.add_output_connection(output, slave);
        } else {
            let converter = self.create_converter(output_type, slave_type)?;
            if !append {
                self.disconnect_all(slave);
            }
            let input = self.converter_input(converter);
            if let Err(err) = self.connect_from_output(input, output, false, false) {
                self.unref_container(converter);
                return Err(err);
            }
            let converter_output = self.converter_output(converter);
            self.add_output_connection(converter_output, slave);
            self.record_mut(slave)
                .connected_storage_mut()
                .converters
                .push((Master::Output(output), converter));
        }

        self.record_mut(slave).connected_storage_mut().master_outputs.push(output);
        debug!("field {slave} connected from output {output}");

        self.notify_new_connection(slave, suppress_notify);
        Ok(())
    }

    /// Adds `master` as an additional source of `slave`.
    pub fn append_connection(&mut self, slave: FieldId, master: FieldId, suppress_notify: bool) -> Result<(), FieldError> {
        self.connect_from(slave, master, suppress_notify, true)
    }

    pub fn append_output_connection(
        &mut self,
        slave: FieldId,
        output: OutputId,
        suppress_notify: bool,
    ) -> Result<(), FieldError> {
        self.connect_from_output(slave, output, suppress_notify, true)
    }

    fn notify_new_connection(&mut self, slave: FieldId, suppress_notify: bool) {
        if suppress_notify || !self.is_connection_enabled(slave) {
            return;
        }
        let record = self.record_mut(slave);
        record.flags.insert(StatusFlags::DIRTY);
        record.flags.remove(StatusFlags::DEFAULT);
        self.start_notify(slave);
    }

    /// Removes the connection from `master` to `slave`, pulling the last
    /// value first.
    ///
    /// # Panics
    ///
    /// If `slave` is not connected from `master`.
    pub fn disconnect(&mut self, slave: FieldId, master: FieldId) {
        self.evaluate(slave);

        if !self.is_converter_field(slave) {
            let slaves = &mut self.record_mut(master).connected_storage_mut().slaves;
            let index = slaves
                .iter()
                .position(|s| *s == slave)
                .unwrap_or_else(|| panic!("field {slave} is not a slave of field {master}"));
            slaves.remove(index);
        }

        let storage = self.record_mut(slave).connected_storage_mut();
        let index = storage
            .master_fields
            .iter()
            .position(|m| *m == master)
            .unwrap_or_else(|| panic!("field {slave} is not connected from field {master}"));
        storage.master_fields.remove(index);
        let converter = storage.take_converter(Master::Field(master));

        match converter {
            Some(converter) => {
                let input = self.converter_input(converter);
                self.disconnect(input, master);
                let output = self.converter_output(converter);
                self.remove_output_connection(output, slave);
                self.unref_container(converter);
            }
            None => self.remove_auditor(master, Auditor::Field(slave)),
        }
        debug!("field {slave} disconnected from field {master}");
    }

    /// Removes the connection from an engine output to `slave`.
    ///
    /// # Panics
    ///
    /// If `slave` is not connected from `output`.
    pub fn disconnect_output(&mut self, slave: FieldId, output: OutputId) {
        if self.is_converter_field(slave) {
            // The converter's input: cut the field the converter feeds instead,
            // which tears the converter down with it.
            let downstream = self
                .container_of(slave)
                .and_then(|converter| self.output_by_name(converter, CONVERTER_OUTPUT))
                .and_then(|converter_output| self.outputs.get(&converter_output))
                .and_then(|port| port.connections.first().copied());
            if let Some(downstream) = downstream {
                self.disconnect_output(downstream, output);
                return;
            }
        }

        if self.is_output_enabled(output) {
            self.evaluate(slave);
        }

        let storage = self.record_mut(slave).connected_storage_mut();
        let index = storage
            .master_outputs
            .iter()
            .position(|o| *o == output)
            .unwrap_or_else(|| panic!("field {slave} is not connected from output {output}"));
        storage.master_outputs.remove(index);
        let converter = storage.take_converter(Master::Output(output));

        match converter {
            Some(converter) => {
                let input = self.converter_input(converter);
                let input_outputs = &mut self.record_mut(input).connected_storage_mut().master_outputs;
                if let Some(index) = input_outputs.iter().position(|o| *o == output) {
                    input_outputs.remove(index);
                }
                self.remove_output_connection(output, input);
                let converter_output = self.converter_output(converter);
                self.remove_output_connection(converter_output, slave);
                self.unref_container(converter);
            }
            None => self.remove_output_connection(output, slave),
        }
        debug!("field {slave} disconnected from output {output}");
    }

    /// Removes every master field and master output connection of `slave`.
    pub fn disconnect_all(&mut self, slave: FieldId) {
        while let Some(master) = self.connected_field_at(slave, 0) {
            self.disconnect(slave, master);
        }
        while let Some(output) = self.connected_output_at(slave, 0) {
            self.disconnect_output(slave, output);
        }
        assert!(!self.is_connected(slave), "field {slave} still connected after disconnect");
    }

    fn connected_field_at(&self, slave: FieldId, index: usize) -> Option<FieldId> {
        self.fields.get(&slave)?.storage()?.master_fields.get(index).copied()
    }

    fn connected_output_at(&self, slave: FieldId, index: usize) -> Option<OutputId> {
        self.fields.get(&slave)?.storage()?.master_outputs.get(index).copied()
    }

    pub fn is_connected(&self, field: FieldId) -> bool {
        self.fields.get(&field).is_some_and(|r| r.is_connected())
    }

    pub fn is_connected_from_field(&self, field: FieldId) -> bool {
        self.connected_field(field).is_some()
    }

    pub fn is_connected_from_engine(&self, field: FieldId) -> bool {
        self.connected_engine(field).is_some()
    }

    /// Most recently connected master field.
    pub fn connected_field(&self, field: FieldId) -> Option<FieldId> {
        self.fields.get(&field)?.storage()?.master_fields.last().copied()
    }

    /// Most recently connected master output.
    pub fn connected_engine(&self, field: FieldId) -> Option<OutputId> {
        self.fields.get(&field)?.storage()?.master_outputs.last().copied()
    }

    pub fn num_connections(&self, field: FieldId) -> usize {
        self.connections(field).len()
    }

    /// Master fields in connection order.
    pub fn connections(&self, field: FieldId) -> Vec<FieldId> {
        self.fields
            .get(&field)
            .and_then(|r| r.storage())
            .map(|s| s.master_fields.clone())
            .unwrap_or_default()
    }

    /// Slave fields in connection order.
    pub fn forward_connections(&self, field: FieldId) -> Vec<FieldId> {
        self.fields
            .get(&field)
            .and_then(|r| r.storage())
            .map(|s| s.slaves.clone())
            .unwrap_or_default()
    }

    /// Converter spliced into the most recent link from `master` to `slave`,
    /// if any.
    pub fn converter_for(&self, slave: FieldId, master: Master) -> Option<ContainerId> {
        self.fields.get(&slave)?.storage()?.converter(master)
    }

    fn create_converter(&mut self, from: FieldType, to: FieldType) -> Result<ContainerId, FieldError> {
        let Some(plugin) = self.registry.find(from, to) else {
            warn!("no converter from {from} to {to}");
            return Err(FieldError::UnsupportedConversion {
                from: from.to_string(),
                to: to.to_string(),
            });
        };
        let converter = self.instantiate_engine(Rc::new(FieldConverter::new(plugin)), None, ContainerKind::Converter);
        self.ref_container(converter);
        debug!("created converter {converter} from {from} to {to}");
        Ok(converter)
    }

    fn converter_input(&self, converter: ContainerId) -> FieldId {
        self.field_by_name(converter, CONVERTER_INPUT)
            .unwrap_or_else(|| panic!("converter {converter} has no input field"))
    }

    fn converter_output(&self, converter: ContainerId) -> OutputId {
        self.output_by_name(converter, CONVERTER_OUTPUT)
            .unwrap_or_else(|| panic!("converter {converter} has no output"))
    }
}
