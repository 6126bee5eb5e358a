use crate::error::FieldError;
use crate::graph::FieldGraph;
use crate::graph::storage::ConnectStorage;
use crate::model::{ContainerId, FieldId, FieldKind, FieldType, FieldValue, MultiValue, Scalar, SingleValue, StatusFlags};

/// Where a field keeps its container reference.
#[derive(Debug)]
pub(crate) enum FieldLink {
    Plain(Option<ContainerId>),
    Extended(Box<ConnectStorage>),
}

#[derive(Debug)]
pub(crate) struct FieldRecord {
    pub(crate) value: Box<dyn FieldValue>,
    pub(crate) flags: StatusFlags,
    pub(crate) link: FieldLink,
}

impl FieldRecord {
    pub(crate) fn new(value: Box<dyn FieldValue>) -> Self {
        Self {
            value,
            flags: StatusFlags::initial(),
            link: FieldLink::Plain(None),
        }
    }

    pub(crate) fn container(&self) -> Option<ContainerId> {
        match &self.link {
            FieldLink::Plain(container) => *container,
            FieldLink::Extended(storage) => storage.container,
        }
    }

    pub(crate) fn set_container(&mut self, container: Option<ContainerId>) {
        match &mut self.link {
            FieldLink::Plain(slot) => *slot = container,
            FieldLink::Extended(storage) => storage.container = container,
        }
    }

    pub(crate) fn storage(&self) -> Option<&ConnectStorage> {
        match &self.link {
            FieldLink::Plain(_) => None,
            FieldLink::Extended(storage) => Some(storage),
        }
    }

    pub(crate) fn storage_mut(&mut self) -> Option<&mut ConnectStorage> {
        match &mut self.link {
            FieldLink::Plain(_) => None,
            FieldLink::Extended(storage) => Some(storage),
        }
    }

    /// Switches to extended storage if not done yet, keeping the container.
    pub(crate) fn extend_storage(&mut self) -> &mut ConnectStorage {
        if let FieldLink::Plain(container) = self.link {
            self.link = FieldLink::Extended(Box::new(ConnectStorage::new(container)));
            self.flags.insert(StatusFlags::EXTENDED_STORAGE);
        }
        match &mut self.link {
            FieldLink::Extended(storage) => storage,
            FieldLink::Plain(_) => unreachable!("storage was just extended"),
        }
    }

    /// Storage of a field that is known to take part in a connection.
    pub(crate) fn connected_storage_mut(&mut self) -> &mut ConnectStorage {
        self.storage_mut()
            .unwrap_or_else(|| panic!("field has no connection storage"))
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.storage().is_some_and(ConnectStorage::is_connected)
    }
}

impl FieldGraph {
    fn has_flag(&self, id: FieldId, flag: StatusFlags) -> bool {
        self.fields.get(&id).is_some_and(|r| r.flags.contains(flag))
    }

    fn change_flag(&mut self, id: FieldId, flag: StatusFlags, on: bool) -> bool {
        self.fields.get_mut(&id).is_some_and(|r| r.flags.change(flag, on))
    }

    pub fn status(&self, id: FieldId) -> Option<StatusFlags> {
        self.fields.get(&id).map(|r| r.flags)
    }

    pub fn field_type(&self, id: FieldId) -> Option<FieldType> {
        self.fields.get(&id).map(|r| r.value.field_type())
    }

    /// True if the field's type is `ty` or derives from it.
    pub fn is_of_type(&self, id: FieldId, ty: FieldType) -> bool {
        self.field_type(id).is_some_and(|t| t.is_derived_from(ty))
    }

    pub fn field_kind(&self, id: FieldId) -> Option<FieldKind> {
        self.fields.get(&id).map(|r| r.flags.kind())
    }

    pub fn set_field_kind(&mut self, id: FieldId, kind: FieldKind) {
        if let Some(record) = self.fields.get_mut(&id) {
            record.flags.set_kind(kind);
        }
    }

    pub fn has_extended_storage(&self, id: FieldId) -> bool {
        self.has_flag(id, StatusFlags::EXTENDED_STORAGE)
    }

    pub fn is_ignored(&self, id: FieldId) -> bool {
        self.has_flag(id, StatusFlags::IGNORED)
    }

    /// Changing the ignored flag counts as a value change.
    pub fn set_ignored(&mut self, id: FieldId, ignored: bool) {
        if self.change_flag(id, StatusFlags::IGNORED, ignored) {
            self.value_changed(id, false);
        }
    }

    pub fn is_default(&self, id: FieldId) -> bool {
        self.has_flag(id, StatusFlags::DEFAULT)
    }

    pub fn set_default(&mut self, id: FieldId, default: bool) {
        self.change_flag(id, StatusFlags::DEFAULT, default);
    }

    pub fn is_dirty(&self, id: FieldId) -> bool {
        self.has_flag(id, StatusFlags::DIRTY)
    }

    pub fn set_dirty(&mut self, id: FieldId, dirty: bool) {
        self.change_flag(id, StatusFlags::DIRTY, dirty);
    }

    pub fn is_read_only(&self, id: FieldId) -> bool {
        self.has_flag(id, StatusFlags::READ_ONLY)
    }

    pub fn is_destructing(&self, id: FieldId) -> bool {
        self.has_flag(id, StatusFlags::DESTRUCTING)
    }

    pub fn is_connection_enabled(&self, id: FieldId) -> bool {
        self.has_flag(id, StatusFlags::CONNECTIONS_ENABLED)
    }

    /// Enables or disables pulling from the field's masters.
    ///
    /// Re-enabling marks the field dirty so the next read fetches a fresh
    /// value, and notifies downstream if the field has a container.
    pub fn enable_connection(&mut self, id: FieldId, enable: bool) {
        let was_enabled = self.is_connection_enabled(id);
        self.change_flag(id, StatusFlags::CONNECTIONS_ENABLED, enable);
        if enable && !was_enabled && self.is_connected(id) {
            self.set_dirty(id, true);
            if self.container_of(id).is_some() {
                self.start_notify(id);
            }
        }
    }

    pub fn is_notify_enabled(&self, id: FieldId) -> bool {
        self.has_flag(id, StatusFlags::NOTIFY_ENABLED)
    }

    /// Returns the previous setting.
    pub fn enable_notify(&mut self, id: FieldId, enable: bool) -> bool {
        let previous = self.is_notify_enabled(id);
        self.change_flag(id, StatusFlags::NOTIFY_ENABLED, enable);
        previous
    }

    pub fn container_of(&self, id: FieldId) -> Option<ContainerId> {
        self.fields.get(&id).and_then(FieldRecord::container)
    }

    /// Moves the field to `container`; the field becomes default again.
    pub fn set_container(&mut self, id: FieldId, container: Option<ContainerId>) {
        if let Some(record) = self.fields.get_mut(&id) {
            record.set_container(container);
            record.flags.insert(StatusFlags::DEFAULT);
        }
    }

    /// True if writing the field would carry information.
    pub fn should_write(&self, id: FieldId) -> bool {
        !self.is_default(id) || self.is_ignored(id) || self.is_connected(id)
    }

    /// Current value, pulled from the field's master first if it is dirty.
    pub fn value(&mut self, id: FieldId) -> Option<&dyn FieldValue> {
        self.evaluate(id);
        self.fields.get(&id).map(|r| r.value.as_ref())
    }

    /// Like [`value`](Self::value) for a single-value field of type `T`.
    pub fn get<T: Scalar>(&mut self, id: FieldId) -> Option<T> {
        self.value(id)?.downcast_ref::<SingleValue<T>>().map(|v| v.0.clone())
    }

    pub fn get_multi<T: Scalar>(&mut self, id: FieldId) -> Option<Vec<T>> {
        self.value(id)?.downcast_ref::<MultiValue<T>>().map(|v| v.0.clone())
    }

    /// Stores `value` and runs a value-changed pass.
    pub fn set_value(&mut self, id: FieldId, value: &dyn FieldValue) -> Result<(), FieldError> {
        self.check_field(id)?;
        let record = self.record_mut(id);
        if !record.value.copy_from(value) {
            return Err(FieldError::invalid_argument(format!(
                "cannot store a {} value in a {} field",
                value.field_type(),
                record.value.field_type()
            )));
        }
        self.value_changed(id, true);
        Ok(())
    }

    pub fn set<T: Scalar>(&mut self, id: FieldId, value: T) -> Result<(), FieldError> {
        self.set_value(id, &SingleValue(value))
    }

    pub fn set_multi<T: Scalar>(&mut self, id: FieldId, values: Vec<T>) -> Result<(), FieldError> {
        self.set_value(id, &MultiValue(values))
    }

    /// Marks the field as changed and notifies downstream.
    ///
    /// The read-only flag is held for the duration of the pass; a nested call
    /// on the same field is ignored.
    pub fn value_changed(&mut self, id: FieldId, reset_default: bool) {
        let Some(record) = self.fields.get_mut(&id) else {
            return;
        };
        if !record.flags.change(StatusFlags::READ_ONLY, true) {
            return;
        }
        record.flags.remove(StatusFlags::DIRTY);
        if reset_default {
            record.flags.remove(StatusFlags::DEFAULT);
        }
        if record.container().is_some() {
            self.start_notify(id);
        }
        self.change_flag(id, StatusFlags::READ_ONLY, false);
    }

    /// Notifies downstream without changing the value. Inert for fields
    /// without a container.
    pub fn touch(&mut self, id: FieldId) {
        if self.container_of(id).is_some() {
            self.start_notify(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{FloatValue, Int32Value};
    use crate::plugin::ConverterRegistry;

    fn graph() -> FieldGraph {
        FieldGraph::new(Arc::new(ConverterRegistry::new()))
    }

    #[test]
    fn test_extend_storage_keeps_container() {
        let container = ContainerId::new();
        let mut record = FieldRecord::new(Box::new(FloatValue::default()));
        record.set_container(Some(container));
        assert!(record.storage().is_none());

        record.extend_storage().slaves.push(FieldId::new());
        assert!(record.flags.contains(StatusFlags::EXTENDED_STORAGE));
        assert_eq!(record.container(), Some(container));

        record.extend_storage();
        assert_eq!(record.storage().map(|s| s.slaves.len()), Some(1));
    }

    #[test]
    fn test_set_value_type_mismatch() {
        let mut graph = graph();
        let id = graph.create_field(FloatValue::from(1.0));
        assert!(graph.set_value(id, &Int32Value::from(3)).is_err());
        assert_eq!(graph.get::<f32>(id), Some(1.0));
        assert!(graph.is_default(id));

        graph.set(id, 2.0f32).unwrap();
        assert_eq!(graph.get::<f32>(id), Some(2.0));
        assert!(!graph.is_default(id));
        assert!(!graph.is_read_only(id));
    }

    #[test]
    fn test_enable_notify_returns_previous() {
        let mut graph = graph();
        let id = graph.create_field(FloatValue::default());
        assert!(graph.enable_notify(id, false));
        assert!(!graph.enable_notify(id, true));
        assert!(graph.is_notify_enabled(id));
    }

    #[test]
    fn test_set_container_marks_default() {
        let mut graph = graph();
        let id = graph.create_field(FloatValue::default());
        graph.set(id, 1.0f32).unwrap();
        assert!(!graph.is_default(id));
        let node = graph.create_node("Transform", None);
        graph.set_container(id, Some(node));
        assert!(graph.is_default(id));
        assert_eq!(graph.container_of(id), Some(node));
    }

    #[test]
    fn test_field_kind_and_type() {
        let mut graph = graph();
        let id = graph.create_field(FloatValue::default());
        graph.set_field_kind(id, FieldKind::EventIn);
        assert_eq!(graph.field_kind(id), Some(FieldKind::EventIn));
        assert!(graph.is_of_type(id, FieldType::SINGLE));
        assert!(!graph.is_of_type(id, FieldType::MULTI));
        assert!(graph.is_default(id));
    }

    #[test]
    fn test_should_write() {
        let mut graph = graph();
        let id = graph.create_field(FloatValue::default());
        assert!(!graph.should_write(id));
        graph.set_ignored(id, true);
        assert!(graph.should_write(id));
        graph.set_ignored(id, false);
        assert!(!graph.should_write(id));
        graph.set_default(id, false);
        assert!(graph.should_write(id));
    }

    #[test]
    fn test_unknown_ids_are_harmless_for_queries() {
        let mut graph = graph();
        let ghost = FieldId::new();
        assert!(!graph.is_dirty(ghost));
        assert!(graph.value(ghost).is_none());
        graph.touch(ghost);
        graph.value_changed(ghost, true);
        assert!(graph.field_type(ghost).is_none());
    }
}
