//! Push phase: change notification.

use log::{debug, trace};

use crate::graph::{Auditor, AuditorKind, ContainerKind, FieldGraph};
use crate::model::{ContainerId, FieldId, StatusFlags};

/// One visited step of a notification pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotificationRecord {
    pub kind: AuditorKind,
    pub container: Option<ContainerId>,
    /// Field that appended the record, if any.
    pub field: Option<FieldId>,
}

/// Trace of one notification pass.
///
/// A fresh list is created per pass. Branches of the walk get their own copy
/// so siblings do not see each other's records.
#[derive(Clone, Debug, Default)]
pub struct NotificationList {
    records: Vec<NotificationRecord>,
}

impl NotificationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: NotificationRecord) {
        self.records.push(record);
    }

    pub fn first_record(&self) -> Option<&NotificationRecord> {
        self.records.first()
    }

    pub fn last_record(&self) -> Option<&NotificationRecord> {
        self.records.last()
    }

    /// Field that started the pass.
    pub fn first_field(&self) -> Option<FieldId> {
        self.records.iter().find_map(|r| r.field)
    }

    /// Most recent field on the path to the current auditor.
    pub fn last_field(&self) -> Option<FieldId> {
        self.records.iter().rev().find_map(|r| r.field)
    }

    pub(crate) fn set_last_kind(&mut self, kind: AuditorKind) {
        if let Some(last) = self.records.last_mut() {
            last.kind = kind;
        }
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FieldGraph {
    /// Runs a complete notification pass starting at `field`.
    pub fn start_notify(&mut self, field: FieldId) {
        self.begin_notify();
        let mut list = NotificationList::new();
        self.notify(field, &mut list);
        if self.config.trace_notifications {
            debug!("notification pass from field {field} recorded {} steps", list.len());
        }
        self.end_notify();
    }

    /// Propagates a notification through `field`.
    ///
    /// Every field reached after the first one is marked dirty, even if its
    /// own notification is disabled. A field already forwarding a
    /// notification higher up the stack is skipped.
    pub fn notify(&mut self, field: FieldId, list: &mut NotificationList) {
        let Some(record) = self.fields.get_mut(&field) else {
            return;
        };
        if record.flags.contains(StatusFlags::NOTIFIED) {
            return;
        }
        if list.first_record().is_some() {
            record.flags.insert(StatusFlags::DIRTY);
        }
        if !record.flags.contains(StatusFlags::NOTIFY_ENABLED) {
            return;
        }

        record.flags.insert(StatusFlags::NOTIFIED);
        let container = record.container();
        let auditors = record.storage().map(|s| s.auditors.clone()).unwrap_or_default();
        trace!("notify field {field} ({} auditors)", auditors.len());

        list.append(NotificationRecord {
            kind: AuditorKind::Container,
            container,
            field: Some(field),
        });
        if let Some(container) = container {
            let mut branch = list.clone();
            self.notify_container(container, &mut branch);
        }
        self.notify_auditors(&auditors, list);

        if let Some(record) = self.fields.get_mut(&field) {
            record.flags.remove(StatusFlags::NOTIFIED);
        }
    }

    fn notify_auditors(&mut self, auditors: &[Auditor], list: &mut NotificationList) {
        if let [auditor] = auditors {
            self.notify_auditor(*auditor, list);
            return;
        }
        for auditor in auditors {
            let mut branch = list.clone();
            self.notify_auditor(*auditor, &mut branch);
        }
    }

    fn notify_auditor(&mut self, auditor: Auditor, list: &mut NotificationList) {
        list.set_last_kind(auditor.kind());
        match auditor {
            Auditor::Field(slave) => self.notify(slave, list),
            // The port feeds this field; nothing flows back upstream.
            Auditor::EngineOutput(_) => {}
            Auditor::Sensor(sensor) => self.schedule_sensor(sensor, list.first_field()),
            Auditor::Container(container) => self.notify_container(container, list),
        }
    }

    /// Notifies a container. Engines forward the notification to the fields
    /// connected from their enabled outputs.
    pub(crate) fn notify_container(&mut self, id: ContainerId, list: &mut NotificationList) {
        let Some(container) = self.containers.get_mut(&id) else {
            return;
        };
        if container.notifying {
            return;
        }
        container.notifying = true;
        container.notify_count += 1;
        let outputs: Vec<_> = match container.kind {
            ContainerKind::Node => Vec::new(),
            ContainerKind::Engine | ContainerKind::Converter => {
                container.outputs.iter().map(|(_, output)| *output).collect()
            }
        };

        for output in outputs {
            let Some(port) = self.outputs.get(&output) else {
                continue;
            };
            if !port.enabled {
                continue;
            }
            for slave in port.connections.clone() {
                let mut branch = list.clone();
                branch.append(NotificationRecord {
                    kind: AuditorKind::EngineOutput,
                    container: Some(id),
                    field: None,
                });
                self.notify(slave, &mut branch);
            }
        }

        if let Some(container) = self.containers.get_mut(&id) {
            container.notifying = false;
        }
    }
}
