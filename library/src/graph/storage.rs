//! Extended connection storage.
//!
//! Most fields never take part in a connection, so a field only carries its
//! container id until the first connection or auditor is added. At that point
//! the link is swapped for a boxed [`ConnectStorage`] holding the container id
//! together with all connection bookkeeping.

use crate::model::{ContainerId, FieldId, OutputId, SensorId};

/// Upstream end of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Master {
    Field(FieldId),
    Output(OutputId),
}

/// Category of an auditor. Also used as the record type of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuditorKind {
    Field,
    EngineOutput,
    Sensor,
    Container,
}

/// Something notified when a field changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Auditor {
    /// A slave field connected directly to this one.
    Field(FieldId),
    /// An output port this field is connected from.
    EngineOutput(OutputId),
    Sensor(SensorId),
    Container(ContainerId),
}

impl Auditor {
    pub fn kind(&self) -> AuditorKind {
        match self {
            Auditor::Field(_) => AuditorKind::Field,
            Auditor::EngineOutput(_) => AuditorKind::EngineOutput,
            Auditor::Sensor(_) => AuditorKind::Sensor,
            Auditor::Container(_) => AuditorKind::Container,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ConnectStorage {
    pub(crate) container: Option<ContainerId>,
    /// Master fields in connection order; the last one is the live source.
    pub(crate) master_fields: Vec<FieldId>,
    pub(crate) master_outputs: Vec<OutputId>,
    pub(crate) slaves: Vec<FieldId>,
    pub(crate) auditors: Vec<Auditor>,
    /// Converter engines spliced between a master and this field, one entry
    /// per link in connection order. A master appended twice has two entries.
    pub(crate) converters: Vec<(Master, ContainerId)>,
}

impl ConnectStorage {
    pub(crate) fn new(container: Option<ContainerId>) -> Self {
        Self {
            container,
            ..Default::default()
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        !self.master_fields.is_empty() || !self.master_outputs.is_empty()
    }

    /// Converter of the most recent link from `master`.
    pub(crate) fn converter(&self, master: Master) -> Option<ContainerId> {
        self.converters
            .iter()
            .rev()
            .find(|(m, _)| *m == master)
            .map(|(_, converter)| *converter)
    }

    /// Removes the converter of the oldest link from `master`.
    pub(crate) fn take_converter(&mut self, master: Master) -> Option<ContainerId> {
        let index = self.converters.iter().position(|(m, _)| *m == master)?;
        Some(self.converters.remove(index).1)
    }

    /// Frees the record. Every connection must have been torn down first.
    pub(crate) fn release(self) {
        assert!(self.master_fields.is_empty(), "releasing storage with master fields");
        assert!(self.master_outputs.is_empty(), "releasing storage with master outputs");
        assert!(self.slaves.is_empty(), "releasing storage with slaves");
        assert!(self.auditors.is_empty(), "releasing storage with auditors: {:?}", self.auditors);
        assert!(self.converters.is_empty(), "releasing storage with converters");
    }
}
