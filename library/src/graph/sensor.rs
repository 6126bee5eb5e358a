//! Notification pass bracketing and zero-latency field sensors.

use log::{debug, trace};

use crate::error::FieldError;
use crate::graph::{Auditor, FieldGraph};
use crate::model::{FieldId, SensorId};

/// What a sensor callback is told.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorEvent {
    /// A notification pass reached the watched field. Carries the field that
    /// started the pass.
    Triggered { origin: Option<FieldId> },
    /// The watched field is being destroyed; the sensor is detached
    /// right after this call.
    DyingReference { field: FieldId },
}

pub type SensorCallback = Box<dyn FnMut(SensorEvent)>;

pub(crate) struct FieldSensor {
    pub(crate) field: Option<FieldId>,
    callback: SensorCallback,
    scheduled: bool,
}

/// Brackets notification passes.
///
/// Passes nest when a change triggers another change; sensors scheduled
/// anywhere inside fire once, when the outermost pass ends.
#[derive(Debug, Default)]
pub struct NotifyCoordinator {
    depth: usize,
    scheduled: Vec<(SensorId, Option<FieldId>)>,
    completed_passes: u64,
}

impl NotifyCoordinator {
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of outermost passes that have finished.
    pub fn completed_passes(&self) -> u64 {
        self.completed_passes
    }

    pub(crate) fn begin_notify(&mut self) {
        self.depth += 1;
    }

    /// Returns the sensors to trigger when the outermost pass ends.
    pub(crate) fn end_notify(&mut self) -> Option<Vec<(SensorId, Option<FieldId>)>> {
        assert!(self.depth > 0, "end_notify without begin_notify");
        self.depth -= 1;
        if self.depth > 0 {
            return None;
        }
        self.completed_passes += 1;
        Some(std::mem::take(&mut self.scheduled))
    }

    fn schedule(&mut self, sensor: SensorId, origin: Option<FieldId>) {
        self.scheduled.push((sensor, origin));
    }
}

impl FieldGraph {
    /// Attaches a sensor that fires after every notification pass reaching
    /// `field`.
    pub fn attach_sensor(&mut self, field: FieldId, callback: SensorCallback) -> Result<SensorId, FieldError> {
        self.check_field(field)?;
        let id = SensorId::new();
        self.sensors.insert(
            id,
            FieldSensor {
                field: Some(field),
                callback,
                scheduled: false,
            },
        );
        self.add_auditor(field, Auditor::Sensor(id));
        debug!("sensor {id} attached to field {field}");
        Ok(id)
    }

    /// Detaches and drops the sensor.
    pub fn detach_sensor(&mut self, sensor: SensorId) {
        let Some(entry) = self.sensors.remove(&sensor) else {
            return;
        };
        if let Some(field) = entry.field {
            self.remove_auditor(field, Auditor::Sensor(sensor));
        }
        self.coordinator.scheduled.retain(|(s, _)| *s != sensor);
    }

    pub fn sensor_field(&self, sensor: SensorId) -> Option<FieldId> {
        self.sensors.get(&sensor)?.field
    }

    pub(crate) fn begin_notify(&mut self) {
        self.coordinator.begin_notify();
    }

    pub(crate) fn end_notify(&mut self) {
        let Some(scheduled) = self.coordinator.end_notify() else {
            return;
        };
        for (sensor, origin) in scheduled {
            if let Some(entry) = self.sensors.get_mut(&sensor) {
                entry.scheduled = false;
                trace!("triggering sensor {sensor}");
                (entry.callback)(SensorEvent::Triggered { origin });
            }
        }
    }

    pub(crate) fn schedule_sensor(&mut self, sensor: SensorId, origin: Option<FieldId>) {
        let Some(entry) = self.sensors.get_mut(&sensor) else {
            return;
        };
        if entry.scheduled {
            return;
        }
        entry.scheduled = true;
        self.coordinator.schedule(sensor, origin);
    }

    /// Tells the sensor its field is going away and detaches it. The sensor
    /// itself stays registered with no field.
    pub(crate) fn sensor_dying_reference(&mut self, sensor: SensorId, field: FieldId) {
        if let Some(entry) = self.sensors.get_mut(&sensor) {
            (entry.callback)(SensorEvent::DyingReference { field });
            entry.field = None;
            entry.scheduled = false;
        }
        self.coordinator.scheduled.retain(|(s, _)| *s != sensor);
        self.remove_auditor(field, Auditor::Sensor(sensor));
    }
}
