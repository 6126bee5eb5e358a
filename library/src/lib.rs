//! Field dependency and notification engine.
//!
//! Typed fields live in a [`FieldGraph`], owned by nodes and engines. Fields
//! can be connected to other fields or to engine outputs; changes are pushed
//! downstream as dirty marks and pulled lazily when a dirty field is read.
//! Connections between fields of different types go through converter
//! engines looked up in a [`ConverterRegistry`].

pub mod config;
pub mod error;
pub mod graph;
pub mod io;
pub mod model;
pub mod plugin;

pub use config::GraphConfig;
pub use error::FieldError;
pub use graph::{
    Auditor, AuditorKind, ContainerKind, Engine, EngineContext, FieldGraph, Master, NotificationList,
    NotificationRecord, NotifyCoordinator, SensorCallback, SensorEvent,
};
pub use io::{FileFlags, Input, Output};
pub use model::{ContainerId, FieldId, FieldKind, FieldType, FieldValue, OutputId, SensorId, StatusFlags};
pub use plugin::{ConverterPlugin, ConverterRegistry, FieldConverter, Plugin, ScalarConverter};
