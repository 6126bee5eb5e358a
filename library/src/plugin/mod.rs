//! Converter plugins.
//!
//! A converter turns a value of one field type into another. Converters are
//! registered in a [`ConverterRegistry`] keyed by (source, destination) type;
//! the graph looks them up when two fields of different types are connected
//! and splices a [`FieldConverter`] engine into the connection.

pub mod adapter;
pub mod converters;

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{FieldType, FieldValue};

pub use adapter::FieldConverter;
pub use converters::ScalarConverter;

/// Base trait for all plugins.
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> String;
    fn version(&self) -> (u32, u32, u32);
}

/// Converts field values from one type to another.
pub trait ConverterPlugin: Plugin {
    fn source_type(&self) -> FieldType;

    fn target_type(&self) -> FieldType;

    /// Initial value of the converter's input field.
    fn default_input(&self) -> Box<dyn FieldValue>;

    /// Returns `None` if `value` is not of the source type.
    fn convert(&self, value: &dyn FieldValue) -> Option<Box<dyn FieldValue>>;
}

/// Converter lookup by (source, destination) field type.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<(FieldType, FieldType), Arc<dyn ConverterPlugin>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in converters.
    pub fn with_builtin_converters() -> Self {
        let mut registry = Self::new();
        converters::register_builtin(&mut registry);
        registry
    }

    /// Registers `plugin`, replacing any converter for the same type pair.
    pub fn register(&mut self, plugin: Arc<dyn ConverterPlugin>) {
        self.converters
            .insert((plugin.source_type(), plugin.target_type()), plugin);
    }

    pub fn find(&self, from: FieldType, to: FieldType) -> Option<Arc<dyn ConverterPlugin>> {
        self.converters.get(&(from, to)).cloned()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}
