//! Engine wrapping a converter plugin.

use std::sync::Arc;

use log::warn;

use crate::graph::{Engine, EngineContext};
use crate::model::{FieldType, FieldValue};
use crate::plugin::ConverterPlugin;

pub(crate) const CONVERTER_INPUT: &str = "input";
pub(crate) const CONVERTER_OUTPUT: &str = "output";

/// One input field of the plugin's source type, one output of its target
/// type. Spliced into connections between fields of different types.
pub struct FieldConverter {
    plugin: Arc<dyn ConverterPlugin>,
}

impl FieldConverter {
    pub fn new(plugin: Arc<dyn ConverterPlugin>) -> Self {
        Self { plugin }
    }

    pub fn plugin(&self) -> &Arc<dyn ConverterPlugin> {
        &self.plugin
    }
}

impl Engine for FieldConverter {
    fn type_name(&self) -> &str {
        "FieldConverter"
    }

    fn inputs(&self) -> Vec<(String, Box<dyn FieldValue>)> {
        vec![(CONVERTER_INPUT.to_string(), self.plugin.default_input())]
    }

    fn outputs(&self) -> Vec<(String, FieldType)> {
        vec![(CONVERTER_OUTPUT.to_string(), self.plugin.target_type())]
    }

    fn evaluate(&self, ctx: &mut EngineContext<'_>) {
        let Some(input) = ctx.input(CONVERTER_INPUT) else {
            return;
        };
        match self.plugin.convert(input.as_ref()) {
            Some(converted) => ctx.set_output(CONVERTER_OUTPUT, converted.as_ref()),
            None => warn!(
                "converter {} rejected a {} value",
                self.plugin.id(),
                input.field_type()
            ),
        }
    }
}
