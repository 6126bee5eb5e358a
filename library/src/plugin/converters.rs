//! Built-in converters between the standard field types.

use std::sync::Arc;

use crate::model::{
    BoolValue, FieldType, FieldValue, FloatValue, Int32Value, MultiFloatValue, StringValue, Vec3fValue,
};
use crate::plugin::{ConverterPlugin, ConverterRegistry, Plugin};

/// Converter built from a plain function between two value kinds.
pub struct ScalarConverter<S, D> {
    id: &'static str,
    convert: fn(&S) -> D,
}

impl<S, D> ScalarConverter<S, D> {
    pub fn new(id: &'static str, convert: fn(&S) -> D) -> Self {
        Self { id, convert }
    }
}

impl<S: FieldValue + Default, D: FieldValue + Default> Plugin for ScalarConverter<S, D> {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> String {
        format!("{} to {}", self.source_type(), self.target_type())
    }

    fn version(&self) -> (u32, u32, u32) {
        (0, 1, 0)
    }
}

impl<S: FieldValue + Default, D: FieldValue + Default> ConverterPlugin for ScalarConverter<S, D> {
    fn source_type(&self) -> FieldType {
        S::default().field_type()
    }

    fn target_type(&self) -> FieldType {
        D::default().field_type()
    }

    fn default_input(&self) -> Box<dyn FieldValue> {
        Box::new(S::default())
    }

    fn convert(&self, value: &dyn FieldValue) -> Option<Box<dyn FieldValue>> {
        let value = value.downcast_ref::<S>()?;
        Some(Box::new((self.convert)(value)))
    }
}

fn bool_text(value: bool) -> String {
    let text = if value { "TRUE" } else { "FALSE" };
    text.to_string()
}

pub(crate) fn register_builtin(registry: &mut ConverterRegistry) {
    registry.register(Arc::new(ScalarConverter::<FloatValue, Int32Value>::new(
        "float_to_int32",
        |v| Int32Value::from(v.0 as i32),
    )));
    registry.register(Arc::new(ScalarConverter::<Int32Value, FloatValue>::new(
        "int32_to_float",
        |v| FloatValue::from(v.0 as f32),
    )));
    registry.register(Arc::new(ScalarConverter::<FloatValue, BoolValue>::new(
        "float_to_bool",
        |v| BoolValue::from(v.0 != 0.0),
    )));
    registry.register(Arc::new(ScalarConverter::<BoolValue, FloatValue>::new(
        "bool_to_float",
        |v| FloatValue::from(if v.0 { 1.0 } else { 0.0 }),
    )));
    registry.register(Arc::new(ScalarConverter::<Int32Value, BoolValue>::new(
        "int32_to_bool",
        |v| BoolValue::from(v.0 != 0),
    )));
    registry.register(Arc::new(ScalarConverter::<BoolValue, Int32Value>::new(
        "bool_to_int32",
        |v| Int32Value::from(i32::from(v.0)),
    )));
    registry.register(Arc::new(ScalarConverter::<FloatValue, StringValue>::new(
        "float_to_string",
        |v| StringValue::from(v.0.to_string()),
    )));
    registry.register(Arc::new(ScalarConverter::<Int32Value, StringValue>::new(
        "int32_to_string",
        |v| StringValue::from(v.0.to_string()),
    )));
    registry.register(Arc::new(ScalarConverter::<BoolValue, StringValue>::new(
        "bool_to_string",
        |v| StringValue::from(bool_text(v.0)),
    )));
    registry.register(Arc::new(ScalarConverter::<FloatValue, Vec3fValue>::new(
        "float_to_vec3f",
        |v| Vec3fValue::from([v.0; 3]),
    )));
    registry.register(Arc::new(ScalarConverter::<FloatValue, MultiFloatValue>::new(
        "float_to_mffloat",
        |v| MultiFloatValue::from(vec![v.0]),
    )));
    registry.register(Arc::new(ScalarConverter::<MultiFloatValue, FloatValue>::new(
        "mffloat_to_float",
        |v| FloatValue::from(v.0.first().copied().unwrap_or_default()),
    )));
}
