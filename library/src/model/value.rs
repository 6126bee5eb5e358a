//! Field values.
//!
//! A field stores its value as a `Box<dyn FieldValue>`. The graph only ever
//! copies, compares, reads and writes values through this trait, so new value
//! kinds can be added without touching the connection machinery.

use std::any::Any;
use std::fmt;

use crate::error::FieldError;
use crate::io::{Input, Output};
use crate::model::field_type::FieldType;

/// Polymorphic value held by a field.
pub trait FieldValue: Any + fmt::Debug {
    fn field_type(&self) -> FieldType;

    fn clone_value(&self) -> Box<dyn FieldValue>;

    /// Copies `other` into `self`. Returns false (and leaves `self` alone) if
    /// the concrete types differ.
    fn copy_from(&mut self, other: &dyn FieldValue) -> bool;

    fn equals(&self, other: &dyn FieldValue) -> bool;

    /// Parses a value from `input`. On error `self` may be partially
    /// updated; callers read into a scratch copy.
    fn read_value(&mut self, input: &mut Input) -> Result<(), FieldError>;

    fn write_value(&self, out: &mut Output);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Called with +1 or -1 whenever an auditor is attached to or removed
    /// from the owning field.
    fn connection_status_changed(&mut self, _delta: i32) {}
}

impl<'a> dyn FieldValue + 'a {
    pub fn downcast_ref<T: FieldValue>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: FieldValue>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

impl Clone for Box<dyn FieldValue> {
    fn clone(&self) -> Self {
        self.clone_value()
    }
}

/// Element type usable in [`SingleValue`] and [`MultiValue`].
pub trait Scalar: Clone + PartialEq + fmt::Debug + Default + 'static {
    const SINGLE_TYPE: FieldType;
    const MULTI_TYPE: FieldType;

    fn read_scalar(input: &mut Input) -> Result<Self, FieldError>;

    fn write_scalar(&self, out: &mut Output);
}

impl Scalar for f32 {
    const SINGLE_TYPE: FieldType = FieldType::FLOAT;
    const MULTI_TYPE: FieldType = FieldType::MULTI_FLOAT;

    fn read_scalar(input: &mut Input) -> Result<Self, FieldError> {
        input.read_f32()
    }

    fn write_scalar(&self, out: &mut Output) {
        out.write_f32(*self);
    }
}

impl Scalar for i32 {
    const SINGLE_TYPE: FieldType = FieldType::INT32;
    const MULTI_TYPE: FieldType = FieldType::MULTI_INT32;

    fn read_scalar(input: &mut Input) -> Result<Self, FieldError> {
        input.read_i32()
    }

    fn write_scalar(&self, out: &mut Output) {
        out.write_i32(*self);
    }
}

impl Scalar for u32 {
    const SINGLE_TYPE: FieldType = FieldType::UINT32;
    const MULTI_TYPE: FieldType = FieldType::MULTI_UINT32;

    fn read_scalar(input: &mut Input) -> Result<Self, FieldError> {
        input.read_u32()
    }

    fn write_scalar(&self, out: &mut Output) {
        out.write_u32(*self);
    }
}

impl Scalar for bool {
    const SINGLE_TYPE: FieldType = FieldType::BOOL;
    const MULTI_TYPE: FieldType = FieldType::MULTI_BOOL;

    fn read_scalar(input: &mut Input) -> Result<Self, FieldError> {
        input.read_bool()
    }

    fn write_scalar(&self, out: &mut Output) {
        out.write_bool(*self);
    }
}

impl Scalar for String {
    const SINGLE_TYPE: FieldType = FieldType::STRING;
    const MULTI_TYPE: FieldType = FieldType::MULTI_STRING;

    fn read_scalar(input: &mut Input) -> Result<Self, FieldError> {
        input.read_string()
    }

    fn write_scalar(&self, out: &mut Output) {
        out.write_string(self);
    }
}

impl Scalar for [f32; 3] {
    const SINGLE_TYPE: FieldType = FieldType::VEC3F;
    const MULTI_TYPE: FieldType = FieldType::MULTI_VEC3F;

    fn read_scalar(input: &mut Input) -> Result<Self, FieldError> {
        Ok([input.read_f32()?, input.read_f32()?, input.read_f32()?])
    }

    fn write_scalar(&self, out: &mut Output) {
        for (i, component) in self.iter().enumerate() {
            if i > 0 {
                out.write_char(' ');
            }
            out.write_f32(*component);
        }
    }
}

/// A field holding exactly one value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SingleValue<T>(pub T);

impl<T: Scalar> From<T> for SingleValue<T> {
    fn from(value: T) -> Self {
        SingleValue(value)
    }
}

impl<T: Scalar> FieldValue for SingleValue<T> {
    fn field_type(&self) -> FieldType {
        T::SINGLE_TYPE
    }

    fn clone_value(&self) -> Box<dyn FieldValue> {
        Box::new(self.clone())
    }

    fn copy_from(&mut self, other: &dyn FieldValue) -> bool {
        match other.downcast_ref::<Self>() {
            Some(other) => {
                self.0 = other.0.clone();
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn FieldValue) -> bool {
        other.downcast_ref::<Self>().is_some_and(|other| other.0 == self.0)
    }

    fn read_value(&mut self, input: &mut Input) -> Result<(), FieldError> {
        self.0 = T::read_scalar(input)?;
        Ok(())
    }

    fn write_value(&self, out: &mut Output) {
        self.0.write_scalar(out);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A field holding an ordered list of values.
///
/// Text form is `[a, b, c]`, or a bare value when there is exactly one.
/// Binary form is a count word followed by the values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiValue<T>(pub Vec<T>);

impl<T: Scalar> From<Vec<T>> for MultiValue<T> {
    fn from(values: Vec<T>) -> Self {
        MultiValue(values)
    }
}

impl<T: Scalar> FieldValue for MultiValue<T> {
    fn field_type(&self) -> FieldType {
        T::MULTI_TYPE
    }

    fn clone_value(&self) -> Box<dyn FieldValue> {
        Box::new(self.clone())
    }

    fn copy_from(&mut self, other: &dyn FieldValue) -> bool {
        match other.downcast_ref::<Self>() {
            Some(other) => {
                self.0.clone_from(&other.0);
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn FieldValue) -> bool {
        other.downcast_ref::<Self>().is_some_and(|other| other.0 == self.0)
    }

    fn read_value(&mut self, input: &mut Input) -> Result<(), FieldError> {
        if input.is_binary() {
            let count = input.read_u32()? as usize;
            let mut values = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                values.push(T::read_scalar(input)?);
            }
            self.0 = values;
            return Ok(());
        }

        let c = input.read_char()?;
        if c != '[' {
            input.put_back(c);
            self.0 = vec![T::read_scalar(input)?];
            return Ok(());
        }

        let mut values = Vec::new();
        loop {
            let c = input.read_char()?;
            if c == ']' {
                break;
            }
            input.put_back(c);
            values.push(T::read_scalar(input)?);
            match input.read_char()? {
                ',' => {}
                ']' => break,
                other => return Err(input.error(format!("expected ',' or ']', got '{other}'"))),
            }
        }
        self.0 = values;
        Ok(())
    }

    fn write_value(&self, out: &mut Output) {
        if out.is_binary() {
            out.write_u32(self.0.len() as u32);
            for value in &self.0 {
                value.write_scalar(out);
            }
            return;
        }

        if let [single] = self.0.as_slice() {
            single.write_scalar(out);
            return;
        }
        out.write_char('[');
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                out.write_raw(", ");
            }
            value.write_scalar(out);
        }
        out.write_char(']');
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub type FloatValue = SingleValue<f32>;
pub type Int32Value = SingleValue<i32>;
pub type UInt32Value = SingleValue<u32>;
pub type BoolValue = SingleValue<bool>;
pub type StringValue = SingleValue<String>;
pub type Vec3fValue = SingleValue<[f32; 3]>;

pub type MultiFloatValue = MultiValue<f32>;
pub type MultiInt32Value = MultiValue<i32>;
pub type MultiStringValue = MultiValue<String>;
pub type MultiVec3fValue = MultiValue<[f32; 3]>;

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(value: &dyn FieldValue) -> String {
        let mut out = Output::text();
        value.write_value(&mut out);
        out.as_text()
    }

    #[test]
    fn test_copy_requires_same_kind() {
        let mut a = FloatValue::from(1.0);
        assert!(a.copy_from(&FloatValue::from(2.5)));
        assert_eq!(a.0, 2.5);
        assert!(!a.copy_from(&Int32Value::from(3)));
        assert_eq!(a.0, 2.5);
    }

    #[test]
    fn test_equals_and_downcast() {
        let boxed: Box<dyn FieldValue> = Box::new(StringValue::from("x".to_string()));
        assert!(boxed.equals(&StringValue::from("x".to_string())));
        assert!(!boxed.equals(&StringValue::from("y".to_string())));
        assert_eq!(boxed.downcast_ref::<StringValue>().map(|v| v.0.as_str()), Some("x"));
        assert!(boxed.downcast_ref::<FloatValue>().is_none());
        assert_eq!(boxed.field_type(), FieldType::STRING);
    }

    #[test]
    fn test_vec3_text_form() {
        let value = Vec3fValue::from([1.0, 2.5, -3.0]);
        assert_eq!(text_of(&value), "1 2.5 -3");

        let mut read = Vec3fValue::default();
        read.read_value(&mut Input::from_text("1 2.5 -3")).unwrap();
        assert_eq!(read, value);
    }

    #[test]
    fn test_multi_text_forms() {
        assert_eq!(text_of(&MultiFloatValue::from(vec![1.0, 2.0, 3.5])), "[1, 2, 3.5]");
        assert_eq!(text_of(&MultiFloatValue::from(vec![4.0])), "4");
        assert_eq!(text_of(&MultiFloatValue::default()), "[]");

        let mut value = MultiInt32Value::default();
        value.read_value(&mut Input::from_text("[ 1, -2,3, ]")).unwrap();
        assert_eq!(value.0, vec![1, -2, 3]);

        value.read_value(&mut Input::from_text("7")).unwrap();
        assert_eq!(value.0, vec![7]);

        value.read_value(&mut Input::from_text("[]")).unwrap();
        assert!(value.0.is_empty());
    }

    #[test]
    fn test_multi_malformed() {
        let mut value = MultiInt32Value::default();
        let err = value.read_value(&mut Input::from_text("[1 2]")).unwrap_err();
        assert!(err.is_parse_error());

        let err = value.read_value(&mut Input::from_text("[1, 2")).unwrap_err();
        assert!(err.to_string().contains("premature end of input"));
    }

    #[test]
    fn test_multi_binary() {
        let value = MultiStringValue::from(vec!["a".to_string(), "bcdef".to_string()]);
        let mut out = Output::binary();
        value.write_value(&mut out);

        let mut read = MultiStringValue::default();
        read.read_value(&mut Input::from_binary(out.into_bytes())).unwrap();
        assert_eq!(read, value);
    }
}
