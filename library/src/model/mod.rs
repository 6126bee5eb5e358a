pub mod field_type;
pub mod ids;
pub mod status;
pub mod value;

pub use field_type::FieldType;
pub use ids::{ContainerId, FieldId, OutputId, SensorId};
pub use status::{FieldKind, StatusFlags};
pub use value::{
    BoolValue, FieldValue, FloatValue, Int32Value, MultiFloatValue, MultiInt32Value, MultiStringValue,
    MultiValue, MultiVec3fValue, Scalar, SingleValue, StringValue, UInt32Value, Vec3fValue,
};
