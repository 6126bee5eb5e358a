//! Identifiers for the entities living in a `FieldGraph`.

use std::fmt;

use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            pub(crate) fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// A typed data slot.
    FieldId
);
define_id!(
    /// A node, engine or converter owning fields.
    ContainerId
);
define_id!(
    /// A named production point on an engine.
    OutputId
);
define_id!(
    /// A data sensor attached to a field.
    SensorId
);
