//! Field type descriptors.

use std::fmt;

/// Identifies the value type of a field.
///
/// Types form a single-inheritance chain rooted at [`FieldType::FIELD`], which
/// is what [`FieldType::is_derived_from`] walks. Two fields may be linked
/// directly only if their types are equal; anything else needs a converter.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    name: &'static str,
    parent: Option<&'static FieldType>,
}

impl FieldType {
    pub const FIELD: FieldType = FieldType::new("Field", None);
    pub const SINGLE: FieldType = FieldType::new("SField", Some(&FieldType::FIELD));
    pub const MULTI: FieldType = FieldType::new("MField", Some(&FieldType::FIELD));

    pub const FLOAT: FieldType = FieldType::new("SFFloat", Some(&FieldType::SINGLE));
    pub const INT32: FieldType = FieldType::new("SFInt32", Some(&FieldType::SINGLE));
    pub const UINT32: FieldType = FieldType::new("SFUInt32", Some(&FieldType::SINGLE));
    pub const BOOL: FieldType = FieldType::new("SFBool", Some(&FieldType::SINGLE));
    pub const STRING: FieldType = FieldType::new("SFString", Some(&FieldType::SINGLE));
    pub const VEC3F: FieldType = FieldType::new("SFVec3f", Some(&FieldType::SINGLE));

    pub const MULTI_FLOAT: FieldType = FieldType::new("MFFloat", Some(&FieldType::MULTI));
    pub const MULTI_INT32: FieldType = FieldType::new("MFInt32", Some(&FieldType::MULTI));
    pub const MULTI_UINT32: FieldType = FieldType::new("MFUInt32", Some(&FieldType::MULTI));
    pub const MULTI_BOOL: FieldType = FieldType::new("MFBool", Some(&FieldType::MULTI));
    pub const MULTI_STRING: FieldType = FieldType::new("MFString", Some(&FieldType::MULTI));
    pub const MULTI_VEC3F: FieldType = FieldType::new("MFVec3f", Some(&FieldType::MULTI));

    pub const fn new(name: &'static str, parent: Option<&'static FieldType>) -> Self {
        Self { name, parent }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<FieldType> {
        self.parent.copied()
    }

    /// True if `self` is `ancestor` or inherits from it.
    pub fn is_derived_from(&self, ancestor: FieldType) -> bool {
        let mut current = Some(*self);
        while let Some(ty) = current {
            if ty == ancestor {
                return true;
            }
            current = ty.parent();
        }
        false
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldType({})", self.name)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
