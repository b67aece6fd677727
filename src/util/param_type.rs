//! Parameter storage types.

use std::fmt;

/// Storage type of a parameter value.
///
/// The on-wire tag is a signed byte whose magnitude is the element size:
/// -1 = char, 1 = byte, 2 = 16-bit integer, 4 = 32-bit float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Character data (tag -1), one byte per element
    Char,
    /// Unsigned byte (tag 1)
    Byte,
    /// Signed 16-bit integer, little-endian (tag 2)
    Int16,
    /// IEEE 754 single precision float, little-endian (tag 4)
    Float32,
}

impl ParamType {
    /// Parse from the wire tag. Returns None for unknown tags.
    pub const fn from_tag(tag: i8) -> Option<Self> {
        match tag {
            -1 => Some(Self::Char),
            1 => Some(Self::Byte),
            2 => Some(Self::Int16),
            4 => Some(Self::Float32),
            _ => None,
        }
    }

    /// Wire tag for this type.
    pub const fn tag(self) -> i8 {
        match self {
            Self::Char => -1,
            Self::Byte => 1,
            Self::Int16 => 2,
            Self::Float32 => 4,
        }
    }

    /// Size of one element in bytes.
    pub const fn elem_bytes(self) -> usize {
        match self {
            Self::Char | Self::Byte => 1,
            Self::Int16 => 2,
            Self::Float32 => 4,
        }
    }

    /// Human-readable type name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::Byte => "byte",
            Self::Int16 => "int16",
            Self::Float32 => "float32",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for ty in [
            ParamType::Char,
            ParamType::Byte,
            ParamType::Int16,
            ParamType::Float32,
        ] {
            assert_eq!(ParamType::from_tag(ty.tag()), Some(ty));
        }
    }

    #[test]
    fn test_unknown_tags() {
        assert_eq!(ParamType::from_tag(0), None);
        assert_eq!(ParamType::from_tag(3), None);
        assert_eq!(ParamType::from_tag(-2), None);
        assert_eq!(ParamType::from_tag(i8::MIN), None);
    }

    #[test]
    fn test_elem_bytes() {
        assert_eq!(ParamType::Char.elem_bytes(), 1);
        assert_eq!(ParamType::Byte.elem_bytes(), 1);
        assert_eq!(ParamType::Int16.elem_bytes(), 2);
        assert_eq!(ParamType::Float32.elem_bytes(), 4);
    }

    #[test]
    fn test_names() {
        assert_eq!(ParamType::Float32.to_string(), "float32");
        assert_eq!(ParamType::Char.name(), "char");
    }
}
