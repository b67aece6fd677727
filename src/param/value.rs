//! Typed parameter values.
//!
//! The format supports a closed set of storage kinds: characters, bytes,
//! 16-bit integers and 32-bit floats, each as a scalar or a flat array, plus
//! fixed-width string tables (rank-2 character arrays, row-major, padded
//! with trailing spaces). Each variant owns its own payload encoding.

use crate::util::{Dimensions, Error, ParamType, Result};

/// A decoded parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Single character (rank 0 char)
    Char(char),
    /// One string (rank 1 char array, length is the dimension)
    Str(String),
    /// Fixed-width string table (rank 2 char array)
    StrArray { width: u8, values: Vec<String> },
    /// Single byte
    Byte(u8),
    /// Flat byte array
    ByteArray(Vec<u8>),
    /// Single 16-bit integer
    Int16(i16),
    /// Flat 16-bit integer array
    Int16Array(Vec<i16>),
    /// Single 32-bit float
    Float32(f32),
    /// Flat 32-bit float array
    Float32Array(Vec<f32>),
}

impl ParamValue {
    /// Storage type this value encodes as.
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Char(_) | Self::Str(_) | Self::StrArray { .. } => ParamType::Char,
            Self::Byte(_) | Self::ByteArray(_) => ParamType::Byte,
            Self::Int16(_) | Self::Int16Array(_) => ParamType::Int16,
            Self::Float32(_) | Self::Float32Array(_) => ParamType::Float32,
        }
    }

    /// Dimension list this value encodes as.
    pub fn dimensions(&self) -> Dimensions {
        match self {
            Self::Char(_) | Self::Byte(_) | Self::Int16(_) | Self::Float32(_) => {
                Dimensions::scalar()
            }
            Self::Str(s) => Dimensions::d1(s.len() as u8),
            Self::StrArray { width, values } => Dimensions::d2(*width, values.len() as u8),
            Self::ByteArray(v) => Dimensions::d1(v.len() as u8),
            Self::Int16Array(v) => Dimensions::d1(v.len() as u8),
            Self::Float32Array(v) => Dimensions::d1(v.len() as u8),
        }
    }

    /// Encoded payload size in bytes.
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Char(_) | Self::Byte(_) => 1,
            Self::Int16(_) => 2,
            Self::Float32(_) => 4,
            Self::Str(s) => s.len(),
            Self::StrArray { width, values } => *width as usize * values.len(),
            Self::ByteArray(v) => v.len(),
            Self::Int16Array(v) => 2 * v.len(),
            Self::Float32Array(v) => 4 * v.len(),
        }
    }

    /// Kind name for error messages, distinguishing scalars from arrays.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Char(_) => "char",
            Self::Str(_) => "string",
            Self::StrArray { .. } => "string array",
            Self::Byte(_) => "byte",
            Self::ByteArray(_) => "byte array",
            Self::Int16(_) => "int16",
            Self::Int16Array(_) => "int16 array",
            Self::Float32(_) => "float32",
            Self::Float32Array(_) => "float32 array",
        }
    }

    /// Check the value fits the wire limits: array lengths and string
    /// widths are stored as unsigned bytes, and character data must be
    /// ASCII. `name` is only used in error messages.
    pub fn validate(&self, name: &str) -> Result<()> {
        let fail = |reason: String| Err(Error::parameter(name, reason));
        match self {
            Self::Char(c) => {
                if !c.is_ascii() {
                    return fail(format!("character {c:?} is not ASCII"));
                }
            }
            Self::Str(s) => {
                if s.len() > 255 {
                    return fail(format!("string length {} exceeds 255", s.len()));
                }
                if !s.is_ascii() {
                    return fail("string is not ASCII".into());
                }
            }
            Self::StrArray { width, values } => {
                if values.len() > 255 {
                    return fail(format!("{} rows exceed 255", values.len()));
                }
                for v in values {
                    if v.len() > *width as usize {
                        return fail(format!(
                            "value {:?} is longer than the declared width {}",
                            v, width
                        ));
                    }
                    if !v.is_ascii() {
                        return fail(format!("value {v:?} is not ASCII"));
                    }
                }
            }
            Self::ByteArray(v) => {
                if v.len() > 255 {
                    return fail(format!("array length {} exceeds 255", v.len()));
                }
            }
            Self::Int16Array(v) => {
                if v.len() > 255 {
                    return fail(format!("array length {} exceeds 255", v.len()));
                }
            }
            Self::Float32Array(v) => {
                if v.len() > 255 {
                    return fail(format!("array length {} exceeds 255", v.len()));
                }
            }
            Self::Byte(_) | Self::Int16(_) | Self::Float32(_) => {}
        }
        Ok(())
    }

    /// Append the payload bytes to `out`. Values must have passed
    /// [`ParamValue::validate`]; string rows are space-padded to the
    /// declared width.
    pub fn encode_payload(&self, out: &mut Vec<u8>) {
        match self {
            Self::Char(c) => out.push(*c as u8),
            Self::Str(s) => out.extend_from_slice(s.as_bytes()),
            Self::StrArray { width, values } => {
                let width = *width as usize;
                for v in values {
                    let bytes = v.as_bytes();
                    let used = bytes.len().min(width);
                    out.extend_from_slice(&bytes[..used]);
                    out.resize(out.len() + (width - used), b' ');
                }
            }
            Self::Byte(b) => out.push(*b),
            Self::ByteArray(v) => out.extend_from_slice(v),
            Self::Int16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Int16Array(vs) => {
                for v in vs {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
            Self::Float32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Float32Array(vs) => {
                for v in vs {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
    }

    /// Decode a payload by its declared type and dimensions.
    ///
    /// Character bytes decode as Latin-1 so no byte sequence is rejected.
    /// String table rows lose their trailing padding; everything else
    /// round-trips exactly.
    pub fn decode_payload(ty: ParamType, dims: &Dimensions, payload: &[u8]) -> Result<Self> {
        let expected = ty.elem_bytes() * dims.num_elements();
        if payload.len() != expected {
            return Err(Error::directory(format!(
                "payload of {} bytes does not match {} {}",
                payload.len(),
                ty,
                dims
            )));
        }

        match (ty, dims.rank()) {
            (ParamType::Char, 0) => Ok(Self::Char(payload[0] as char)),
            (ParamType::Char, 1) => Ok(Self::Str(latin1(payload))),
            (ParamType::Char, 2) => {
                let width = dims.size(0).unwrap_or(0);
                let w = width as usize;
                let count = dims.size(1).unwrap_or(0) as usize;
                let mut values = Vec::with_capacity(count);
                for row in 0..count {
                    let raw = &payload[row * w..(row + 1) * w];
                    let s = latin1(raw);
                    values.push(s.trim_end_matches([' ', '\0']).to_string());
                }
                Ok(Self::StrArray { width, values })
            }
            (ParamType::Byte, 0) => Ok(Self::Byte(payload[0])),
            (ParamType::Byte, 1) => Ok(Self::ByteArray(payload.to_vec())),
            (ParamType::Int16, 0) => Ok(Self::Int16(i16::from_le_bytes([
                payload[0], payload[1],
            ]))),
            (ParamType::Int16, 1) => Ok(Self::Int16Array(
                payload
                    .chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            )),
            (ParamType::Float32, 0) => Ok(Self::Float32(f32::from_le_bytes([
                payload[0], payload[1], payload[2], payload[3],
            ]))),
            (ParamType::Float32, 1) => Ok(Self::Float32Array(
                payload
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            )),
            _ => Err(Error::directory(format!(
                "unsupported parameter shape: {} {}",
                ty, dims
            ))),
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: self.kind_name().into(),
        }
    }

    /// Get as a scalar character.
    pub fn as_char(&self) -> Result<char> {
        match self {
            Self::Char(c) => Ok(*c),
            other => Err(other.mismatch("char")),
        }
    }

    /// Get as a single string.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    /// Get as a string table.
    pub fn strings(&self) -> Result<&[String]> {
        match self {
            Self::StrArray { values, .. } => Ok(values),
            other => Err(other.mismatch("string array")),
        }
    }

    /// Get as a scalar byte.
    pub fn as_byte(&self) -> Result<u8> {
        match self {
            Self::Byte(b) => Ok(*b),
            other => Err(other.mismatch("byte")),
        }
    }

    /// Get as a byte array.
    pub fn bytes(&self) -> Result<&[u8]> {
        match self {
            Self::ByteArray(v) => Ok(v),
            other => Err(other.mismatch("byte array")),
        }
    }

    /// Get as a scalar 16-bit integer.
    pub fn as_i16(&self) -> Result<i16> {
        match self {
            Self::Int16(v) => Ok(*v),
            other => Err(other.mismatch("int16")),
        }
    }

    /// Get as a 16-bit integer array.
    pub fn i16s(&self) -> Result<&[i16]> {
        match self {
            Self::Int16Array(v) => Ok(v),
            other => Err(other.mismatch("int16 array")),
        }
    }

    /// Get as a scalar 32-bit float.
    pub fn as_f32(&self) -> Result<f32> {
        match self {
            Self::Float32(v) => Ok(*v),
            other => Err(other.mismatch("float32")),
        }
    }

    /// Get as a 32-bit float array.
    pub fn f32s(&self) -> Result<&[f32]> {
        match self {
            Self::Float32Array(v) => Ok(v),
            other => Err(other.mismatch("float32 array")),
        }
    }

    fn check_index(&self, index: usize, count: usize) -> Result<()> {
        if index >= count {
            Err(Error::IndexOutOfRange { index, count })
        } else {
            Ok(())
        }
    }

    /// Get one element of a byte array.
    pub fn get_byte(&self, index: usize) -> Result<u8> {
        let v = self.bytes()?;
        self.check_index(index, v.len())?;
        Ok(v[index])
    }

    /// Get one element of a 16-bit integer array.
    pub fn get_i16(&self, index: usize) -> Result<i16> {
        let v = self.i16s()?;
        self.check_index(index, v.len())?;
        Ok(v[index])
    }

    /// Get one element of a 32-bit float array.
    pub fn get_f32(&self, index: usize) -> Result<f32> {
        let v = self.f32s()?;
        self.check_index(index, v.len())?;
        Ok(v[index])
    }

    /// Get one row of a string table.
    pub fn get_str(&self, index: usize) -> Result<&str> {
        let v = self.strings()?;
        self.check_index(index, v.len())?;
        Ok(&v[index])
    }
}

/// Decode bytes as Latin-1: every byte maps to the code point of the same
/// value, so no input can fail.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

impl From<char> for ParamValue {
    fn from(c: char) -> Self {
        Self::Char(c)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        let width = values.iter().map(|v| v.len()).max().unwrap_or(0) as u8;
        Self::StrArray { width, values }
    }
}

impl From<u8> for ParamValue {
    fn from(v: u8) -> Self {
        Self::Byte(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        Self::ByteArray(v)
    }
}

impl From<i16> for ParamValue {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<Vec<i16>> for ParamValue {
    fn from(v: Vec<i16>) -> Self {
        Self::Int16Array(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<Vec<f32>> for ParamValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Float32Array(v)
    }
}
