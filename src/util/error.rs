//! Error types for the C3D library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for C3D operations.
///
/// Variants fall into three families: I/O faults (the OS layer failed),
/// format faults (the bytes do not describe a valid file), and state faults
/// (an operation was called in the wrong lifecycle state or with arguments
/// inconsistent with the file's declared structure). [`Error::is_io`],
/// [`Error::is_format`] and [`Error::is_state`] report the family.
#[derive(Error, Debug)]
pub enum Error {
    /// Path did not resolve to a readable file
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Stream ran out inside a structure
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Fault from the OS I/O layer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parameter section key byte is missing from the header
    #[error("Not a C3D file: parameter section key not found")]
    NotAC3dFile,

    /// Malformed parameter directory
    #[error("Invalid parameter directory: {0}")]
    InvalidDirectory(String),

    /// Parameter group not found by name
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Parameter not found by name
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Parameter path is not of the form `GROUP:PARAMETER`
    #[error("Invalid parameter path {0:?}: expected \"GROUP:PARAMETER\"")]
    InvalidPath(String),

    /// Stored parameter value has a different kind than requested
    #[error("Expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Parameter value violates a format constraint
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Writer has no open file
    #[error("Writer is not open")]
    NotOpen,

    /// Writer already has an open file
    #[error("Writer is already open")]
    AlreadyOpen,

    /// New parameters cannot be declared once the directory is on disk
    #[error("Cannot declare {0} after open")]
    ParameterAfterOpen(String),

    /// In-place patch would change the parameter's encoded size
    #[error("Cannot resize {name} in place: {expected} bytes on disk, new value needs {actual}")]
    PatchSizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// In-place patch would change the parameter's type or dimensions
    #[error("Cannot change the type or shape of {name} in place")]
    PatchShapeMismatch { name: String },

    /// Point accessor called before the first frame was read
    #[error("No frame has been read yet")]
    NoFrameRead,

    /// More frames requested than the file declares
    #[error("All {count} declared frames have been read")]
    PastLastFrame { count: usize },

    /// Element index out of bounds
    #[error("Index {index} out of bounds (count: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// Point label not present in the file
    #[error("Label not found: {0}")]
    LabelNotFound(String),

    /// Frame has a different number of points than the file declares
    #[error("Frame has {actual} points, file declares {expected}")]
    PointCountMismatch { expected: usize, actual: usize },

    /// Frame encoding does not match the file's point scale convention
    #[error("Encoding mismatch: file uses {file} frames, caller wrote {requested}")]
    EncodingMismatch {
        file: &'static str,
        requested: &'static str,
    },

    /// Final frame count does not fit the on-disk counter
    #[error("Frame count {0} exceeds what POINT:FRAMES can store")]
    FrameCountOverflow(usize),
}

impl Error {
    /// Create an invalid directory error.
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::InvalidDirectory(msg.into())
    }

    /// Create an invalid parameter error.
    pub fn parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for faults raised by the OS I/O layer.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_) | Self::UnexpectedEof(_) | Self::Io(_)
        )
    }

    /// True for faults raised by structurally invalid file content.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Self::NotAC3dFile
                | Self::InvalidDirectory(_)
                | Self::GroupNotFound(_)
                | Self::ParameterNotFound(_)
                | Self::InvalidPath(_)
                | Self::TypeMismatch { .. }
                | Self::InvalidParameter { .. }
        )
    }

    /// True for faults raised by lifecycle or argument misuse.
    pub fn is_state(&self) -> bool {
        !self.is_io() && !self.is_format()
    }
}

/// Result type alias for C3D operations.
pub type Result<T> = std::result::Result<T, Error>;
