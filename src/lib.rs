//! # C3D
//!
//! Rust implementation of the C3D motion capture file format.
//!
//! C3D is the biomechanics community's container for 3D point trajectories:
//! a fixed 512-byte header, a self-describing parameter directory, then
//! frame-sequential point data in either 16-bit integer or 32-bit float
//! encoding. This crate reads and writes the Intel (little-endian) flavor
//! of the format with a streaming, frame-at-a-time API.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (errors, parameter types, dimension lists)
//! - [`format`] - Block layout constants and helpers
//! - [`stream`] - Position-tracked buffered file I/O
//! - [`header`] - The fixed header block
//! - [`param`] - The parameter directory and its typed values
//! - [`frame`] - Point frames and their two wire encodings
//! - [`reader`] - Sequential file reader
//! - [`writer`] - Sequential file writer
//!
//! ## Example
//!
//! ```ignore
//! use c3d::C3dReader;
//!
//! let mut reader = C3dReader::open("walk.c3d")?;
//! println!("{} points, {} frames", reader.point_count(), reader.frame_count());
//!
//! while let Some(frame) = reader.read_frame()? {
//!     if let Some(hip) = frame.points()[0] {
//!         println!("{:?}", hip);
//!     }
//! }
//! ```

pub mod format;
pub mod frame;
pub mod header;
pub mod param;
pub mod reader;
pub mod stream;
pub mod util;
pub mod writer;

// The main types, importable from the crate root
pub use frame::{Frame, PointEncoding};
pub use header::Header;
pub use param::{ParamDirectory, ParamGroup, ParamValue, Parameter};
pub use reader::C3dReader;
pub use util::{Dimensions, Error, ParamType, Result};
pub use writer::C3dWriter;

/// Single-import module carrying the common types.
pub mod prelude {
    pub use crate::frame::{Frame, PointEncoding};
    pub use crate::param::{ParamDirectory, ParamGroup, ParamValue, Parameter};
    pub use crate::reader::C3dReader;
    pub use crate::util::{Dimensions, Error, ParamType, Result};
    pub use crate::writer::C3dWriter;
}
