//! The parameter directory and its typed values.
//!
//! Parameters live in named groups. On the wire both are entries of one
//! chained list; in memory the directory holds groups that own their
//! parameters, indexed by name.

mod directory;
mod entry;
mod value;

pub use directory::ParamDirectory;
pub use entry::{ParamGroup, Parameter, MAX_NAME_LEN};
pub use value::ParamValue;

pub(crate) use directory::PayloadSpan;
