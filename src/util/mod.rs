//! Foundation types shared across the crate.
//!
//! - [`ParamType`] - the closed set of parameter storage kinds
//! - [`Dimensions`] - parameter payload shape
//! - [`Error`] / [`Result`] - fault reporting

mod dimensions;
mod error;
mod param_type;

pub use dimensions::*;
pub use error::*;
pub use param_type::*;
