//! Type definitions for jobhours

mod error;
mod report;

pub use error::*;
pub use report::*;
