//! # uadetect
//!
//! Command-line front end for [`uadetect_core`]:
//! - **report**: JSON summary of one detection
//! - **error**: CLI error type
//! - **tracing**: logging setup

pub mod error;
pub mod report;
pub mod tracing;

pub use error::{Error, Result};
pub use report::Report;
