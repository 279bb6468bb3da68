//! # uadetect core library
//!
//! Resolves an HTTP User-Agent string (plus optional request headers) to the
//! best-matching device profile in a hierarchical device/capability dataset:
//! - **dataset**: gzip binary format reader/writer and an in-memory builder
//! - **strings**: interned string table shared by every device record
//! - **device**: device arena with fallback chains and capability inheritance
//! - **handler**: confidence-ranked handlers with allow/deny pattern trees
//! - **matching**: exact, edit-distance, regex-segment and reduced-prefix scoring
//! - **provider**: the lookup pipeline, resolution strategies and defaults
//! - **error**: load and format errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use uadetect_core::{Provider, ProviderConfig};
//!
//! let provider = Provider::open("devices.dat.gz")?;
//! if let Some(device) = provider.device_info("Mozilla/5.0 (Linux; Android 4.1)") {
//!     println!("{} {:?}", device.id(), device.capability("brand_name"));
//! }
//! ```

pub mod dataset;
pub mod device;
pub mod error;
pub mod handler;
pub mod headers;
pub mod matching;
pub mod pattern;
pub mod provider;
pub mod strings;

// Re-export commonly used items at crate root
pub use device::{DeviceGraph, DeviceIndex, DeviceRef};
pub use error::{FormatError, HeaderError, LoadError, LoadResult};
pub use headers::RequestHeaders;
pub use matching::{MatchResult, Results};
pub use provider::{Detection, MatchMethod, Provider, ProviderConfig, Resolution};
