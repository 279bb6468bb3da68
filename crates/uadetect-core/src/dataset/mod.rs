//! Dataset persistence
//!
//! A dataset is a gzip-compressed binary stream:
//!
//! ```text
//! copyright ─ extra ─ version(major, minor)
//!   ─ strings[i32 count]
//!   ─ handlers[i32 count]  tag, confidence, name, uaprof flag, payload,
//!                          allow tree, deny tree
//!   ─ devices[i16 roots]   id, variants, capabilities, children (recursive)
//! ```
//!
//! [`load`] parses a stream into a [`Provider`](crate::provider::Provider),
//! [`write_dataset`] produces one, and [`DatasetBuilder`] assembles a
//! provider directly in memory.

mod builder;
mod format;
mod reader;
mod writer;

pub use builder::DatasetBuilder;
pub use format::SUPPORTED_VERSION;
pub use reader::{load, MAX_PATTERN_DEPTH};
pub use writer::write_dataset;
