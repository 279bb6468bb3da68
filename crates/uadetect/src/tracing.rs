//! Logging for the command-line front end.
//!
//! Events go to stderr. Stdout is reserved for one JSON line per detection
//! so that output can be piped into other tools.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the subscriber. `RUST_LOG` directives take precedence over
/// `default_level`.
pub fn init(default_level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
