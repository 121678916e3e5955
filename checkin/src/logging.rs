//! Development-time tracing for the check-in sequencer.
//!
//! Tracing is diagnostics only: output goes to stderr and is never persisted.
//! The durable record of a flow is the key/value store.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directives used when `RUST_LOG` is unset.
///
/// Each `-v` on the command line raises the crate's own level one step;
/// dependencies stay at `warn`.
pub fn default_directives(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "checkin=info,warn",
        2 => "checkin=debug,warn",
        _ => "checkin=trace,warn",
    }
}

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins over `verbosity` when set. A second call is a no-op, so
/// embedders that already installed a subscriber keep theirs.
///
/// ```bash
/// checkin -vv advance Welcome                 # transitions and store writes
/// RUST_LOG=checkin::io=trace checkin status   # just the storage layer
/// ```
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity > 1)
                .compact(),
        )
        .try_init();
}
