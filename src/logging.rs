//! Diagnostic logging setup.
//!
//! User-facing output lives in [`crate::output`]. This subscriber only carries
//! `tracing` diagnostics to stderr, filtered by `SORTDIR_LOG` (default `warn`).

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `sortdir=debug`.
pub const LOG_ENV: &str = "SORTDIR_LOG";

/// Installs the global subscriber. `verbose` forces debug output for this crate.
///
/// Calling it more than once is harmless; later calls are ignored.
pub fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sortdir=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
