//! Logging setup for hosts of the content pipeline
//!
//! The library only emits through the `log` facade; binaries pick the backend.

pub use log::{debug, info, warn, error, trace};

/// Initialize `env_logger`, honouring `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize `env_logger` with a fallback filter used when `RUST_LOG` is unset
///
/// Returns `false` if a logger was already installed.
pub fn init_with_default_filter(filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
