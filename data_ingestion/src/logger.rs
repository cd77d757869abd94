use env_logger::{Builder, Env};

/// Installs the process-wide `env_logger`. Honours `RUST_LOG`, defaults to `info`.
///
/// Calling it more than once is harmless; later calls are ignored.
pub fn init_logger() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_target(true)
        .try_init();
}
