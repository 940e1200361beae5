use tracing_subscriber::EnvFilter;

/// Installs a process-wide `tracing` subscriber. Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
