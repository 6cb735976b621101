use tracing_subscriber::EnvFilter;

/// Installs the global log subscriber. Filter from `RUST_LOG`, falling back
/// to info for this crate.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stereo_shim=info"));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
