use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. Honors `RUST_LOG` when set.
/// Calling it again is harmless; the first subscriber stays in place.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glitch=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
