pub mod entities;

// Re-export tracing so downstream crates log through a single version.
pub use tracing;

/// Installs the global tracing subscriber for a host binary.
///
/// Call once at startup, before constructing any engine:
///
/// ```no_run
/// model::init_tracing();
/// ```
///
/// Logs go to stdout; the level is controlled through the `RUST_LOG`
/// environment variable. Span close events are emitted, so instrumented
/// operations report their duration.
#[cfg(not(test))]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt::format::FmtSpan;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .init();
}
