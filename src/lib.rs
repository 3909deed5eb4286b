pub mod api;
pub mod benchmark;
pub mod config;
pub mod diagnostics;
pub mod dns;
pub mod errors;
pub mod flex_id;
pub mod probe;
pub mod report;

pub use errors::ProbeError;
pub use probe::{run_probes, ProbeResult, ProbeRunner, ProbeTarget};
pub use report::summarize;

/// Send `tracing` output to stderr so stdout stays a clean report.
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: tracing::Level) {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
