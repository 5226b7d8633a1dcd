//! Observability and telemetry.
//!
//! The gate emits `tracing` events and `metrics` values everywhere; this
//! module only wires up a subscriber for hosts that do not bring their own.
//! Metric export (Prometheus, OTLP, ...) is the host's concern — the
//! `metrics` facade is a no-op until the host installs a recorder.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber filtered by `RELAYGATE_LOG`
/// (falling back to `RUST_LOG`, then `info`).
///
/// Safe to call more than once; only the first call installs anything.
/// Hosts embedding the gate in a larger process should skip this and
/// install their own subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_env("RELAYGATE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
