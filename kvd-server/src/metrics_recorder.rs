//! Process-global metrics recorder installation.
//!
//! Grounded on the `metrics`/`metrics-util` wiring in
//! `readyset-server/src/metrics/composite_recorder.rs`: a single recorder is
//! installed once at startup, and every subsystem records through the
//! `metrics::counter!` macro rather than threading a recorder handle
//! through every call site. This crate only defines and documents the
//! counters below; the binary crate picks the concrete recorder backend
//! (e.g. a Prometheus exporter) the teacher's composite recorder
//! abstracts over.
//!
//! Counters recorded elsewhere in this workspace:
//! - `kvd_connections_accepted_total`
//! - `kvd_commands_total{command}`
//! - `kvd_commands_errors_total{kind}`
//! - `kvd_keys_expired_total{mechanism="lazy"|"cron"}`
//! - `kvd_rehash_steps_total`

use metrics::describe_counter;

/// Install the process-global recorder, behind the `metrics-prometheus`
/// feature (default-on). With the feature disabled this is a no-op and
/// every `metrics::counter!` call site becomes a silent no-op too, per
/// `spec.md`'s framing of metrics as an ambient, feature-gated concern.
///
/// Builds the recorder directly rather than wiring it through something
/// like the teacher's `CompositeMetricsRecorder` (this workspace only ever
/// runs one recorder) and installs it with `metrics::set_global_recorder`
/// instead of the crate's `install()` convenience method, which requires an
/// async runtime this binary doesn't otherwise need.
#[cfg(feature = "metrics-prometheus")]
pub fn install() {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    if let Err(err) = metrics::set_global_recorder(recorder) {
        tracing::warn!(error = %err, "failed to install prometheus metrics recorder");
    }
}

#[cfg(not(feature = "metrics-prometheus"))]
pub fn install() {}

/// Register human-readable descriptions for every counter this workspace
/// emits. Safe to call multiple times; exporters deduplicate by name.
pub fn describe() {
    describe_counter!(
        "kvd_connections_accepted_total",
        "Client connections accepted on the main listen socket"
    );
    describe_counter!(
        "kvd_commands_total",
        "Commands dispatched, labeled by command name"
    );
    describe_counter!(
        "kvd_commands_errors_total",
        "Commands that produced an -ERR reply, labeled by error kind"
    );
    describe_counter!(
        "kvd_keys_expired_total",
        "Keys removed by expiration, labeled by mechanism (lazy or cron)"
    );
    describe_counter!(
        "kvd_rehash_steps_total",
        "Incremental rehash steps performed across all dicts"
    );
}
