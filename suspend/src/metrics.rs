pub(crate) const METRIC_CYCLE_INITIATED: &str = "suspend_cycles_initiated_total";
pub(crate) const METRIC_CYCLE_RESOLVED: &str = "suspend_cycles_resolved_total";
pub(crate) const METRIC_CYCLE_DURATION: &str = "suspend_cycle_duration_seconds";
pub(crate) const METRIC_DEADLINE_ELAPSED: &str = "suspend_deadline_elapsed_total";

pub(crate) fn emit_cycle_initiated(service_name: &str) {
    metrics::counter!(
        METRIC_CYCLE_INITIATED,
        "service_name" => service_name.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_cycle_resolved(service_name: &str, outcome: &str) {
    metrics::counter!(
        METRIC_CYCLE_RESOLVED,
        "service_name" => service_name.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_cycle_duration(service_name: &str, outcome: &str, duration_secs: f64) {
    metrics::histogram!(
        METRIC_CYCLE_DURATION,
        "service_name" => service_name.to_string(),
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}

pub(crate) fn emit_deadline_elapsed(service_name: &str) {
    metrics::counter!(
        METRIC_DEADLINE_ELAPSED,
        "service_name" => service_name.to_string()
    )
    .increment(1);
}
