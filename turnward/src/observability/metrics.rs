//! Metrics collection for `Turnward`.
//!
//! Prometheus-compatible metrics. Every label value comes from a closed
//! enum, so label cardinality is bounded by construction.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use turnward_core::{BattlePhase, DenialReason, TurnwardError};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `TurnwardError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), TurnwardError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| TurnwardError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "turnward_phase_transitions_total",
        "Total number of phase changes, including forced recoveries"
    );
    describe_counter!(
        "turnward_transitions_denied_total",
        "Transition requests refused by the transition table"
    );
    describe_gauge!("turnward_current_phase", "Ordinal of the current phase");
    describe_counter!(
        "turnward_watchdog_recoveries_total",
        "Recoveries run by an expired watchdog"
    );
    describe_counter!(
        "turnward_user_operations_total",
        "User operations by admission outcome"
    );
    describe_counter!("turnward_turns_started_total", "Turn sequences started");
    describe_counter!(
        "turnward_turns_completed_total",
        "Turn sequences run to completion"
    );
    describe_counter!(
        "turnward_turns_abandoned_total",
        "Turn sequences stopped by a recovery or a denial"
    );
}

/// Records a phase change.
pub fn record_phase_transition(from: BattlePhase, to: BattlePhase, forced: bool) {
    counter!(
        "turnward_phase_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str(),
        "forced" => if forced { "true" } else { "false" },
    )
    .increment(1);
    gauge!("turnward_current_phase").set(f64::from(to.ordinal()));
}

/// Records a denied transition request.
pub fn record_transition_denied(reason: DenialReason) {
    counter!("turnward_transitions_denied_total", "reason" => reason.as_str()).increment(1);
}

/// Records a watchdog recovery.
pub fn record_watchdog_recovery(watchdog: &'static str) {
    counter!("turnward_watchdog_recoveries_total", "watchdog" => watchdog).increment(1);
}

/// Records a user operation admission decision.
///
/// `outcome` is `"accepted"` or a rejection reason label.
pub fn record_user_operation(outcome: &'static str) {
    counter!("turnward_user_operations_total", "outcome" => outcome).increment(1);
}

/// Records the start of a turn sequence.
pub fn record_turn_started() {
    counter!("turnward_turns_started_total").increment(1);
}

/// Records a completed turn sequence.
pub fn record_turn_completed() {
    counter!("turnward_turns_completed_total").increment(1);
}

/// Records an abandoned turn sequence.
pub fn record_turn_abandoned(reason: &'static str) {
    counter!("turnward_turns_abandoned_total", "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_phase_transition(BattlePhase::PlayerAttack, BattlePhase::EnemyAttack, false);
        record_phase_transition(BattlePhase::EnemyAttack, BattlePhase::BattleInProgress, true);
        record_transition_denied(DenialReason::NotAnEdge);
        record_watchdog_recovery("enemy_attack");
        record_user_operation("accepted");
        record_turn_started();
        record_turn_completed();
        record_turn_abandoned("stale");
    }
}
