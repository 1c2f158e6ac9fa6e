// self
use crate::obs::{FlowKind, FlowOutcome};

/// Increments `stitch_broker_flow_total` (when the `metrics` feature is enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"stitch_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a completed flow's wall-clock time in `stitch_broker_flow_duration_seconds`.
pub fn record_flow_duration(kind: FlowKind, elapsed: std::time::Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("stitch_broker_flow_duration_seconds", "flow" => kind.as_str())
			.record(elapsed.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, elapsed);
	}
}
