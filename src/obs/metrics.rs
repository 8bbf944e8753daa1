// self
use crate::obs::{OpKind, OpOutcome};

/// Bumps `commerce_transport_op_total` for `kind` and `outcome`; a no-op without `metrics`.
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"commerce_transport_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}
