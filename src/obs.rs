//! Instrumentation for token acquisition and throttled sends.
//!
//! With the `tracing` feature each operation runs inside a `commerce_transport.op` span carrying
//! `op` and `stage`, and throttle waits, unreadable cache files, and failed cache writes are
//! logged as events. With the `metrics` feature every outcome bumps the
//! `commerce_transport_op_total` counter, labeled by `op` and `outcome`. Without either feature
//! the helpers compile to nothing.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Instrumented operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Token acquisition through the cached token source.
	TokenAcquire,
	/// Request dispatch through the rate-limited transport.
	ThrottledSend,
}
impl OpKind {
	/// Label used for the `op` field and metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::TokenAcquire => "token_acquire",
			OpKind::ThrottledSend => "throttled_send",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How an instrumented operation ended, or that it started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Operation started.
	Attempt,
	/// Operation returned `Ok`.
	Success,
	/// Operation returned an error.
	Failure,
	/// A `429` response triggered a wait-and-resend.
	Throttled,
}
impl OpOutcome {
	/// Label used for the `outcome` metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
			OpOutcome::Throttled => "throttled",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
