// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, cache::CacheError, obs::OpKind};

/// Future wrapped in its [`OpSpan`].
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// The future itself; nothing is attached without `tracing`.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// `commerce_transport.op` span, or a zero-sized stand-in without `tracing`.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Opens the span for `kind` at `stage`.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("commerce_transport.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Attaches the span to `fut`; it is entered on every poll.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn throttled(retry: u32, interval: StdDuration) {
	#[cfg(feature = "tracing")]
	tracing::warn!(retry, interval_secs = interval.as_secs(), "Rate limited; waiting before resend.");
	#[cfg(not(feature = "tracing"))]
	let _ = (retry, interval);
}

pub(crate) fn throttled_without_interval(status: u16) {
	#[cfg(feature = "tracing")]
	tracing::debug!(status, "Rate-limit interval missing or malformed; returning response.");
	#[cfg(not(feature = "tracing"))]
	let _ = status;
}

pub(crate) fn unreplayable_request() {
	#[cfg(feature = "tracing")]
	tracing::warn!("Request body cannot be cloned; a 429 response will not be retried.");
}

pub(crate) fn cache_recovered(error: &CacheError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%error, "Token cache unreadable; starting without a cached token.");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

pub(crate) fn persist_failed(error: &CacheError) {
	#[cfg(feature = "tracing")]
	tracing::error!(%error, "Failed to persist issued token; it stays usable in this process.");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

pub(crate) fn token_issued(expiry: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::debug!(%expiry, "Issued new access token.");
	#[cfg(not(feature = "tracing"))]
	let _ = expiry;
}
