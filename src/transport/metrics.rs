// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for a rate-limited transport.
#[derive(Debug, Default)]
pub struct TransportMetrics {
	sends: AtomicU64,
	throttled: AtomicU64,
}
impl TransportMetrics {
	/// Number of requests handed to the underlying sender, replays included.
	pub fn sends(&self) -> u64 {
		self.sends.load(Ordering::Relaxed)
	}

	/// Number of `429` responses that were waited out and replayed.
	pub fn throttled(&self) -> u64 {
		self.throttled.load(Ordering::Relaxed)
	}

	pub(crate) fn record_send(&self) {
		self.sends.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_throttled(&self) {
		self.throttled.fetch_add(1, Ordering::Relaxed);
	}
}
