// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for a cached token source.
#[derive(Debug, Default)]
pub struct SourceMetrics {
	issued: AtomicU64,
	reused: AtomicU64,
	failures: AtomicU64,
	persist_failures: AtomicU64,
}
impl SourceMetrics {
	/// Number of tokens obtained from the issuer.
	pub fn issued(&self) -> u64 {
		self.issued.load(Ordering::Relaxed)
	}

	/// Number of calls answered with the held token.
	pub fn reused(&self) -> u64 {
		self.reused.load(Ordering::Relaxed)
	}

	/// Number of failed issuance attempts.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Number of issued tokens that could not be written to the cache.
	pub fn persist_failures(&self) -> u64 {
		self.persist_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_issued(&self) {
		self.issued.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reused(&self) {
		self.reused.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_persist_failure(&self) {
		self.persist_failures.fetch_add(1, Ordering::Relaxed);
	}
}
