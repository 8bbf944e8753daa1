//! Process-local [`TokenCache`] for tests and deployments without a cache location.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::Token,
	cache::{CacheFuture, TokenCache},
};

/// Thread-safe slot that keeps the token in memory and counts writes.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenCache {
	slot: Arc<RwLock<Option<Token>>>,
	writes: Arc<AtomicU64>,
}
impl MemoryTokenCache {
	/// Creates a slot pre-populated with `token`.
	pub fn with_token(token: Token) -> Self {
		Self { slot: Arc::new(RwLock::new(Some(token))), writes: Default::default() }
	}

	/// Current slot content.
	pub fn snapshot(&self) -> Option<Token> {
		self.slot.read().clone()
	}

	/// Number of successful [`TokenCache::store`] calls.
	pub fn writes(&self) -> u64 {
		self.writes.load(Ordering::Relaxed)
	}
}
impl TokenCache for MemoryTokenCache {
	fn load(&self) -> CacheFuture<'_, Option<Token>> {
		let token = self.snapshot();

		Box::pin(async move { Ok(token) })
	}

	fn store<'a>(&'a self, token: &'a Token) -> CacheFuture<'a, ()> {
		*self.slot.write() = Some(token.clone());
		self.writes.fetch_add(1, Ordering::Relaxed);

		Box::pin(async { Ok(()) })
	}
}
