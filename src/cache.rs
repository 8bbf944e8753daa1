//! Token cache contracts and the built-in file and in-memory slots.

pub mod file;
pub mod memory;

pub use file::FileTokenCache;
pub use memory::MemoryTokenCache;

// self
use crate::{_prelude::*, auth::Token};

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Single-slot persistence for the most recently issued token.
///
/// One cache location belongs to one token source; implementations do not coordinate writers
/// across processes.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Reads the stored token, returning `None` when the slot is empty.
	fn load(&self) -> CacheFuture<'_, Option<Token>>;

	/// Replaces the stored token.
	fn store<'a>(&'a self, token: &'a Token) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Stored bytes could not be (de)serialized.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage medium.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
