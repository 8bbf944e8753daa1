//! Outbound substrate for commerce REST clients: a rate-limit-aware transport that serializes and
//! replays throttled calls, and a disk-backed OAuth 2.0 client-credentials token source that
//! survives process restarts.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod ext;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod source;
pub mod transport;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{env, path::PathBuf, process, time::Duration as StdDuration};
	// self
	use crate::{
		http::ReqwestHttpClient,
		transport::{SleepFuture, Sleeper},
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Returns a unique, not-yet-existing path inside the system temp directory.
	pub fn temp_cache_path(label: &str) -> PathBuf {
		let unique = format!(
			"commerce_transport_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	/// [`Sleeper`] that records requested durations and returns immediately.
	#[derive(Clone, Debug, Default)]
	pub struct RecordingSleeper(Arc<Mutex<Vec<StdDuration>>>);
	impl RecordingSleeper {
		/// Durations requested so far, in call order.
		pub fn recorded(&self) -> Vec<StdDuration> {
			self.0.lock().clone()
		}

		/// Sum of every requested duration.
		pub fn total(&self) -> StdDuration {
			self.0.lock().iter().sum()
		}
	}
	impl Sleeper for RecordingSleeper {
		fn sleep(&self, duration: StdDuration) -> SleepFuture<'_> {
			self.0.lock().push(duration);

			Box::pin(async {})
		}
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
