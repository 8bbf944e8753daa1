//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	env,
	path::PathBuf,
	process,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use time::{Duration, OffsetDateTime};
// self
use commerce_transport::{
	auth::{ClientId, Credentials, Token},
	error::{ConfigError, Error},
	http::ReqwestHttpClient,
	reqwest::Client,
	source::{IssueFuture, TokenIssuer},
	url::Url,
};

pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "secret";
/// `base64("client-id:secret")`.
pub const BASIC_AUTHORIZATION: &str = "Basic Y2xpZW50LWlkOnNlY3JldA==";

/// Client accepting the self-signed certificate `httpmock` serves with the `https` feature.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Returns a unique, not-yet-existing path inside the system temp directory.
pub fn temp_cache_path(label: &str) -> PathBuf {
	env::temp_dir().join(format!(
		"commerce_transport_it_{label}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	))
}

pub fn token(access_token: &str, expires_in: Duration) -> Token {
	Token::builder()
		.access_token(access_token)
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(expires_in)
		.build()
		.expect("Token fixture should build.")
}

pub fn credentials(token_endpoint: &str) -> Credentials {
	Credentials::new(
		ClientId::new(CLIENT_ID).expect("Client id fixture should be valid."),
		CLIENT_SECRET,
		Url::parse(token_endpoint).expect("Token endpoint fixture should parse."),
	)
}

pub fn token_body(access_token: &str, expires_in: i64) -> String {
	format!(
		"{{\"access_token\":\"{access_token}\",\"token_type\":\"bearer\",\"expires_in\":{expires_in}}}"
	)
}

/// Issuer returning `issued-<n>` tokens and counting its calls.
pub struct CountingIssuer {
	calls: AtomicUsize,
	lifetime: Duration,
	fail: bool,
}
impl CountingIssuer {
	pub fn new(lifetime: Duration) -> Arc<Self> {
		Arc::new(Self { calls: AtomicUsize::new(0), lifetime, fail: false })
	}

	pub fn failing() -> Arc<Self> {
		Arc::new(Self { calls: AtomicUsize::new(0), lifetime: Duration::ZERO, fail: true })
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl TokenIssuer for CountingIssuer {
	fn issue(&self) -> IssueFuture<'_> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

		Box::pin(async move {
			// Let concurrent callers pile up behind the refresh lock.
			tokio::task::yield_now().await;

			if self.fail {
				return Err(Error::InvalidClient { reason: "invalid_client".into() });
			}

			Token::builder()
				.access_token(format!("issued-{call}"))
				.issued_at(OffsetDateTime::now_utc())
				.expires_in(self.lifetime)
				.build()
				.map_err(|e| Error::from(ConfigError::from(e)))
		})
	}
}
