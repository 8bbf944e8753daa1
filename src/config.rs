//! Client configuration assembled from a builder or from `COMMERCELAYER_*` environment
//! variables.

// std
use std::{env, path::PathBuf};
// self
use crate::{
	_prelude::*,
	auth::{ClientAuthMethod, ClientId, Credentials, ScopeSet, Secret},
	cache::{FileTokenCache, MemoryTokenCache, TokenCache},
	error::ConfigError,
	source::DEFAULT_EXPIRY_SKEW,
};

/// Environment variable holding the OAuth client identifier.
pub const CLIENT_ID_ENV: &str = "COMMERCELAYER_CLIENT_ID";
/// Environment variable holding the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "COMMERCELAYER_CLIENT_SECRET";
/// Environment variable holding the REST API base URL.
pub const API_ENDPOINT_ENV: &str = "COMMERCELAYER_API_ENDPOINT";
/// Environment variable holding the token endpoint URL.
pub const AUTH_ENDPOINT_ENV: &str = "COMMERCELAYER_AUTH_ENDPOINT";
/// Optional environment variable with space-separated scopes.
pub const SCOPES_ENV: &str = "COMMERCELAYER_SCOPES";
/// Optional environment variable naming the token cache file.
pub const TOKEN_CACHE_ENV: &str = "COMMERCELAYER_TOKEN_CACHE";

/// Where issued tokens are persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TokenCacheLocation {
	/// Process-local only; every new process issues a fresh token.
	#[default]
	Memory,
	/// A specific JSON file.
	File(PathBuf),
	/// A directory holding one file per credential fingerprint.
	Directory(PathBuf),
}

/// Validated settings for an [`ApiClient`](crate::client::ApiClient).
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Client-credentials record used for token issuance.
	pub credentials: Credentials,
	/// Base URL every request path is resolved against.
	pub api_endpoint: Url,
	/// Token persistence target.
	pub token_cache: TokenCacheLocation,
	/// Margin before expiry at which the held token stops being reused.
	pub expiry_skew: Duration,
}
impl ClientConfig {
	/// Creates an empty builder.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Reads the `COMMERCELAYER_*` variables from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Reads the `COMMERCELAYER_*` settings through `lookup`; blank values count as unset.
	pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
	where
		F: FnMut(&str) -> Option<String>,
	{
		let mut get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let mut required = |name: &'static str| get(name).ok_or(ConfigError::MissingSetting { name });
		let client_id = required(CLIENT_ID_ENV)?;
		let client_secret = required(CLIENT_SECRET_ENV)?;
		let api_endpoint = required(API_ENDPOINT_ENV)?;
		let auth_endpoint = required(AUTH_ENDPOINT_ENV)?;
		let mut builder = Self::builder()
			.client_id(client_id)
			.client_secret(client_secret)
			.api_endpoint(api_endpoint)
			.auth_endpoint(auth_endpoint);

		if let Some(scopes) = get(SCOPES_ENV) {
			builder = builder.scopes(scopes);
		}
		if let Some(path) = get(TOKEN_CACHE_ENV) {
			builder = builder.token_cache_file(path.trim());
		}

		builder.build()
	}

	/// Opens the configured token cache.
	pub fn open_token_cache(&self) -> Arc<dyn TokenCache> {
		match &self.token_cache {
			TokenCacheLocation::Memory => Arc::new(MemoryTokenCache::default()),
			TokenCacheLocation::File(path) => Arc::new(FileTokenCache::new(path.clone())),
			TokenCacheLocation::Directory(dir) =>
				Arc::new(FileTokenCache::in_dir(dir, &self.credentials)),
		}
	}
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
	client_id: Option<String>,
	client_secret: Option<Secret>,
	api_endpoint: Option<String>,
	auth_endpoint: Option<String>,
	scopes: Option<String>,
	token_cache: TokenCacheLocation,
	auth_method: ClientAuthMethod,
	expiry_skew: Option<Duration>,
}
impl ClientConfigBuilder {
	/// Sets the OAuth client identifier.
	pub fn client_id(mut self, value: impl Into<String>) -> Self {
		self.client_id = Some(value.into());

		self
	}

	/// Sets the OAuth client secret.
	pub fn client_secret(mut self, value: impl Into<String>) -> Self {
		self.client_secret = Some(Secret::new(value));

		self
	}

	/// Sets the REST API base URL.
	pub fn api_endpoint(mut self, value: impl Into<String>) -> Self {
		self.api_endpoint = Some(value.into());

		self
	}

	/// Sets the token endpoint URL.
	pub fn auth_endpoint(mut self, value: impl Into<String>) -> Self {
		self.auth_endpoint = Some(value.into());

		self
	}

	/// Sets the requested scopes as a space-separated list.
	pub fn scopes(mut self, value: impl Into<String>) -> Self {
		self.scopes = Some(value.into());

		self
	}

	/// Persists tokens to `path`.
	pub fn token_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.token_cache = TokenCacheLocation::File(path.into());

		self
	}

	/// Persists tokens to a fingerprint-named file inside `dir`.
	pub fn token_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.token_cache = TokenCacheLocation::Directory(dir.into());

		self
	}

	/// Overrides the client authentication method (auto-detected by default).
	pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.auth_method = method;

		self
	}

	/// Overrides the expiry skew.
	pub fn expiry_skew(mut self, skew: Duration) -> Self {
		self.expiry_skew = Some(skew);

		self
	}

	/// Validates the settings.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let client_id = self.client_id.ok_or(ConfigError::MissingSetting { name: "client_id" })?;
		let client_id = ClientId::new(client_id.trim())?;
		let client_secret = self
			.client_secret
			.filter(|secret| !secret.is_empty())
			.ok_or(ConfigError::MissingSetting { name: "client_secret" })?;
		let api_endpoint = parse_endpoint(
			"api",
			self.api_endpoint.ok_or(ConfigError::MissingSetting { name: "api_endpoint" })?,
		)?;
		let auth_endpoint = parse_endpoint(
			"auth",
			self.auth_endpoint.ok_or(ConfigError::MissingSetting { name: "auth_endpoint" })?,
		)?;
		let scope = match self.scopes {
			Some(scopes) => scopes.trim().parse::<ScopeSet>()?,
			None => ScopeSet::default(),
		};
		let credentials = Credentials::new(client_id, client_secret.expose(), auth_endpoint)
			.with_scope(scope)
			.with_auth_method(self.auth_method);

		Ok(ClientConfig {
			credentials,
			api_endpoint,
			token_cache: self.token_cache,
			expiry_skew: self.expiry_skew.unwrap_or(DEFAULT_EXPIRY_SKEW),
		})
	}
}

fn parse_endpoint(endpoint: &'static str, raw: String) -> Result<Url, ConfigError> {
	let invalid = |value: String| ConfigError::InvalidEndpoint { endpoint, value };
	let Ok(url) = Url::parse(raw.trim()) else {
		return Err(invalid(raw));
	};

	if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
		return Err(invalid(raw));
	}

	Ok(url)
}
