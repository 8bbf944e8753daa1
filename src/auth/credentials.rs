//! Client credentials supplied once at start-up.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, Secret},
};

/// How the client authenticates against the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic authentication (`client_secret_basic`).
	ClientSecretBasic,
	/// Credentials sent in the form body (`client_secret_post`).
	ClientSecretPost,
	/// Try Basic first, fall back to the form body when the endpoint rejects the client, and
	/// remember whichever method succeeded.
	#[default]
	AutoDetect,
}

/// Immutable client-credentials record.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// OAuth client secret.
	pub client_secret: Secret,
	/// Token endpoint receiving the client-credentials grant.
	pub token_endpoint: Url,
	/// Scopes requested with every grant; may be empty.
	pub scope: ScopeSet,
	/// Client authentication method.
	pub auth_method: ClientAuthMethod,
}
impl Credentials {
	/// Creates credentials with an empty scope set and automatic auth-method detection.
	pub fn new(client_id: ClientId, client_secret: impl Into<String>, token_endpoint: Url) -> Self {
		Self {
			client_id,
			client_secret: Secret::new(client_secret),
			token_endpoint,
			scope: ScopeSet::default(),
			auth_method: ClientAuthMethod::default(),
		}
	}

	/// Replaces the requested scopes.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Overrides the client authentication method.
	pub fn with_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.auth_method = method;

		self
	}

	/// Stable, filename-safe fingerprint of the client id, token endpoint, and scopes.
	///
	/// The secret is excluded so rotating it keeps reusing the same cache slot.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.client_id.as_bytes());
		hasher.update(b"\n");
		hasher.update(self.token_endpoint.as_str().as_bytes());
		hasher.update(b"\n");
		hasher.update(self.scope.normalized().as_bytes());

		URL_SAFE_NO_PAD.encode(hasher.finalize())
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("scope", &self.scope)
			.field("auth_method", &self.auth_method)
			.finish()
	}
}
