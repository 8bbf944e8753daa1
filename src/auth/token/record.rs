//! Issued bearer token record, validity checks, and builder.

// self
use crate::{_prelude::*, auth::token::secret::Secret};

/// Lifecycle status of a [`Token`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Access token is empty (placeholder record).
	Empty,
	/// Token is usable.
	Active,
	/// Token reached its expiry, or falls inside the safety skew.
	Expired,
}

/// Errors produced by [`TokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when `expires_in` pushes the expiry past the representable date range.
	#[error("Expiry is outside the supported date range.")]
	ExpiryOutOfRange,
}

/// Issued bearer credential as persisted in the token cache.
///
/// The serialized form is a single JSON object with `access_token`, `token_type`, optional
/// `refresh_token`, and an RFC 3339 `expiry`. Unknown fields are ignored when reading so cache
/// files written by other OAuth tooling load as well.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Access token secret; callers must avoid logging it.
	pub access_token: Secret,
	/// Token type reported by the endpoint (usually `Bearer`).
	#[serde(default)]
	pub token_type: String,
	/// Refresh token, if the endpoint issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<Secret>,
	/// Absolute expiry instant.
	#[serde(with = "time::serde::rfc3339")]
	pub expiry: OffsetDateTime,
}
impl Token {
	/// Returns a builder for constructing token records.
	pub fn builder() -> TokenBuilder {
		TokenBuilder::default()
	}

	/// Computes the lifecycle status at `instant`, treating the last `skew` before expiry as
	/// already expired.
	pub fn status_at(&self, instant: OffsetDateTime, skew: Duration) -> TokenStatus {
		if self.access_token.is_empty() {
			return TokenStatus::Empty;
		}

		// An expiry too close to the minimum date to subtract the skew from is already past.
		match self.expiry.checked_sub(skew) {
			Some(limit) if instant < limit => TokenStatus::Active,
			_ => TokenStatus::Expired,
		}
	}

	/// Returns `true` if the token may be used at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime, skew: Duration) -> bool {
		matches!(self.status_at(instant, skew), TokenStatus::Active)
	}

	/// Returns `true` if the token may be used right now.
	pub fn is_valid(&self, skew: Duration) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc(), skew)
	}

	/// Authorization scheme derived from the token type.
	///
	/// Endpoints commonly answer with a lower-case `bearer`; the canonical capitalization is
	/// returned for the well-known schemes, and an empty type defaults to `Bearer`.
	pub fn auth_scheme(&self) -> &str {
		let kind = self.token_type.as_str();

		if kind.is_empty() || kind.eq_ignore_ascii_case("bearer") {
			"Bearer"
		} else if kind.eq_ignore_ascii_case("mac") {
			"MAC"
		} else if kind.eq_ignore_ascii_case("basic") {
			"Basic"
		} else {
			kind
		}
	}

	/// Full `Authorization` header value (`<scheme> <access token>`).
	pub fn authorization_value(&self) -> String {
		format!("{} {}", self.auth_scheme(), self.access_token.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expiry", &self.expiry)
			.finish()
	}
}

/// Builder for [`Token`].
#[derive(Clone, Debug, Default)]
pub struct TokenBuilder {
	access_token: Option<Secret>,
	token_type: Option<String>,
	refresh_token: Option<Secret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(Secret::new(token));

		self
	}

	/// Provides the token type (defaults to `Bearer`).
	pub fn token_type(mut self, kind: impl Into<String>) -> Self {
		self.token_type = Some(kind.into());

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(Secret::new(token));

		self
	}

	/// Sets the instant `expires_in` is measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Token`].
	pub fn build(self) -> Result<Token, TokenBuilderError> {
		let access_token = self.access_token.ok_or(TokenBuilderError::MissingAccessToken)?;
		let expiry = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => self
				.issued_at
				.unwrap_or_else(OffsetDateTime::now_utc)
				.checked_add(delta)
				.ok_or(TokenBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(TokenBuilderError::MissingExpiry),
		};

		Ok(Token {
			access_token,
			token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
			refresh_token: self.refresh_token,
			expiry,
		})
	}
}
