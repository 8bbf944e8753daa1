//! Request signing contracts that attach issued tokens to outbound requests.

// crates.io
use reqwest::{
	Request,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{_prelude::*, auth::Token, error::ConfigError};

/// Describes how to attach a [`Token`] to an outbound request without constraining the HTTP
/// client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects authorization state derived from `token`.
	fn attach_token(&self, request: Request, token: &Token) -> Result<Request, Error>;
}

/// Sets `Authorization: <scheme> <access token>` on a [`reqwest::Request`], replacing any
/// value already present.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl RequestSignerExt<Request, Error> for BearerSigner {
	fn attach_token(&self, mut request: Request, token: &Token) -> Result<Request> {
		let mut value = HeaderValue::from_str(&token.authorization_value())
			.map_err(|_| ConfigError::InvalidAuthorizationHeader)?;

		value.set_sensitive(true);
		request.headers_mut().insert(AUTHORIZATION, value);

		Ok(request)
	}
}
