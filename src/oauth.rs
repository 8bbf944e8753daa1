//! OAuth 2.0 client-credentials issuer backed by the `oauth2` crate.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientAuthMethod, Credentials, Token, TokenBuilderError},
	error::{ConfigError, TransientError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	source::{IssueFuture, TokenIssuer},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Exchanges [`Credentials`] for a [`Token`] at the token endpoint.
///
/// With [`ClientAuthMethod::AutoDetect`] the first issuance tries HTTP Basic authentication
/// and falls back to form-body credentials when the endpoint answers with anything other than
/// a network failure; the method that worked is remembered for later issuances.
pub struct ClientCredentialsIssuer<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	credentials: Credentials,
	token_url: TokenUrl,
	http_client: Arc<C>,
	detected: Mutex<Option<ClientAuthMethod>>,
}
impl<C> ClientCredentialsIssuer<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an issuer for `credentials` that reaches the token endpoint through
	/// `http_client`.
	pub fn new(credentials: Credentials, http_client: Arc<C>) -> Result<Self> {
		let token_url = TokenUrl::new(credentials.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidTokenUrl { source })?;

		Ok(Self { credentials, token_url, http_client, detected: Mutex::new(None) })
	}

	/// Credentials used for every exchange.
	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Auth method confirmed by a successful auto-detected exchange, if any.
	pub fn detected_auth_method(&self) -> Option<ClientAuthMethod> {
		*self.detected.lock()
	}

	/// Performs one client-credentials exchange.
	pub async fn exchange(&self) -> Result<Token> {
		match self.credentials.auth_method {
			ClientAuthMethod::AutoDetect => self.exchange_detecting().await,
			method => self.exchange_with(method).await,
		}
	}

	async fn exchange_detecting(&self) -> Result<Token> {
		if let Some(method) = self.detected_auth_method() {
			return self.exchange_with(method).await;
		}

		let method = match self.exchange_with(ClientAuthMethod::ClientSecretBasic).await {
			Ok(token) => {
				*self.detected.lock() = Some(ClientAuthMethod::ClientSecretBasic);

				return Ok(token);
			},
			Err(e @ Error::Transport(_)) => return Err(e),
			Err(_) => ClientAuthMethod::ClientSecretPost,
		};
		let token = self.exchange_with(method).await?;

		*self.detected.lock() = Some(method);

		Ok(token)
	}

	async fn exchange_with(&self, method: ClientAuthMethod) -> Result<Token> {
		let meta = ResponseMetadataSlot::default();
		let oauth_client = self.oauth_client(method);
		let instrumented = self.http_client.with_metadata(meta.clone());
		let mut request = oauth_client.exchange_client_credentials();

		for scope in self.credentials.scope.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		map_token_response(meta.take(), response)
	}

	fn oauth_client(&self, method: ClientAuthMethod) -> ConfiguredBasicClient {
		let client = BasicClient::new(OAuthClientId::new(self.credentials.client_id.to_string()))
			.set_client_secret(ClientSecret::new(
				self.credentials.client_secret.expose().to_owned(),
			))
			.set_token_uri(self.token_url.clone());

		if matches!(method, ClientAuthMethod::ClientSecretPost) {
			client.set_auth_type(AuthType::RequestBody)
		} else {
			client
		}
	}
}
impl<C> TokenIssuer for ClientCredentialsIssuer<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn issue(&self) -> IssueFuture<'_> {
		Box::pin(self.exchange())
	}
}
impl<C> Debug for ClientCredentialsIssuer<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsIssuer")
			.field("credentials", &self.credentials)
			.field("detected", &self.detected_auth_method())
			.finish()
	}
}

fn map_token_response(
	meta: Option<ResponseMetadata>,
	response: BasicTokenResponse,
) -> Result<Token> {
	if response.access_token().secret().is_empty() {
		return Err(TransientError::TokenEndpoint {
			message: "Token response carried an empty access_token.".into(),
			status: meta_status(meta.as_ref()),
			retry_after: None,
		}
		.into());
	}

	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let mut builder = Token::builder()
		.access_token(response.access_token().secret().to_owned())
		.token_type(response.token_type().as_ref())
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in));

	if let Some(refresh) = response.refresh_token() {
		builder = builder.refresh_token(refresh.secret().to_owned());
	}

	builder.build().map_err(|err| match err {
		TokenBuilderError::ExpiryOutOfRange => ConfigError::ExpiresInOutOfRange.into(),
		err => ConfigError::from(err).into(),
	})
}

fn map_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(response, meta_ref),
		RequestTokenError::Request(error) => map_transport_error(meta_ref, error),
		RequestTokenError::Parse(error, _body) =>
			TransientError::TokenResponseParse { source: error, status: meta_status(meta_ref) }
				.into(),
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message,
			status: meta_status(meta_ref),
			retry_after: meta_retry_after(meta_ref),
		}
		.into(),
	}
}

fn map_server_response_error(response: BasicErrorResponse, meta: Option<&ResponseMetadata>) -> Error {
	let code = response.error().as_ref().to_string();
	let reason = match response.error_description() {
		Some(description) => format!("{code}: {description}"),
		None => code.clone(),
	};

	match code.to_ascii_lowercase().as_str() {
		"invalid_client" | "unauthorized_client" => Error::InvalidClient { reason },
		"invalid_grant" | "access_denied" => Error::InvalidGrant { reason },
		"invalid_scope" | "insufficient_scope" => Error::InsufficientScope { reason },
		_ => TransientError::TokenEndpoint {
			message: format!("OAuth error {reason}"),
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn map_transport_error<E>(meta: Option<&ResponseMetadata>, err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransientError::TokenEndpoint {
			message: format!("HTTP client error: {message}"),
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
		_ => TransientError::TokenEndpoint {
			message: "HTTP client error".into(),
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<std::time::Duration> {
	meta.and_then(|value| value.retry_after)
}
