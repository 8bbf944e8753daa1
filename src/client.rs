//! Explicitly owned API client composing the token source and the rate-limited transport.

// crates.io
use reqwest::{
	Method, Request, RequestBuilder, Response,
	header::{ACCEPT, CONTENT_TYPE, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::ConfigError,
	ext::{BearerSigner, RequestSignerExt},
	http::ReqwestHttpClient,
	oauth::ClientCredentialsIssuer,
	source::{CachedTokenSource, TokenIssuer},
	transport::{RateLimitedTransport, Sleeper, TokioSleeper},
};

/// JSON:API media type expected by the commerce REST API.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Authenticated, throttling-aware client rooted at the API endpoint.
///
/// Every request is signed with the current token from the [`CachedTokenSource`] and then
/// dispatched through the [`RateLimitedTransport`]. A token failure aborts the call before
/// anything is sent.
pub struct ApiClient<I = ClientCredentialsIssuer, Z = TokioSleeper>
where
	I: ?Sized + TokenIssuer,
	Z: ?Sized + Sleeper,
{
	api_endpoint: Url,
	token_source: Arc<CachedTokenSource<I>>,
	transport: RateLimitedTransport<ReqwestHttpClient, Z>,
	signer: BearerSigner,
}
impl ApiClient {
	/// Builds the whole stack from `config` with a default HTTP client.
	pub async fn from_config(config: ClientConfig) -> Result<Self> {
		Self::from_config_with_http_client(config, ReqwestHttpClient::default()).await
	}

	/// Builds the whole stack from `config`, sharing `http_client` between the token exchange
	/// and API traffic.
	pub async fn from_config_with_http_client(
		config: ClientConfig,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		let http_client = Arc::new(http_client);
		let cache = config.open_token_cache();
		let issuer = ClientCredentialsIssuer::new(config.credentials, http_client.clone())?;
		let token_source = CachedTokenSource::open(Arc::new(issuer), cache)
			.await
			.with_expiry_skew(config.expiry_skew);

		Ok(Self::new(config.api_endpoint, Arc::new(token_source), RateLimitedTransport::new(http_client)))
	}
}
impl<I, Z> ApiClient<I, Z>
where
	I: ?Sized + TokenIssuer,
	Z: ?Sized + Sleeper,
{
	/// Assembles a client from already constructed parts.
	pub fn new(
		mut api_endpoint: Url,
		token_source: Arc<CachedTokenSource<I>>,
		transport: RateLimitedTransport<ReqwestHttpClient, Z>,
	) -> Self {
		if !api_endpoint.path().ends_with('/') {
			let path = format!("{}/", api_endpoint.path());

			api_endpoint.set_path(&path);
		}

		Self { api_endpoint, token_source, transport, signer: BearerSigner }
	}

	/// Base URL request paths are resolved against (always ends with `/`).
	pub fn api_endpoint(&self) -> &Url {
		&self.api_endpoint
	}

	/// Token source shared by every request.
	pub fn token_source(&self) -> &Arc<CachedTokenSource<I>> {
		&self.token_source
	}

	/// Transport every request is dispatched through.
	pub fn transport(&self) -> &RateLimitedTransport<ReqwestHttpClient, Z> {
		&self.transport
	}

	/// Resolves `path` below the API endpoint; a leading `/` does not escape the base path.
	pub fn url(&self, path: &str) -> Result<Url> {
		self.api_endpoint.join(path.trim_start_matches('/')).map_err(|_| {
			ConfigError::InvalidEndpoint { endpoint: "request", value: path.to_owned() }.into()
		})
	}

	/// Starts a request for `path` relative to the API endpoint.
	pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
		Ok(self.transport.sender().request(method, self.url(path)?))
	}

	/// Builds, signs, and dispatches `request`.
	pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
		let request = request.build().map_err(|source| ConfigError::InvalidRequest { source })?;

		self.execute(request).await
	}

	/// Signs and dispatches an already built request.
	pub async fn execute(&self, request: Request) -> Result<Response> {
		let token = self.token_source.token().await?;
		let mut request = self.signer.attach_token(request, &token)?;

		apply_media_type(&mut request);

		self.transport.send(request).await
	}
}
impl<I, Z> Clone for ApiClient<I, Z>
where
	I: ?Sized + TokenIssuer,
	Z: ?Sized + Sleeper,
{
	fn clone(&self) -> Self {
		Self {
			api_endpoint: self.api_endpoint.clone(),
			token_source: Arc::clone(&self.token_source),
			transport: self.transport.clone(),
			signer: self.signer,
		}
	}
}
impl<I, Z> Debug for ApiClient<I, Z>
where
	I: ?Sized + TokenIssuer,
	Z: ?Sized + Sleeper,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("api_endpoint", &self.api_endpoint.as_str())
			.field("token_source", &self.token_source)
			.field("transport", &self.transport)
			.finish()
	}
}

fn apply_media_type(request: &mut Request) {
	let has_body = request.body().is_some();
	let headers = request.headers_mut();

	if !headers.contains_key(ACCEPT) {
		headers.insert(ACCEPT, HeaderValue::from_static(JSON_API_MEDIA_TYPE));
	}
	if has_body && !headers.contains_key(CONTENT_TYPE) {
		headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_API_MEDIA_TYPE));
	}
}
