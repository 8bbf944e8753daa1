//! Drives the full stack against a mock commerce API whose first answer is a `429` with an
//! `X-Ratelimit-Interval` of one second; the transport waits it out and replays the call.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use commerce_transport::{
	client::{ApiClient, JSON_API_MEDIA_TYPE},
	config::ClientConfig,
	http::{RATELIMIT_INTERVAL, ReqwestHttpClient},
	reqwest::{Client, Method},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let throttle_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/markets");
			then.status(429).header(RATELIMIT_INTERVAL, "1");
		})
		.await;
	let config = ClientConfig::builder()
		.client_id("demo-client")
		.client_secret("super-secret")
		.api_endpoint(server.url("/api"))
		.auth_endpoint(server.url("/oauth/token"))
		.build()?;

	// httpmock serves a self-signed certificate.
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client = ApiClient::from_config_with_http_client(config, http_client).await?;
	let request = client.request(Method::GET, "markets")?;
	let (response, _) = tokio::join!(client.send(request), async {
		tokio::time::sleep(Duration::from_millis(300)).await;
		throttle_mock.delete_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/api/markets");
				then.status(200)
					.header("content-type", JSON_API_MEDIA_TYPE)
					.body("{\"data\":[{\"id\":\"demo\",\"type\":\"markets\"}]}");
			})
			.await
	});
	let response = response?;

	println!("Status after throttling: {}.", response.status());
	println!("Body: {}.", response.text().await?);
	println!(
		"Sends: {}, throttled retries: {}.",
		client.transport().metrics.sends(),
		client.transport().metrics.throttled()
	);

	token_mock.assert_async().await;

	Ok(())
}
