mod common;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
// self
use commerce_transport::{
	auth::{ClientAuthMethod, ScopeSet},
	error::{ConfigError, Error, TransientError, TransportError},
	oauth::ClientCredentialsIssuer,
	source::TokenIssuer,
};
use common::{BASIC_AUTHORIZATION, credentials, test_reqwest_http_client, token_body};

fn issuer(server: &MockServer, method: ClientAuthMethod) -> ClientCredentialsIssuer {
	ClientCredentialsIssuer::new(
		credentials(&server.url("/oauth/token")).with_auth_method(method),
		Arc::new(test_reqwest_http_client()),
	)
	.expect("Issuer should build for the mock token endpoint.")
}

#[tokio::test]
async fn basic_auth_exchange_returns_token() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("authorization", BASIC_AUTHORIZATION)
				.header("content-type", "application/x-www-form-urlencoded")
				.body_includes("grant_type=client_credentials")
				.body_includes("scope=market%3A1+market%3A2");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("basic-token", 7200));
		})
		.await;
	let issuer = ClientCredentialsIssuer::new(
		credentials(&server.url("/oauth/token"))
			.with_auth_method(ClientAuthMethod::ClientSecretBasic)
			.with_scope(
				ScopeSet::new(["market:2", "market:1"]).expect("Scope fixture should be valid."),
			),
		Arc::new(test_reqwest_http_client()),
	)
	.expect("Issuer should build for the mock token endpoint.");
	let token = issuer.issue().await.expect("Basic exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(token.access_token.expose(), "basic-token");
	assert_eq!(token.auth_scheme(), "Bearer");
	assert!(token.refresh_token.is_none());
	assert!(token.is_valid(time::Duration::seconds(10)));
}

#[tokio::test]
async fn post_auth_sends_credentials_in_body() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.body_includes("client_id=client-id")
				.body_includes("client_secret=secret");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("post-token", 7200));
		})
		.await;
	let token = issuer(&server, ClientAuthMethod::ClientSecretPost)
		.issue()
		.await
		.expect("Post exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(token.access_token.expose(), "post-token");
}

#[tokio::test]
async fn auto_detect_falls_back_to_post_and_remembers() {
	let server = MockServer::start_async().await;
	let basic = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token").header("authorization", BASIC_AUTHORIZATION);
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let post = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token").body_includes("client_secret=secret");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("detected-token", 7200));
		})
		.await;
	let issuer = issuer(&server, ClientAuthMethod::AutoDetect);
	let first = issuer.issue().await.expect("Fallback to form credentials should succeed.");

	assert_eq!(first.access_token.expose(), "detected-token");
	assert_eq!(issuer.detected_auth_method(), Some(ClientAuthMethod::ClientSecretPost));

	issuer.issue().await.expect("Remembered method should succeed.");

	basic.assert_calls_async(1).await;
	post.assert_calls_async(2).await;
}

#[tokio::test]
async fn oauth_error_codes_are_classified() {
	let cases = [
		("{\"error\":\"invalid_grant\",\"error_description\":\"revoked\"}", 400),
		("{\"error\":\"invalid_scope\"}", 400),
		("{\"error\":\"unauthorized_client\"}", 401),
	];

	for (body, status) in cases {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(POST).path("/oauth/token");
				then.status(status).header("content-type", "application/json").body(body);
			})
			.await;

		let err = issuer(&server, ClientAuthMethod::ClientSecretPost)
			.issue()
			.await
			.expect_err("Error responses should fail issuance.");

		match status {
			401 => assert!(matches!(err, Error::InvalidClient { .. }), "body: {body}"),
			_ if body.contains("invalid_grant") => {
				assert!(matches!(&err, Error::InvalidGrant { reason } if reason.contains("revoked")));
			},
			_ => assert!(matches!(err, Error::InsufficientScope { .. }), "body: {body}"),
		}
	}
}

#[tokio::test]
async fn unexpected_error_carries_status_and_interval() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(503)
				.header("content-type", "application/json")
				.header("x-ratelimit-interval", "7")
				.body("{\"error\":\"temporarily_unavailable\"}");
		})
		.await;

	let err = issuer(&server, ClientAuthMethod::ClientSecretPost)
		.issue()
		.await
		.expect_err("Unavailable endpoint should fail issuance.");

	match err {
		Error::Transient(TransientError::TokenEndpoint { status, retry_after, .. }) => {
			assert_eq!(status, Some(503));
			assert_eq!(retry_after, Some(StdDuration::from_secs(7)));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn malformed_success_body_is_transient() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body("{\"access_token\":");
		})
		.await;

	let err = issuer(&server, ClientAuthMethod::ClientSecretPost)
		.issue()
		.await
		.expect_err("Malformed JSON should fail issuance.");

	assert!(matches!(
		err,
		Error::Transient(TransientError::TokenResponseParse { status: Some(200), .. })
	));
}

#[tokio::test]
async fn empty_access_token_is_rejected() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(token_body("", 3600));
		})
		.await;

	let err = issuer(&server, ClientAuthMethod::ClientSecretPost)
		.issue()
		.await
		.expect_err("An empty access token should fail issuance.");

	assert!(matches!(
		err,
		Error::Transient(TransientError::TokenEndpoint { status: Some(200), .. })
	));
}

#[tokio::test]
async fn missing_or_invalid_expiry_is_a_config_error() {
	let cases = [
		("{\"access_token\":\"a\",\"token_type\":\"bearer\"}", "missing"),
		("{\"access_token\":\"a\",\"token_type\":\"bearer\",\"expires_in\":0}", "zero"),
		(
			"{\"access_token\":\"a\",\"token_type\":\"bearer\",\"expires_in\":1000000000000}",
			"overflow",
		),
	];

	for (body, label) in cases {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(POST).path("/oauth/token");
				then.status(200).header("content-type", "application/json").body(body);
			})
			.await;

		let err = issuer(&server, ClientAuthMethod::ClientSecretPost)
			.issue()
			.await
			.expect_err("Unusable expiry should fail issuance.");

		match label {
			"missing" => assert!(matches!(err, Error::Config(ConfigError::MissingExpiresIn))),
			"overflow" => assert!(matches!(err, Error::Config(ConfigError::ExpiresInOutOfRange))),
			_ => assert!(matches!(err, Error::Config(ConfigError::NonPositiveExpiresIn))),
		}
	}
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
	let issuer = ClientCredentialsIssuer::new(
		credentials("http://127.0.0.1:9/oauth/token"),
		Arc::new(test_reqwest_http_client()),
	)
	.expect("Issuer should build for a syntactically valid endpoint.");
	let err = issuer.issue().await.expect_err("Connection refusal should fail issuance.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	assert!(issuer.detected_auth_method().is_none());
}
