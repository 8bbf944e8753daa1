mod common;

// std
use std::{fs, sync::Arc};
// crates.io
use time::Duration;
// self
use commerce_transport::{
	auth::Token,
	cache::{FileTokenCache, MemoryTokenCache, TokenCache},
	error::Error,
	source::{CachedTokenSource, SourceState, TokenOrigin},
};
use common::{CountingIssuer, temp_cache_path, token};

fn read_cached(path: &std::path::Path) -> Token {
	let bytes = fs::read(path).expect("Cache file should exist after issuance.");

	serde_json::from_slice(&bytes).expect("Cache file should hold a token record.")
}

#[tokio::test]
async fn valid_token_is_reused_without_issuing() {
	let issuer = CountingIssuer::new(Duration::hours(1));
	let cache = Arc::new(MemoryTokenCache::with_token(token("held", Duration::hours(1))));
	let source = CachedTokenSource::open(issuer.clone(), cache.clone()).await;
	let first = source.token().await.expect("Held token should be returned.");
	let second = source.token().await.expect("Held token should be returned again.");

	assert_eq!(first.access_token.expose(), "held");
	assert_eq!(first, second);
	assert_eq!(issuer.calls(), 0);
	assert_eq!(cache.writes(), 0);
	assert_eq!(source.metrics.reused(), 2);
}

#[tokio::test]
async fn expired_token_is_replaced_once() {
	let path = temp_cache_path("expired");
	let file = FileTokenCache::new(&path);

	file.store(&token("stale", Duration::seconds(-60)))
		.await
		.expect("Seeding the cache file should succeed.");

	let issuer = CountingIssuer::new(Duration::hours(1));
	let source = CachedTokenSource::open(issuer.clone(), Arc::new(file)).await;

	assert_eq!(source.state(), SourceState::Expired);

	let acquired = source.acquire().await.expect("Expired token should be replaced.");

	assert_eq!(acquired.origin, TokenOrigin::Issued);
	assert_eq!(acquired.token.access_token.expose(), "issued-1");
	assert!(acquired.persist_error.is_none());
	assert_eq!(issuer.calls(), 1);
	assert_eq!(read_cached(&path).access_token.expose(), "issued-1");
	assert_eq!(source.state(), SourceState::Valid);

	fs::remove_file(&path).expect("Cache file cleanup should succeed.");
}

#[tokio::test]
async fn new_source_reuses_token_persisted_by_previous_one() {
	let path = temp_cache_path("restart");
	let first_issuer = CountingIssuer::new(Duration::hours(1));
	let first = CachedTokenSource::open(first_issuer.clone(), Arc::new(FileTokenCache::new(&path)))
		.await;
	let issued = first.token().await.expect("First process should issue a token.");

	drop(first);

	let second_issuer = CountingIssuer::new(Duration::hours(1));
	let second =
		CachedTokenSource::open(second_issuer.clone(), Arc::new(FileTokenCache::new(&path))).await;
	let reused = second.token().await.expect("Second process should reuse the cached token.");

	assert_eq!(issued, reused);
	assert_eq!(first_issuer.calls(), 1);
	assert_eq!(second_issuer.calls(), 0);

	fs::remove_file(&path).expect("Cache file cleanup should succeed.");
}

#[tokio::test]
async fn corrupt_cache_file_forces_issuance() {
	let path = temp_cache_path("corrupt");

	fs::write(&path, b"{ this is not json").expect("Writing the corrupt fixture should succeed.");

	let issuer = CountingIssuer::new(Duration::hours(1));
	let source = CachedTokenSource::open(issuer.clone(), Arc::new(FileTokenCache::new(&path))).await;

	assert_eq!(source.state(), SourceState::Expired);

	let token = source.token().await.expect("Issuance should replace the corrupt record.");

	assert_eq!(token.access_token.expose(), "issued-1");
	assert_eq!(issuer.calls(), 1);
	assert_eq!(read_cached(&path), token);

	fs::remove_file(&path).expect("Cache file cleanup should succeed.");
}

#[tokio::test]
async fn empty_cache_issues_persists_and_then_reuses() {
	let path = temp_cache_path("scenario");
	let issuer = CountingIssuer::new(Duration::seconds(3600));
	let source = CachedTokenSource::open(issuer.clone(), Arc::new(FileTokenCache::new(&path))).await;
	let first = source.token().await.expect("Empty cache should trigger issuance.");

	assert_eq!(first.access_token.expose(), "issued-1");
	assert_eq!(read_cached(&path).access_token.expose(), "issued-1");

	let later = source.token().await.expect("Later call should reuse the token.");

	assert_eq!(later.access_token.expose(), "issued-1");
	assert_eq!(issuer.calls(), 1);

	fs::remove_file(&path).expect("Cache file cleanup should succeed.");
}

#[tokio::test]
async fn concurrent_callers_share_one_issuance() {
	let issuer = CountingIssuer::new(Duration::hours(1));
	let cache: Arc<dyn TokenCache> = Arc::new(MemoryTokenCache::default());
	let source = Arc::new(CachedTokenSource::open(issuer.clone(), cache).await);
	let handles = (0..8)
		.map(|_| {
			let source = Arc::clone(&source);

			tokio::spawn(async move { source.token().await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let token = handle
			.await
			.expect("Token task should not panic.")
			.expect("Concurrent acquisition should succeed.");

		assert_eq!(token.access_token.expose(), "issued-1");
	}

	assert_eq!(issuer.calls(), 1);
	assert_eq!(source.metrics.issued(), 1);
	assert_eq!(source.metrics.reused(), 7);
}

#[tokio::test]
async fn issuance_failure_leaves_cache_untouched() {
	let path = temp_cache_path("failure");
	let file = FileTokenCache::new(&path);
	let stale = token("stale", Duration::seconds(-60));

	file.store(&stale).await.expect("Seeding the cache file should succeed.");

	let issuer = CountingIssuer::failing();
	let source = CachedTokenSource::open(issuer.clone(), Arc::new(file)).await;
	let err = source.token().await.expect_err("Failing issuer should surface its error.");

	assert!(matches!(err, Error::InvalidClient { .. }));
	assert_eq!(read_cached(&path), stale);
	assert_eq!(source.state(), SourceState::Expired);
	assert_eq!(source.metrics.failures(), 1);

	fs::remove_file(&path).expect("Cache file cleanup should succeed.");
}

#[tokio::test]
async fn cache_write_failure_still_returns_token() {
	let blocker = temp_cache_path("blocker");

	fs::write(&blocker, b"").expect("Creating the blocking file should succeed.");

	// The parent "directory" is a regular file, so every store fails.
	let cache = Arc::new(FileTokenCache::new(blocker.join("token.json")));
	let issuer = CountingIssuer::new(Duration::hours(1));
	let source = CachedTokenSource::open(issuer.clone(), cache).await;
	let acquired = source.acquire().await.expect("Persistence failure should not fail acquire.");

	assert_eq!(acquired.token.access_token.expose(), "issued-1");
	assert!(acquired.persist_error.is_some());
	assert_eq!(source.metrics.persist_failures(), 1);

	let reused = source.token().await.expect("Held token should be reused.");

	assert_eq!(reused, acquired.token);
	assert_eq!(issuer.calls(), 1);

	fs::remove_file(&blocker).expect("Blocking file cleanup should succeed.");
}
