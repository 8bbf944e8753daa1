//! Reusable, persisted access-token source.
//!
//! [`CachedTokenSource`] hands out the held token while it is valid and only calls its
//! [`TokenIssuer`] once the token is missing or expired. Every freshly issued token is written
//! to the [`TokenCache`] so the next process start can pick it up instead of re-issuing. The
//! whole check-issue-persist sequence runs under one async mutex: concurrent callers that find
//! the token expired wait for the in-flight issuance and then reuse its result.

mod metrics;

pub use metrics::SourceMetrics;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	auth::Token,
	cache::{CacheError, TokenCache},
	oauth::ClientCredentialsIssuer,
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Safety margin subtracted from the expiry before a token counts as expired.
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::seconds(10);

/// Boxed future returned by [`TokenIssuer::issue`].
pub type IssueFuture<'a> = Pin<Box<dyn Future<Output = Result<Token>> + 'a + Send>>;

/// Primary token-issuing function wrapped by [`CachedTokenSource`].
pub trait TokenIssuer
where
	Self: Send + Sync,
{
	/// Obtains a brand-new token from the authorization server.
	fn issue(&self) -> IssueFuture<'_>;
}

/// Where the token returned by [`CachedTokenSource::acquire`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenOrigin {
	/// The held token was still valid.
	Held,
	/// The issuer was called.
	Issued,
}

/// Observable state of a [`CachedTokenSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceState {
	/// A valid token is held.
	Valid,
	/// No token, or the held token has expired.
	Expired,
	/// An issuance is in flight.
	Refreshing,
}

/// Token returned by [`CachedTokenSource::acquire`] together with how it was obtained.
#[derive(Debug)]
pub struct AcquiredToken {
	/// Token ready for use.
	pub token: Token,
	/// Whether the token was reused or freshly issued.
	pub origin: TokenOrigin,
	/// Cache write failure for a freshly issued token, if any.
	pub persist_error: Option<CacheError>,
}

/// Reuse-while-valid token source persisted to a [`TokenCache`].
pub struct CachedTokenSource<I = ClientCredentialsIssuer>
where
	I: ?Sized + TokenIssuer,
{
	issuer: Arc<I>,
	cache: Arc<dyn TokenCache>,
	held: AsyncMutex<Option<Token>>,
	held_expiry: RwLock<Option<OffsetDateTime>>,
	refreshing: AtomicBool,
	expiry_skew: Duration,
	/// Counters for issuance, reuse, and persistence outcomes.
	pub metrics: Arc<SourceMetrics>,
}
impl<I> CachedTokenSource<I>
where
	I: ?Sized + TokenIssuer,
{
	/// Creates a source over `cache`, seeding it with whatever token the cache holds.
	///
	/// A missing, blank, or unreadable cache is not an error: the source starts empty and the
	/// first [`token`](Self::token) call issues.
	pub async fn open(issuer: Arc<I>, cache: Arc<dyn TokenCache>) -> Self {
		let held = match cache.load().await {
			Ok(token) => token,
			Err(e) => {
				obs::cache_recovered(&e);

				None
			},
		};
		let held_expiry = held.as_ref().and_then(usable_expiry);

		Self {
			issuer,
			cache,
			held: AsyncMutex::new(held),
			held_expiry: RwLock::new(held_expiry),
			refreshing: AtomicBool::new(false),
			expiry_skew: DEFAULT_EXPIRY_SKEW,
			metrics: Default::default(),
		}
	}

	/// Overrides the expiry skew (negative values clamp to zero).
	pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
		self.expiry_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Configured expiry skew.
	pub fn expiry_skew(&self) -> Duration {
		self.expiry_skew
	}

	/// Returns a currently valid token, issuing and persisting a new one when needed.
	pub async fn token(&self) -> Result<Token> {
		self.acquire().await.map(|acquired| acquired.token)
	}

	/// Like [`token`](Self::token), additionally reporting the origin and any cache write
	/// failure.
	///
	/// Issuance failures leave both the held token and the cache untouched. A cache write
	/// failure does not fail the call: the new token is held and returned, and the error is
	/// reported in [`AcquiredToken::persist_error`].
	pub async fn acquire(&self) -> Result<AcquiredToken> {
		const KIND: OpKind = OpKind::TokenAcquire;

		let span = OpSpan::new(KIND, "acquire");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.acquire_locked()).await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Current state; `Valid` decays to `Expired` purely with the passage of time.
	pub fn state(&self) -> SourceState {
		self.state_at(OffsetDateTime::now_utc())
	}

	/// State as observed at `instant`.
	pub fn state_at(&self, instant: OffsetDateTime) -> SourceState {
		if self.refreshing.load(Ordering::Acquire) {
			return SourceState::Refreshing;
		}

		match (*self.held_expiry.read()).and_then(|expiry| expiry.checked_sub(self.expiry_skew)) {
			Some(limit) if instant < limit => SourceState::Valid,
			_ => SourceState::Expired,
		}
	}

	async fn acquire_locked(&self) -> Result<AcquiredToken> {
		let mut held = self.held.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(token) = held.as_ref().filter(|token| token.is_valid_at(now, self.expiry_skew))
		{
			self.metrics.record_reused();

			return Ok(AcquiredToken {
				token: token.clone(),
				origin: TokenOrigin::Held,
				persist_error: None,
			});
		}

		let issued = {
			let _refreshing = RefreshingFlag::raise(&self.refreshing);

			self.issuer.issue().await
		};
		let token = issued.inspect_err(|_| self.metrics.record_failure())?;

		self.metrics.record_issued();
		obs::token_issued(token.expiry);

		let persist_error = self.cache.store(&token).await.err();

		if let Some(e) = &persist_error {
			self.metrics.record_persist_failure();
			obs::persist_failed(e);
		}

		*self.held_expiry.write() = usable_expiry(&token);
		*held = Some(token.clone());

		Ok(AcquiredToken { token, origin: TokenOrigin::Issued, persist_error })
	}
}
impl<I> Debug for CachedTokenSource<I>
where
	I: ?Sized + TokenIssuer,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedTokenSource")
			.field("state", &self.state())
			.field("expiry_skew", &self.expiry_skew)
			.finish()
	}
}

/// Keeps [`SourceState::Refreshing`] visible for exactly as long as an issuance is in flight,
/// including when the acquiring future is dropped mid-issuance.
struct RefreshingFlag<'a>(&'a AtomicBool);
impl<'a> RefreshingFlag<'a> {
	fn raise(flag: &'a AtomicBool) -> Self {
		flag.store(true, Ordering::Release);

		Self(flag)
	}
}
impl Drop for RefreshingFlag<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

fn usable_expiry(token: &Token) -> Option<OffsetDateTime> {
	(!token.access_token.is_empty()).then_some(token.expiry)
}
