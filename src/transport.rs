//! Rate-limit-aware request dispatch.
//!
//! [`RateLimitedTransport`] funnels every request through one async lock shared by all of its
//! clones. A `429 Too Many Requests` response carrying [`RATELIMIT_INTERVAL`] is dropped, the
//! advertised number of seconds is slept while the lock is still held, and the same request
//! is sent again. Any other response, including a `429` without a usable interval, is handed
//! back to the caller untouched.

mod metrics;

pub use metrics::TransportMetrics;

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{Request, Response, StatusCode};
// self
use crate::{
	_prelude::*,
	error::TransportError,
	http::{RATELIMIT_INTERVAL, ReqwestHttpClient, parse_ratelimit_interval},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Boxed future returned by [`HttpSend::send`].
pub type SendFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Response, TransportError>> + 'a + Send>>;

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Underlying send function wrapped by [`RateLimitedTransport`].
pub trait HttpSend
where
	Self: Send + Sync,
{
	/// Sends one request and resolves with whatever the server answered.
	fn send(&self, request: Request) -> SendFuture<'_>;
}
impl HttpSend for ReqwestHttpClient {
	fn send(&self, request: Request) -> SendFuture<'_> {
		Box::pin(async move { self.execute(request).await.map_err(TransportError::from) })
	}
}

/// Waits out a rate-limit interval.
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Completes after `duration` has elapsed.
	fn sleep(&self, duration: StdDuration) -> SleepFuture<'_>;
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
impl Sleeper for TokioSleeper {
	fn sleep(&self, duration: StdDuration) -> SleepFuture<'_> {
		Box::pin(tokio::time::sleep(duration))
	}
}

/// Serializing, `429`-replaying wrapper around an [`HttpSend`].
///
/// Cloning is cheap and every clone shares the same lock, so one transport handle can be
/// passed to any number of tasks while still issuing a single request at a time. There is no
/// retry ceiling: callers that need one should race [`send`](Self::send) against their own
/// deadline, dropping the future releases the lock.
pub struct RateLimitedTransport<S = ReqwestHttpClient, Z = TokioSleeper>
where
	S: ?Sized + HttpSend,
	Z: ?Sized + Sleeper,
{
	sender: Arc<S>,
	sleeper: Arc<Z>,
	gate: Arc<AsyncMutex<()>>,
	/// Counters for sends and throttled retries, shared between clones.
	pub metrics: Arc<TransportMetrics>,
}
impl<S> RateLimitedTransport<S>
where
	S: ?Sized + HttpSend,
{
	/// Wraps `sender`, sleeping on the tokio timer between throttled attempts.
	pub fn new(sender: Arc<S>) -> Self {
		Self {
			sender,
			sleeper: Arc::new(TokioSleeper),
			gate: Default::default(),
			metrics: Default::default(),
		}
	}
}
impl<S, Z> RateLimitedTransport<S, Z>
where
	S: ?Sized + HttpSend,
	Z: ?Sized + Sleeper,
{
	/// Replaces the sleeper used between throttled attempts.
	pub fn with_sleeper<Z2>(self, sleeper: Arc<Z2>) -> RateLimitedTransport<S, Z2>
	where
		Z2: ?Sized + Sleeper,
	{
		RateLimitedTransport {
			sender: self.sender,
			sleeper,
			gate: self.gate,
			metrics: self.metrics,
		}
	}

	/// Underlying send function.
	pub fn sender(&self) -> &S {
		&self.sender
	}

	/// Sends `request` once no other request is in flight, replaying it for as long as the
	/// server throttles it with a parseable interval.
	///
	/// Transport failures are returned immediately without a retry. A request whose body
	/// cannot be cloned is sent exactly once.
	pub async fn send(&self, request: Request) -> Result<Response> {
		const KIND: OpKind = OpKind::ThrottledSend;

		let span = OpSpan::new(KIND, "send");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.send_locked(request)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	async fn send_locked(&self, mut request: Request) -> Result<Response> {
		let _gate = self.gate.lock().await;
		let mut retry = 0_u32;

		loop {
			let replay = request.try_clone();

			self.metrics.record_send();

			let response = self.sender.send(request).await?;

			if response.status() != StatusCode::TOO_MANY_REQUESTS {
				return Ok(response);
			}

			let Some(interval) = parse_ratelimit_interval(response.headers()) else {
				obs::throttled_without_interval(response.status().as_u16());

				return Ok(response);
			};
			let Some(next) = replay else {
				obs::unreplayable_request();

				return Ok(response);
			};

			drop(response);

			retry = retry.saturating_add(1);

			self.metrics.record_throttled();
			obs::record_op_outcome(OpKind::ThrottledSend, OpOutcome::Throttled);
			obs::throttled(retry, interval);

			self.sleeper.sleep(interval).await;

			request = next;
		}
	}
}
impl<S, Z> Clone for RateLimitedTransport<S, Z>
where
	S: ?Sized + HttpSend,
	Z: ?Sized + Sleeper,
{
	fn clone(&self) -> Self {
		Self {
			sender: Arc::clone(&self.sender),
			sleeper: Arc::clone(&self.sleeper),
			gate: Arc::clone(&self.gate),
			metrics: Arc::clone(&self.metrics),
		}
	}
}
impl<S, Z> Debug for RateLimitedTransport<S, Z>
where
	S: ?Sized + HttpSend,
	Z: ?Sized + Sleeper,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimitedTransport")
			.field("header", &RATELIMIT_INTERVAL)
			.field("metrics", &self.metrics)
			.finish()
	}
}
