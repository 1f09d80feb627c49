//! Retry wrapper around any transport.
//!
//! # Design
//! `RetryTransport` is itself a `Transport`, so it composes with anything.
//! It retries on transport failures and on statuses listed in the policy,
//! with exponential backoff plus uniform jitter. It does not look at the
//! method unless `RetryPolicy::idempotent_only` is set: wrapping a transport
//! is the caller's opt-in to retrying POST/PUT/PATCH/DELETE.
//!
//! Cancellation-class failures are never retried. With a cancellation token
//! attached, the token is checked before every attempt and raced against
//! every inner call and every sleep.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{is_cancellation, BoxError, NetworkError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Statuses retried by default: timeout, rate limit and transient server errors.
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// How many retries, how long to wait, and which statuses trigger a retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub jitter: Duration,
    pub retry_on_status_codes: HashSet<u16>,
    /// Restrict retries to idempotent methods. Off by default.
    pub idempotent_only: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(300),
            jitter: Duration::from_millis(100),
            retry_on_status_codes: DEFAULT_RETRY_STATUS_CODES.into_iter().collect(),
            idempotent_only: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, jitter: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            jitter,
            ..Self::default()
        }
    }

    pub fn retry_on(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retry_on_status_codes = codes.into_iter().collect();
        self
    }

    pub fn idempotent_only(mut self, enabled: bool) -> Self {
        self.idempotent_only = enabled;
        self
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retry_on_status_codes.contains(&status)
    }

    /// Delay before the `attempt`-th retry (1-based):
    /// `base_delay * 2^(attempt - 1) + uniform(0, jitter)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base = self.base_delay.as_secs_f64() * 2f64.powi(exponent);
        let jitter = if self.jitter.is_zero() {
            0.0
        } else {
            self.jitter.as_secs_f64() * rand::thread_rng().gen::<f64>()
        };
        Duration::try_from_secs_f64(base + jitter).unwrap_or(Duration::MAX)
    }
}

/// Future returned by a sleep function.
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Injectable sleep, so tests can skip real waiting.
pub type SleepFn = Arc<dyn Fn(Duration) -> SleepFuture + Send + Sync>;

fn cancelled() -> BoxError {
    Box::new(NetworkError::Cancelled)
}

fn tokio_sleep() -> SleepFn {
    Arc::new(|delay| Box::pin(tokio::time::sleep(delay)))
}

/// Wraps another transport and retries failed requests with exponential backoff.
pub struct RetryTransport<T> {
    inner: T,
    policy: RetryPolicy,
    sleep: SleepFn,
    cancel: Option<CancellationToken>,
}

impl<T> fmt::Debug for RetryTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTransport")
            .field("policy", &self.policy)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> RetryTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            sleep: tokio_sleep(),
            cancel: None,
        }
    }

    /// Replaces the sleep used between attempts.
    pub fn with_sleep<F, Fut>(mut self, sleep: F) -> Self
    where
        F: Fn(Duration) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.sleep = Arc::new(move |delay| Box::pin(sleep(delay)));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn max_retries_for(&self, request: &HttpRequest) -> u32 {
        if self.policy.idempotent_only && !request.method.is_idempotent() {
            0
        } else {
            self.policy.max_retries
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(cancelled()),
                outcome = self.inner.send(request) => outcome,
            },
            None => self.inner.send(request).await,
        }
    }

    async fn pause(&self, attempt: u32) -> Result<(), BoxError> {
        let delay = self.policy.backoff(attempt);
        let sleep = (self.sleep)(delay);
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(cancelled()),
                _ = sleep => Ok(()),
            },
            None => {
                sleep.await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryTransport<T> {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        let max_retries = self.max_retries_for(request);
        let mut attempt = 0;
        loop {
            if self.is_cancelled() {
                return Err(cancelled());
            }
            match self.attempt(request).await {
                Ok(response) => {
                    if attempt < max_retries && self.policy.retries_status(response.status) {
                        attempt += 1;
                        debug!(
                            url = %request.url,
                            status = response.status,
                            attempt,
                            "retrying on status"
                        );
                        self.pause(attempt).await?;
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) if is_cancellation(&err) => {
                    return Err(cancelled());
                }
                Err(err) => {
                    if attempt < max_retries {
                        attempt += 1;
                        warn!(url = %request.url, error = %err, attempt, "retrying after transport failure");
                        self.pause(attempt).await?;
                        continue;
                    }
                    if err.is::<NetworkError>() {
                        return Err(err);
                    }
                    return Err(Box::new(NetworkError::Transport(err)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use url::Url;

    use super::*;
    use crate::error::{Cancelled, ErrorKind};
    use crate::http::HttpMethod;

    /// Answers each attempt from a script; records 1-based attempt numbers.
    struct Scripted {
        script: Vec<Result<u16, &'static str>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(script: Vec<Result<u16, &'static str>>) -> Self {
            Self {
                script,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, BoxError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match self.script.get(n).or(self.script.last()) {
                Some(Ok(status)) => Ok(HttpResponse::new(*status, Vec::new())),
                Some(Err(message)) => Err((*message).into()),
                None => Err("empty script".into()),
            }
        }
    }

    fn request(method: HttpMethod) -> HttpRequest {
        HttpRequest::new(method, Url::parse("https://example.com/health").unwrap())
    }

    fn instant(policy: RetryPolicy, inner: Arc<Scripted>) -> RetryTransport<Arc<Scripted>> {
        RetryTransport::new(inner, policy).with_sleep(|_| async {})
    }

    fn no_wait(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn backoff_doubles_from_base_delay() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::ZERO);
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn backoff_jitter_stays_in_bounds() {
        let policy = RetryPolicy::new(1, Duration::from_millis(100), Duration::from_millis(50));
        for _ in 0..100 {
            let delay = policy.backoff(1);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        let mut codes: Vec<u16> = policy.retry_on_status_codes.iter().copied().collect();
        codes.sort_unstable();
        assert_eq!(codes, vec![408, 429, 500, 502, 503, 504]);
        assert!(!policy.idempotent_only);
    }

    #[tokio::test]
    async fn retries_on_status_then_succeeds() {
        let inner = Arc::new(Scripted::new(vec![Ok(503), Ok(200)]));
        let retry = instant(no_wait(2).retry_on([503]), inner.clone());

        let response = retry.send(&request(HttpMethod::Get)).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn returns_last_retryable_response_when_exhausted() {
        let inner = Arc::new(Scripted::new(vec![Ok(503)]));
        let retry = instant(no_wait(2).retry_on([503]), inner.clone());

        let response = retry.send(&request(HttpMethod::Get)).await.unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_unlisted_status() {
        let inner = Arc::new(Scripted::new(vec![Ok(404), Ok(200)]));
        let retry = instant(no_wait(3).retry_on([503]), inner.clone());

        let response = retry.send(&request(HttpMethod::Get)).await.unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_wrapped_after_exhaustion() {
        let inner = Arc::new(Scripted::new(vec![Err("connection reset")]));
        let retry = instant(no_wait(1), inner.clone());

        let err = retry.send(&request(HttpMethod::Get)).await.unwrap_err();

        assert_eq!(inner.calls(), 2);
        let err = NetworkError::classify(err);
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let inner = Arc::new(Scripted::new(vec![Err("boom"), Ok(200)]));
        let retry = instant(no_wait(0), inner.clone());

        assert!(retry.send(&request(HttpMethod::Get)).await.is_err());
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn retries_post_unless_idempotent_only() {
        let inner = Arc::new(Scripted::new(vec![Ok(503), Ok(201)]));
        let retry = instant(no_wait(1).retry_on([503]), inner.clone());
        let response = retry.send(&request(HttpMethod::Post)).await.unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(inner.calls(), 2);

        let inner = Arc::new(Scripted::new(vec![Ok(503), Ok(201)]));
        let retry = instant(no_wait(1).retry_on([503]).idempotent_only(true), inner.clone());
        let response = retry.send(&request(HttpMethod::Post)).await.unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn sleeps_with_backoff_between_attempts() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let recorded = delays.clone();
        let inner = Arc::new(Scripted::new(vec![Ok(500), Ok(500), Ok(200)]));
        let policy = RetryPolicy::new(2, Duration::from_millis(10), Duration::ZERO);
        let retry = RetryTransport::new(inner.clone(), policy).with_sleep(move |delay| {
            recorded.lock().unwrap().push(delay);
            async {}
        });

        retry.send(&request(HttpMethod::Get)).await.unwrap();

        assert_eq!(
            *delays.lock().unwrap(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[tokio::test]
    async fn cancellation_from_inner_is_not_retried() {
        struct CancelledInner(AtomicU32);

        #[async_trait]
        impl Transport for CancelledInner {
            async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, BoxError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(Box::new(Cancelled))
            }
        }

        let inner = Arc::new(CancelledInner(AtomicU32::new(0)));
        let retry = RetryTransport::new(inner.clone(), no_wait(3)).with_sleep(|_| async {});

        let err = retry.send(&request(HttpMethod::Get)).await.unwrap_err();

        assert!(NetworkError::classify(err).is_cancelled());
        assert_eq!(inner.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_during_sleep_stops_retrying() {
        let inner = Arc::new(Scripted::new(vec![Ok(503)]));
        let token = CancellationToken::new();
        let trigger = token.clone();
        let retry = RetryTransport::new(inner.clone(), no_wait(5).retry_on([503]))
            .with_sleep(move |_| {
                trigger.cancel();
                std::future::pending::<()>()
            })
            .with_cancellation(token);

        let err = retry.send(&request(HttpMethod::Get)).await.unwrap_err();

        assert!(NetworkError::classify(err).is_cancelled());
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_prevents_first_attempt() {
        let inner = Arc::new(Scripted::new(vec![Ok(200)]));
        let token = CancellationToken::new();
        token.cancel();
        let retry = RetryTransport::new(inner.clone(), no_wait(2)).with_cancellation(token);

        let err = retry.send(&request(HttpMethod::Get)).await.unwrap_err();

        assert!(NetworkError::classify(err).is_cancelled());
        assert_eq!(inner.calls(), 0);
    }
}
