//! Transport wrapper that answers Digest challenges transparently.
//!
//! [`DigestTransport`] wraps any [`HttpExecutor`]. The first request to a
//! host goes out unauthenticated; a `401` carrying a usable Digest challenge
//! is cached for that host and the request is sent once more with
//! credentials. Later requests to the same host are authorized up front with
//! an increasing nonce count.
//!
//! Request bodies must be available for both attempts. [`Body::Full`] is
//! replayed as is, [`Body::Stream`] is read into memory before the first
//! attempt, which can be costly for very large uploads.
//!
//! No timeouts are applied. Dropping the future returned by
//! [`DigestTransport::send`] cancels whichever attempt is in flight.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, HOST};
use http::request::Parts;
use http::{Request, Response, StatusCode, Uri};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{find_challenge, AuthContext, Body, BoxError, Challenge, Error, Result};

/// Sends one request and returns the response, e.g. an HTTP client.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: Request<Body>) -> std::result::Result<Response<Body>, BoxError>;
}

#[async_trait]
impl<T: HttpExecutor + ?Sized> HttpExecutor for Arc<T> {
    async fn execute(&self, request: Request<Body>) -> std::result::Result<Response<Body>, BoxError> {
        (**self).execute(request).await
    }
}

/// Allocates the nonce count for each reuse of a cached challenge.
///
/// Called with the cache lock held, so two requests never observe the same
/// `current` value for one host.
pub trait NonceCounter: Send + Sync {
    /// Count to send next, given the last count sent for `authority`
    /// (0 right after a fresh challenge was cached)
    fn next_count(&self, authority: &str, current: u32) -> u32;
}

/// Default counter: previous count plus one
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicCounter;

impl NonceCounter for MonotonicCounter {
    fn next_count(&self, _authority: &str, current: u32) -> u32 {
        current.saturating_add(1)
    }
}

/// Custom challenge discovery, see [`find_challenge`](fn.find_challenge.html)
pub type ChallengeFinder = dyn Fn(&HeaderMap) -> Result<Challenge> + Send + Sync;

struct CacheEntry {
    challenge: Arc<Challenge>,
    count: u32,
}

/// One challenge per host. Owned by a single transport.
#[derive(Default)]
struct ChallengeCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ChallengeCache {
    fn insert(&self, authority: &str, challenge: Challenge) {
        self.entries.lock().insert(
            authority.to_string(),
            CacheEntry {
                challenge: Arc::new(challenge),
                count: 0,
            },
        );
    }

    /// Cached challenge for `authority` along with a freshly allocated count
    fn next(&self, authority: &str, counter: &dyn NonceCounter) -> Option<(Arc<Challenge>, u32)> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(authority)?;
        entry.count = counter.next_count(authority, entry.count);
        Some((Arc::clone(&entry.challenge), entry.count))
    }
}

/// [`HttpExecutor`] wrapper performing Digest authentication.
///
/// Safe to share between tasks; each instance keeps its own challenge cache.
pub struct DigestTransport<E> {
    username: String,
    password: String,
    inner: E,
    cache: ChallengeCache,
    counter: Arc<dyn NonceCounter>,
    find: Arc<ChallengeFinder>,
}

impl<E: HttpExecutor> DigestTransport<E> {
    pub fn new(username: impl Into<String>, password: impl Into<String>, inner: E) -> Self {
        DigestTransport {
            username: username.into(),
            password: password.into(),
            inner,
            cache: ChallengeCache::default(),
            counter: Arc::new(MonotonicCounter),
            find: Arc::new(find_challenge),
        }
    }

    /// Replace the in-memory nonce counter
    pub fn with_nonce_counter(mut self, counter: impl NonceCounter + 'static) -> Self {
        self.counter = Arc::new(counter);
        self
    }

    /// Replace the challenge discovery applied to `401` responses
    pub fn with_challenge_finder<F>(mut self, find: F) -> Self
    where
        F: Fn(&HeaderMap) -> Result<Challenge> + Send + Sync + 'static,
    {
        self.find = Arc::new(find);
        self
    }

    /// The wrapped executor
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Send the request, answering a Digest challenge at most once.
    ///
    /// A `401` from the retried attempt is returned as is. Executor failures
    /// are never retried.
    ///
    /// # Errors
    ///
    /// Executor failures, an unreadable request body, a `401` without a usable
    /// challenge, or any error from computing the credentials.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        let (parts, body) = request.into_parts();
        let body = body.into_bytes().await.map_err(Error::BodyRead)?;
        let authority = authority(&parts);

        let first = self.prepare(&parts, &body, &authority)?;
        let response = self.inner.execute(first).await.map_err(Error::Transport)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let (response_parts, response_body) = response.into_parts();
        response_body.drain().await;

        let challenge = (self.find)(&response_parts.headers)?;
        debug!(
            authority = %authority,
            realm = %challenge.realm,
            algorithm = %challenge.algorithm,
            "caching digest challenge"
        );
        self.cache.insert(&authority, challenge);

        let second = self.prepare(&parts, &body, &authority)?;
        debug!(authority = %authority, "retrying with digest credentials");
        let response = self.inner.execute(second).await.map_err(Error::Transport)?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(authority = %authority, "digest credentials rejected");
        }

        Ok(response)
    }

    /// Build one attempt from the original request, authorized if a
    /// challenge is cached for the host
    fn prepare(&self, parts: &Parts, body: &Bytes, authority: &str) -> Result<Request<Body>> {
        let mut request = Request::new(Body::from(body.clone()));
        *request.method_mut() = parts.method.clone();
        *request.uri_mut() = parts.uri.clone();
        *request.version_mut() = parts.version;
        *request.headers_mut() = parts.headers.clone();

        // the lock is released before hashing
        if let Some((challenge, nc)) = self.cache.next(authority, self.counter.as_ref()) {
            let mut context = AuthContext::new_with_method(
                &self.username,
                &self.password,
                request_uri(&parts.uri),
                None,
                parts.method.as_str(),
            );
            context.set_body(body);
            context.set_nonce_count(nc);

            let credentials = challenge.respond(&context)?;
            request
                .headers_mut()
                .insert(AUTHORIZATION, HeaderValue::from_str(&credentials.to_string())?);
        }

        Ok(request)
    }
}

#[async_trait]
impl<E: HttpExecutor> HttpExecutor for DigestTransport<E> {
    async fn execute(&self, request: Request<Body>) -> std::result::Result<Response<Body>, BoxError> {
        Ok(self.send(request).await?)
    }
}

impl<E: Debug> Debug for DigestTransport<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestTransport")
            .field("username", &self.username)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

/// Cache key. Only the host name counts: port and scheme are ignored, and so
/// is the challenge's `domain` list.
fn authority(parts: &Parts) -> String {
    if let Some(host) = parts.uri.host() {
        return host.to_ascii_lowercase();
    }
    parts
        .headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.parse::<http::uri::Authority>().ok())
        .map(|a| a.host().to_ascii_lowercase())
        .unwrap_or_default()
}

/// The `uri` credential field: path and query
fn request_uri(uri: &Uri) -> &str {
    uri.path_and_query().map_or("/", |pq| pq.as_str())
}
