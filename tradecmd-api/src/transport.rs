//! Rate-limited HTTP transport
//!
//! Every outbound request waits for a permit from the [`RateLimiter`].
//! A `429 Too Many Requests` response is never surfaced: the request is
//! re-queued for another permit and resent until the server answers with
//! anything else. There is no retry cap and no backoff beyond the permit
//! cadence.

use reqwest::{Client, Request, Response, StatusCode};

use crate::error::{ApiError, Result};
use crate::ratelimit::RateLimiter;

/// HTTP client gated by a permit pool
pub struct RateLimitedTransport {
    http: Client,
    limiter: RateLimiter,
}

impl RateLimitedTransport {
    /// Wrap an HTTP client with a limiter
    pub fn new(http: Client, limiter: RateLimiter) -> Self {
        Self { http, limiter }
    }

    /// Default HTTP client admitting `permits_per_second` requests per second
    pub fn per_second(permits_per_second: u32) -> Self {
        Self::new(Client::new(), RateLimiter::per_second(permits_per_second))
    }

    /// Underlying client, used to build requests
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// The permit pool gating this transport
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Send a request, retrying for as long as the server throttles it.
    ///
    /// The request body must be replayable (in-memory bytes); streaming
    /// bodies fail with [`ApiError::Unreplayable`].
    pub async fn send(&self, request: Request) -> Result<Response> {
        let mut attempt: u32 = 0;

        loop {
            let outgoing = request.try_clone().ok_or(ApiError::Unreplayable)?;

            self.limiter.acquire().await;
            attempt = attempt.saturating_add(1);

            let response = self.http.execute(outgoing).await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            tracing::debug!(
                method = %request.method(),
                url = %request.url(),
                attempt,
                "throttled by server, retrying"
            );
        }
    }
}
