use crate::config::RetryPolicy;
use crate::error::{Error, Result};
use crate::fetch::context::FetchContext;
use crate::fetch::rate_limit::RateLimitCache;
use crate::fetch::transport::{RequestSpec, Transport};
use crate::observability::metrics::{RATE_LIMIT_REJECTIONS, UPSTREAM_ATTEMPTS, UPSTREAM_FAILURES};
use std::sync::Arc;

/// Rate-limited, retrying wrapper around a single upstream request.
pub struct Retryer {
    policy: Arc<RetryPolicy>,
    limits: Arc<RateLimitCache>,
    transport: Arc<dyn Transport>,
}

impl Retryer {
    pub fn new(
        policy: Arc<RetryPolicy>,
        limits: Arc<RateLimitCache>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Retryer {
            policy,
            limits,
            transport,
        }
    }

    /// Builds a retryer with its own rate-limit cache, using the policy window
    /// and holding up to `cache_capacity` keys.
    pub fn with_policy(policy: Arc<RetryPolicy>, cache_capacity: usize, transport: Arc<dyn Transport>) -> Self {
        let limits = Arc::new(RateLimitCache::new(policy.rate_limit_window, cache_capacity));
        Retryer::new(policy, limits, transport)
    }

    pub async fn fetch(&self, request: &RequestSpec, ctx: &FetchContext) -> Result<Vec<u8>> {
        if let Err(e) = self.limits.check_and_record(request.key()) {
            RATE_LIMIT_REJECTIONS.inc();
            tracing::debug!("Rate limit hit for {}", request.url);
            return Err(e);
        }
        self.request_with_retry(request, ctx).await
    }

    async fn request_with_retry(&self, request: &RequestSpec, ctx: &FetchContext) -> Result<Vec<u8>> {
        let attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if let Some(err) = ctx.err() {
                return Err(err);
            }

            let err = match self.attempt(request, ctx).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => e,
            };

            UPSTREAM_FAILURES.inc();
            tracing::warn!(
                "Request failed, attempt #{}/{}, url: {}, error: {}",
                attempt, attempts, request.url, err
            );

            if attempt >= attempts {
                return Err(Error::RetryExhausted {
                    attempts,
                    source: Box::new(err),
                });
            }

            // Backoff does not count against the per-attempt timeout.
            tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                _ = tokio::time::sleep(self.policy.backoff) => {}
            }
        }
    }

    async fn attempt(&self, request: &RequestSpec, ctx: &FetchContext) -> Result<Vec<u8>> {
        UPSTREAM_ATTEMPTS.inc();
        let timeout = self.policy.per_attempt_timeout;

        tokio::select! {
            biased;
            err = ctx.done() => Err(err),
            result = tokio::time::timeout(timeout, self.transport.send(request)) => {
                result.unwrap_or(Err(Error::AttemptTimeout(timeout)))
            }
        }
    }
}
