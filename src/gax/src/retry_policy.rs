// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines traits for retry policies and some common implementations.
//!
//! The client libraries automatically retry RPCs when they fail due to
//! transient errors and the RPC is idempotent, that is, it is safe to
//! perform the RPC more than once.
//!
//! Applications may override the default behavior, and maybe retry
//! operations that, while not safe in general, may be safe given how the
//! application manages resources.

use crate::error::Error;
use crate::error::rpc::Code;
use crate::retry_result::RetryResult;
use crate::throttle_result::ThrottleResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Controls the behavior of the retry loop.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Query the retry policy after an error.
    ///
    /// # Parameters
    /// * `loop_start` - when the retry loop started.
    /// * `attempt_count` - the number of attempts, including the failed one.
    /// * `idempotent` - if `true` assume the operation is idempotent. Many
    ///   more errors are retryable on idempotent operations.
    /// * `error` - the last error received from a request.
    fn on_error(
        &self,
        loop_start: Instant,
        attempt_count: u32,
        idempotent: bool,
        error: Error,
    ) -> RetryResult;

    /// Query the retry policy after a retry attempt is throttled.
    ///
    /// Throttled attempts count as errors for policies limiting the number
    /// of attempts.
    fn on_throttle(
        &self,
        _loop_start: Instant,
        _attempt_count: u32,
        error: Error,
    ) -> ThrottleResult {
        ThrottleResult::Continue(error)
    }

    /// The remaining time in the retry policy.
    ///
    /// For policies based on time, this returns the remaining time in the
    /// policy. The retry loop can use this value to adjust the next RPC
    /// timeout. For policies that are not time based this returns `None`.
    fn remaining_time(&self, _loop_start: Instant, _attempt_count: u32) -> Option<Duration> {
        None
    }
}

/// A helper type to use [RetryPolicy] in client and request options.
#[derive(Clone)]
pub struct RetryPolicyArg(pub Arc<dyn RetryPolicy>);

impl<T: RetryPolicy + 'static> std::convert::From<T> for RetryPolicyArg {
    fn from(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl std::convert::From<Arc<dyn RetryPolicy>> for RetryPolicyArg {
    fn from(value: Arc<dyn RetryPolicy>) -> Self {
        Self(value)
    }
}

/// A retry policy that retries transient errors on idempotent operations.
///
/// Server-side errors are retryable only when the status code is
/// `UNAVAILABLE` or `INTERNAL`. Errors generated before the request left the
/// client (such as failures to create the authentication headers) are always
/// retryable. This policy should be decorated to limit the number of retry
/// attempts or the duration of the retry loop.
///
/// # Example
/// ```
/// # use gcloud_gax::retry_policy::*;
/// let policy = LimitedAttemptCount::custom(TransientErrors, 3);
/// ```
#[derive(Clone, Debug)]
pub struct TransientErrors;

impl RetryPolicy for TransientErrors {
    fn on_error(
        &self,
        _loop_start: Instant,
        _attempt_count: u32,
        idempotent: bool,
        error: Error,
    ) -> RetryResult {
        if error.is_authentication() {
            // The operation never left the client, so it is safe to retry.
            return RetryResult::Continue(error);
        }
        if !idempotent {
            return RetryResult::Permanent(error);
        }
        if error.is_io() || error.is_timeout() {
            return RetryResult::Continue(error);
        }
        match error.code() {
            Some(Code::Unavailable) | Some(Code::Internal) => RetryResult::Continue(error),
            _ => RetryResult::Permanent(error),
        }
    }
}

/// A retry policy that continues on all errors.
///
/// Useful for operations the application knows to be safe to repeat, even if
/// they are not idempotent in general.
#[derive(Clone, Debug)]
pub struct AlwaysRetry;

impl RetryPolicy for AlwaysRetry {
    fn on_error(
        &self,
        _loop_start: Instant,
        _attempt_count: u32,
        _idempotent: bool,
        error: Error,
    ) -> RetryResult {
        RetryResult::Continue(error)
    }
}

/// A retry policy decorator that limits the total number of attempts.
///
/// Once the maximum attempt count is reached this policy returns
/// [Exhausted][RetryResult::Exhausted] for errors the inner policy would
/// retry. Permanent errors are still reported as permanent.
///
/// # Parameters
/// * `P` - the inner retry policy.
#[derive(Debug)]
pub struct LimitedAttemptCount<P = TransientErrors>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_attempts: u32,
    // Throttled attempts do not increase `attempt_count` in the loop, they
    // are tracked separately.
    throttle_count: AtomicU32,
}

impl LimitedAttemptCount {
    /// Creates a policy retrying transient errors up to `maximum_attempts` times.
    pub fn new(maximum_attempts: u32) -> Self {
        Self::custom(TransientErrors, maximum_attempts)
    }
}

impl<P> LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    /// Creates a policy decorating `inner` with an attempt limit.
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
            throttle_count: AtomicU32::new(0),
        }
    }
}

impl<P> RetryPolicy for LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    fn on_error(
        &self,
        loop_start: Instant,
        attempt_count: u32,
        idempotent: bool,
        error: Error,
    ) -> RetryResult {
        match self.inner.on_error(loop_start, attempt_count, idempotent, error) {
            RetryResult::Continue(e)
                if attempt_count + self.throttle_count.load(Ordering::Relaxed)
                    >= self.maximum_attempts =>
            {
                RetryResult::Exhausted(e)
            }
            flow => flow,
        }
    }

    fn on_throttle(&self, loop_start: Instant, attempt_count: u32, error: Error) -> ThrottleResult {
        let throttled = self.throttle_count.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt_count + throttled >= self.maximum_attempts {
            return ThrottleResult::Exhausted(error);
        }
        self.inner.on_throttle(loop_start, attempt_count, error)
    }

    fn remaining_time(&self, loop_start: Instant, attempt_count: u32) -> Option<Duration> {
        self.inner.remaining_time(loop_start, attempt_count)
    }
}

/// A retry policy decorator that limits the elapsed time of the retry loop.
///
/// Once the loop exceeds its duration limit, this policy returns
/// [Exhausted][RetryResult::Exhausted] for errors the inner policy would
/// retry.
///
/// # Parameters
/// * `P` - the inner retry policy.
#[derive(Debug)]
pub struct LimitedElapsedTime<P = TransientErrors>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_duration: Duration,
}

impl LimitedElapsedTime {
    /// Creates a policy retrying transient errors for up to `maximum_duration`.
    pub fn new(maximum_duration: Duration) -> Self {
        Self::custom(TransientErrors, maximum_duration)
    }
}

impl<P> LimitedElapsedTime<P>
where
    P: RetryPolicy,
{
    /// Creates a policy decorating `inner` with a duration limit.
    pub fn custom(inner: P, maximum_duration: Duration) -> Self {
        Self {
            inner,
            maximum_duration,
        }
    }

    fn expired(&self, loop_start: Instant, now: Instant) -> bool {
        now >= loop_start + self.maximum_duration
    }
}

impl<P> RetryPolicy for LimitedElapsedTime<P>
where
    P: RetryPolicy,
{
    fn on_error(
        &self,
        loop_start: Instant,
        attempt_count: u32,
        idempotent: bool,
        error: Error,
    ) -> RetryResult {
        match self.inner.on_error(loop_start, attempt_count, idempotent, error) {
            RetryResult::Continue(e) if self.expired(loop_start, Instant::now()) => {
                RetryResult::Exhausted(e)
            }
            flow => flow,
        }
    }

    fn on_throttle(&self, loop_start: Instant, attempt_count: u32, error: Error) -> ThrottleResult {
        if self.expired(loop_start, Instant::now()) {
            return ThrottleResult::Exhausted(error);
        }
        self.inner.on_throttle(loop_start, attempt_count, error)
    }

    fn remaining_time(&self, loop_start: Instant, attempt_count: u32) -> Option<Duration> {
        let deadline = loop_start + self.maximum_duration;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Some(inner) = self.inner.remaining_time(loop_start, attempt_count) {
            return Some(std::cmp::min(remaining, inner));
        }
        Some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::rpc::Status;

    fn service_error(code: Code) -> Error {
        Error::service(Status::default().set_code(code))
    }

    fn unavailable() -> Error {
        service_error(Code::Unavailable)
    }

    fn permission_denied() -> Error {
        service_error(Code::PermissionDenied)
    }

    #[test]
    fn transient_errors() {
        let p = TransientErrors;
        let now = Instant::now();

        assert!(p.on_error(now, 1, true, unavailable()).is_continue());
        assert!(p.on_error(now, 1, false, unavailable()).is_permanent());

        assert!(
            p.on_error(now, 1, true, service_error(Code::Internal))
                .is_continue()
        );
        assert!(p.on_error(now, 1, true, permission_denied()).is_permanent());
        assert!(p.on_error(now, 1, false, permission_denied()).is_permanent());

        assert!(p.on_error(now, 1, true, Error::io("err")).is_continue());
        assert!(p.on_error(now, 1, false, Error::io("err")).is_permanent());

        assert!(p.on_error(now, 1, true, Error::timeout("err")).is_continue());

        // Authentication errors never left the client.
        assert!(
            p.on_error(now, 1, false, Error::authentication("err"))
                .is_continue()
        );

        assert!(p.remaining_time(now, 1).is_none());
        assert!(p.on_throttle(now, 1, unavailable()).is_continue());
    }

    #[test]
    fn always_retry() {
        let p = AlwaysRetry;
        let now = Instant::now();
        assert!(p.on_error(now, 1, false, permission_denied()).is_continue());
        assert!(p.on_error(now, 1, true, Error::ser("err")).is_continue());
    }

    #[test]
    fn limited_attempt_count() {
        let p = LimitedAttemptCount::new(3);
        let now = Instant::now();
        assert!(p.on_error(now, 1, true, unavailable()).is_continue());
        assert!(p.on_error(now, 2, true, unavailable()).is_continue());
        assert!(p.on_error(now, 3, true, unavailable()).is_exhausted());
        // Permanent errors stay permanent, even past the limit.
        assert!(p.on_error(now, 4, true, permission_denied()).is_permanent());
    }

    #[test]
    fn limited_attempt_count_throttles() {
        let p = LimitedAttemptCount::new(3);
        let now = Instant::now();
        assert!(p.on_throttle(now, 1, unavailable()).is_continue());
        assert!(p.on_throttle(now, 1, unavailable()).is_exhausted());
        // Throttled attempts count towards the error limit too.
        assert!(p.on_error(now, 1, true, unavailable()).is_exhausted());
    }

    #[test]
    fn limited_elapsed_time() {
        let p = LimitedElapsedTime::new(Duration::from_secs(60));
        let now = Instant::now();
        assert!(p.on_error(now, 1, true, unavailable()).is_continue());
        let remaining = p.remaining_time(now, 1).unwrap();
        assert!(remaining <= Duration::from_secs(60), "{remaining:?}");

        // With a zero duration the policy is expired from the start.
        let p = LimitedElapsedTime::new(Duration::ZERO);
        assert!(p.on_error(now, 1, true, unavailable()).is_exhausted());
        assert!(p.on_throttle(now, 1, unavailable()).is_exhausted());
        assert_eq!(p.remaining_time(now, 1), Some(Duration::ZERO));

        // Permanent errors are not rewritten.
        assert!(
            p.on_error(now, 1, true, permission_denied())
                .is_permanent()
        );
    }

    #[test]
    fn limited_elapsed_time_composes() {
        let p = LimitedElapsedTime::custom(LimitedAttemptCount::new(2), Duration::from_secs(60));
        let now = Instant::now();
        assert!(p.on_error(now, 1, true, unavailable()).is_continue());
        assert!(p.on_error(now, 2, true, unavailable()).is_exhausted());
    }
}
