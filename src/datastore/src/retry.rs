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

//! A retrying decorator for [DatastoreStub] implementations.

use crate::error::Category;
use crate::model::*;
use crate::stub::DatastoreStub;
use gax::Result;
use gax::backoff_policy::{BackoffPolicy, BackoffPolicyArg};
use gax::error::Error;
use gax::exponential_backoff::ExponentialBackoff;
use gax::options::RequestOptions;
use gax::retry_loop_internal::{effective_timeout, retry_loop};
use gax::retry_policy::{LimitedAttemptCount, RetryPolicy, RetryPolicyArg};
use gax::retry_result::RetryResult;
use gax::retry_throttler::{AdaptiveThrottler, RetryThrottlerArg, SharedRetryThrottler};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// The error classification for Datastore operations.
///
/// Every error is considered transient except for a fixed set that can
/// never succeed on retry:
///
/// * a transaction abort (`ABORTED`) requires a new transaction, not a
///   blind retry of the failed call,
/// * a missing index (`FAILED_PRECONDITION`) requires an index build,
/// * an exhausted quota (`RESOURCE_EXHAUSTED`),
/// * a permission problem (`PERMISSION_DENIED`).
///
/// Requests whose serialization failed are also permanent: they fail the
/// same way on every attempt.
///
/// Non-idempotent requests are never retried. The commit path marks
/// requests with auto-ID inserts outside a transaction as non-idempotent,
/// retrying those risks creating duplicate entities.
#[derive(Clone, Debug)]
pub struct DatastoreRetryPolicy;

impl RetryPolicy for DatastoreRetryPolicy {
    fn on_error(
        &self,
        _loop_start: Instant,
        _attempt_count: u32,
        idempotent: bool,
        error: Error,
    ) -> RetryResult {
        if error.is_authentication() {
            // The request never left the client.
            return RetryResult::Continue(error);
        }
        if !idempotent {
            return RetryResult::Permanent(error);
        }
        if error.is_serialization() || error.is_deserialization() {
            return RetryResult::Permanent(error);
        }
        if Category::of(&error).is_retryable() {
            RetryResult::Continue(error)
        } else {
            RetryResult::Permanent(error)
        }
    }
}

/// The default number of attempts before the retry loop gives up.
const DEFAULT_MAXIMUM_ATTEMPTS: u32 = 5;

/// Decorates a [DatastoreStub] with a retry loop.
///
/// Each operation is attempted until it succeeds, the retry policy is
/// exhausted, or the error is classified as permanent (see
/// [DatastoreRetryPolicy]). In between attempts the decorator backs off
/// with the configured [BackoffPolicy].
#[derive(Debug)]
pub struct RetryingStub<S> {
    inner: S,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff_policy: Arc<dyn BackoffPolicy>,
    retry_throttler: SharedRetryThrottler,
}

impl<S> RetryingStub<S>
where
    S: DatastoreStub,
{
    /// Wraps `inner` with the default policies.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            retry_policy: Arc::new(LimitedAttemptCount::custom(
                DatastoreRetryPolicy,
                DEFAULT_MAXIMUM_ATTEMPTS,
            )),
            backoff_policy: Arc::new(ExponentialBackoff::default()),
            retry_throttler: Arc::new(Mutex::new(AdaptiveThrottler::default())),
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy<V: Into<RetryPolicyArg>>(mut self, v: V) -> Self {
        self.retry_policy = v.into().0;
        self
    }

    /// Replaces the backoff policy.
    pub fn with_backoff_policy<V: Into<BackoffPolicyArg>>(mut self, v: V) -> Self {
        self.backoff_policy = v.into().0;
        self
    }

    /// Replaces the retry throttler.
    pub fn with_retry_throttler<V: Into<RetryThrottlerArg>>(mut self, v: V) -> Self {
        self.retry_throttler = v.into().0;
        self
    }

    async fn retry<F, Fut, Response>(&self, options: RequestOptions, inner: F) -> Result<Response>
    where
        F: Fn(RequestOptions) -> Fut + Send,
        Fut: std::future::Future<Output = Result<Response>> + Send,
    {
        let idempotent = options.idempotent();
        let retry_policy = options
            .retry_policy()
            .clone()
            .unwrap_or_else(|| self.retry_policy.clone());
        let backoff_policy = options
            .backoff_policy()
            .clone()
            .unwrap_or_else(|| self.backoff_policy.clone());
        let retry_throttler = options
            .retry_throttler()
            .clone()
            .unwrap_or_else(|| self.retry_throttler.clone());
        let attempt = move |remaining_time| {
            let mut attempt_options = options.clone();
            if let Some(timeout) = effective_timeout(&options, remaining_time) {
                attempt_options.set_attempt_timeout(timeout);
            }
            inner(attempt_options)
        };
        retry_loop(
            attempt,
            async |duration| tokio::time::sleep(duration).await,
            idempotent,
            retry_throttler,
            retry_policy,
            backoff_policy,
        )
        .await
    }
}

#[async_trait::async_trait]
impl<S> DatastoreStub for RetryingStub<S>
where
    S: DatastoreStub,
{
    async fn lookup(&self, req: LookupRequest, options: RequestOptions) -> Result<LookupResponse> {
        let options = options.set_default_idempotency(true);
        self.retry(options, move |o| { let req = req.clone(); async move { self.inner.lookup(req, o).await } })
            .await
    }

    async fn run_query(
        &self,
        req: RunQueryRequest,
        options: RequestOptions,
    ) -> Result<RunQueryResponse> {
        let options = options.set_default_idempotency(true);
        self.retry(options, move |o| { let req = req.clone(); async move { self.inner.run_query(req, o).await } })
            .await
    }

    async fn begin_transaction(
        &self,
        req: BeginTransactionRequest,
        options: RequestOptions,
    ) -> Result<BeginTransactionResponse> {
        let options = options.set_default_idempotency(true);
        self.retry(options, move |o| {
            let req = req.clone();
            async move { self.inner.begin_transaction(req, o).await }
        })
        .await
    }

    async fn commit(&self, req: CommitRequest, options: RequestOptions) -> Result<CommitResponse> {
        // Auto-ID inserts outside a transaction are never safe to retry.
        let options = options.set_default_idempotency(!req.is_retry_unsafe());
        self.retry(options, move |o| { let req = req.clone(); async move { self.inner.commit(req, o).await } })
            .await
    }

    async fn rollback(
        &self,
        req: RollbackRequest,
        options: RequestOptions,
    ) -> Result<RollbackResponse> {
        let options = options.set_default_idempotency(true);
        self.retry(options, move |o| { let req = req.clone(); async move { self.inner.rollback(req, o).await } })
            .await
    }

    async fn allocate_ids(
        &self,
        req: AllocateIdsRequest,
        options: RequestOptions,
    ) -> Result<AllocateIdsResponse> {
        let options = options.set_default_idempotency(true);
        self.retry(options, move |o| {
            let req = req.clone();
            async move { self.inner.allocate_ids(req, o).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::tests::MockDatastoreStub;
    use gax::error::rpc::{Code, Status};
    use test_case::test_case;

    fn service_error(code: Code) -> Error {
        Error::service(Status::default().set_code(code))
    }

    fn no_backoff() -> gax::exponential_backoff::ExponentialBackoff {
        gax::exponential_backoff::ExponentialBackoffBuilder::new()
            .with_initial_delay(std::time::Duration::from_micros(1))
            .with_maximum_delay(std::time::Duration::from_micros(2))
            .clamp()
    }

    #[test]
    fn policy_classification() {
        let p = DatastoreRetryPolicy;
        let now = Instant::now();

        // The four designated non-retryable error kinds.
        for code in [
            Code::Aborted,
            Code::FailedPrecondition,
            Code::ResourceExhausted,
            Code::PermissionDenied,
        ] {
            let flow = p.on_error(now, 1, true, service_error(code.clone()));
            assert!(flow.is_permanent(), "{code:?} => {flow:?}");
        }

        // Everything else is retried.
        for code in [
            Code::Unavailable,
            Code::Internal,
            Code::DeadlineExceeded,
            Code::Unknown,
            Code::InvalidArgument,
        ] {
            let flow = p.on_error(now, 1, true, service_error(code.clone()));
            assert!(flow.is_continue(), "{code:?} => {flow:?}");
        }
        assert!(p.on_error(now, 1, true, Error::io("err")).is_continue());
        assert!(p.on_error(now, 1, true, Error::timeout("err")).is_continue());

        // Except when the operation is not idempotent.
        let flow = p.on_error(now, 1, false, service_error(Code::Unavailable));
        assert!(flow.is_permanent(), "{flow:?}");

        // And serialization problems are deterministic.
        assert!(p.on_error(now, 1, true, Error::ser("err")).is_permanent());
    }

    #[tokio::test]
    async fn lookup_retries_transients() -> anyhow::Result<()> {
        let mut seq = mockall::Sequence::new();
        let mut mock = MockDatastoreStub::new();
        mock.expect_lookup()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Err(service_error(Code::Unavailable)));
        mock.expect_lookup()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(LookupResponse::default()));

        let stub = RetryingStub::new(mock).with_backoff_policy(no_backoff());
        let response = stub
            .lookup(LookupRequest::default(), RequestOptions::default())
            .await?;
        assert_eq!(response, LookupResponse::default());
        Ok(())
    }

    #[test_case(Code::Aborted)]
    #[test_case(Code::FailedPrecondition)]
    #[test_case(Code::ResourceExhausted)]
    #[test_case(Code::PermissionDenied)]
    #[tokio::test]
    async fn never_retries_designated_errors(code: Code) {
        let mut mock = MockDatastoreStub::new();
        let failure = code.clone();
        mock.expect_lookup()
            .once()
            .returning(move |_, _| Err(service_error(failure.clone())));

        let stub = RetryingStub::new(mock).with_backoff_policy(no_backoff());
        let err = stub
            .lookup(LookupRequest::default(), RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(code), "{err:?}");
    }

    #[tokio::test]
    async fn auto_id_insert_outside_transaction_is_not_retried() {
        let mut mock = MockDatastoreStub::new();
        mock.expect_commit()
            .once()
            .returning(|_, _| Err(service_error(Code::Unavailable)));

        let stub = RetryingStub::new(mock).with_backoff_policy(no_backoff());
        let req = CommitRequest::default()
            .set_mode(CommitMode::NonTransactional)
            .set_mutations([Mutation::Insert(
                Entity::default().set_key(Key::new("Book")),
            )]);
        let err = stub
            .commit(req, RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(Code::Unavailable), "{err:?}");
    }

    #[tokio::test]
    async fn transactional_auto_id_insert_is_retried() -> anyhow::Result<()> {
        let mut seq = mockall::Sequence::new();
        let mut mock = MockDatastoreStub::new();
        mock.expect_commit()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Err(service_error(Code::Unavailable)));
        mock.expect_commit()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(CommitResponse::default()));

        let stub = RetryingStub::new(mock).with_backoff_policy(no_backoff());
        let req = CommitRequest::default()
            .set_mode(CommitMode::Transactional)
            .set_transaction("txn-1")
            .set_mutations([Mutation::Insert(
                Entity::default().set_key(Key::new("Book")),
            )]);
        stub.commit(req, RequestOptions::default()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn complete_key_insert_is_retried() -> anyhow::Result<()> {
        let mut seq = mockall::Sequence::new();
        let mut mock = MockDatastoreStub::new();
        mock.expect_commit()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Err(service_error(Code::Unavailable)));
        mock.expect_commit()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(CommitResponse::default()));

        let stub = RetryingStub::new(mock).with_backoff_policy(no_backoff());
        let req = CommitRequest::default()
            .set_mode(CommitMode::NonTransactional)
            .set_mutations([Mutation::Insert(
                Entity::default().set_key(Key::new("Book").with_id(7)),
            )]);
        stub.commit(req, RequestOptions::default()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn retry_policy_exhaustion() {
        let mut mock = MockDatastoreStub::new();
        mock.expect_run_query()
            .times(3)
            .returning(|_, _| Err(service_error(Code::Unavailable)));

        let stub = RetryingStub::new(mock)
            .with_backoff_policy(no_backoff())
            .with_retry_policy(LimitedAttemptCount::custom(DatastoreRetryPolicy, 3));
        let err = stub
            .run_query(RunQueryRequest::default(), RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(Code::Unavailable), "{err:?}");
    }

    #[tokio::test]
    async fn per_request_policy_override() {
        let mut mock = MockDatastoreStub::new();
        mock.expect_allocate_ids()
            .once()
            .returning(|_, _| Err(service_error(Code::Unavailable)));

        let mut options = RequestOptions::default();
        options.set_retry_policy(LimitedAttemptCount::custom(DatastoreRetryPolicy, 1));
        let stub = RetryingStub::new(mock).with_backoff_policy(no_backoff());
        let err = stub
            .allocate_ids(AllocateIdsRequest::default(), options)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(Code::Unavailable), "{err:?}");
    }
}
