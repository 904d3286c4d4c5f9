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

//! Error categories specific to the Datastore service.

use gax::error::Error;
use gax::error::rpc::Code;

/// The error categories Datastore applications commonly dispatch on.
///
/// # Example
/// ```
/// # use gcloud_datastore::error::Category;
/// # use gcloud_datastore::Error;
/// fn handle(error: &Error) {
///     match Category::of(error) {
///         Category::TransactionAborted => { /* begin a new transaction */ }
///         Category::NeedIndex => { /* create the missing index */ }
///         _ => { /* report */ }
///     }
/// }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Category {
    /// The transaction was aborted, typically because of a conflict with a
    /// concurrent transaction. Begin a new transaction and apply the
    /// mutations again.
    TransactionAborted,

    /// The query requires an index that has not been built.
    NeedIndex,

    /// The caller does not have permission for the operation.
    PermissionDenied,

    /// A quota was exceeded.
    QuotaExceeded,

    /// The operation did not complete in time, on either side of the
    /// connection.
    Timeout,

    /// Any other error.
    Unknown,
}

impl Category {
    /// Classifies an error.
    pub fn of(error: &Error) -> Self {
        if error.is_timeout() {
            return Category::Timeout;
        }
        match error.code() {
            Some(Code::Aborted) => Category::TransactionAborted,
            Some(Code::FailedPrecondition) => Category::NeedIndex,
            Some(Code::PermissionDenied) => Category::PermissionDenied,
            Some(Code::ResourceExhausted) => Category::QuotaExceeded,
            Some(Code::DeadlineExceeded) => Category::Timeout,
            _ => Category::Unknown,
        }
    }

    /// If false, repeating the operation can never succeed: the transaction
    /// must be restarted, an index must be built, or an administrator has
    /// to intervene.
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            Category::TransactionAborted
                | Category::NeedIndex
                | Category::PermissionDenied
                | Category::QuotaExceeded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gax::error::rpc::Status;
    use test_case::test_case;

    fn service_error(code: Code) -> Error {
        Error::service(Status::default().set_code(code))
    }

    #[test_case(Code::Aborted, Category::TransactionAborted; "aborted")]
    #[test_case(Code::FailedPrecondition, Category::NeedIndex; "need index")]
    #[test_case(Code::PermissionDenied, Category::PermissionDenied; "permission denied")]
    #[test_case(Code::ResourceExhausted, Category::QuotaExceeded; "quota")]
    #[test_case(Code::DeadlineExceeded, Category::Timeout; "deadline")]
    #[test_case(Code::Unavailable, Category::Unknown; "unavailable")]
    #[test_case(Code::Internal, Category::Unknown; "internal")]
    fn classification(code: Code, want: Category) {
        assert_eq!(Category::of(&service_error(code)), want);
    }

    #[test]
    fn client_side_errors() {
        assert_eq!(Category::of(&Error::timeout("t")), Category::Timeout);
        assert_eq!(Category::of(&Error::io("io")), Category::Unknown);
    }

    #[test]
    fn retryability() {
        for category in [
            Category::TransactionAborted,
            Category::NeedIndex,
            Category::PermissionDenied,
            Category::QuotaExceeded,
        ] {
            assert!(!category.is_retryable(), "{category:?}");
        }
        assert!(Category::Timeout.is_retryable());
        assert!(Category::Unknown.is_retryable());
    }
}
