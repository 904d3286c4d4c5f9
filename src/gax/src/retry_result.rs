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

//! Retry loop control types.

use crate::error::Error;

/// The result of a retry policy decision.
///
/// In all variants the result includes the error that triggered the
/// decision. This is useful when retry policies are composed: the inner
/// policy decides based on the error type, and the outer policy may stop the
/// loop based on the number of errors, or the elapsed time.
#[derive(Debug)]
pub enum RetryResult {
    /// The error is non-retryable, stop the loop.
    Permanent(Error),

    /// The error is retryable, but the policy is stopping the loop.
    ///
    /// Loop control policies may stop the loop on retryable errors, for
    /// example, because the policy only allows a limited number of attempts.
    Exhausted(Error),

    /// The error was retryable, continue the loop.
    Continue(Error),
}

impl RetryResult {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}
