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

//! Defines types related to throttling the retry loop.

use crate::error::Error;

/// The result of a retry throttling control decision.
///
/// The retry loop may throttle some retry attempts: the request previously
/// failed, it is retryable, but the policies in the loop have reached some
/// limit or budget on the number of retry attempts. In such cases the retry
/// attempt is not started, and the retry policy is consulted to determine if
/// the retry loop should continue.
#[derive(Debug)]
pub enum ThrottleResult {
    /// The error is retryable, but the policy is stopping the loop.
    Exhausted(Error),

    /// The loop continues after the throttled attempt.
    Continue(Error),
}

impl ThrottleResult {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}
