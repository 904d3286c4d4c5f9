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

//! Google APIs helpers.
//!
//! This crate contains the types and functions shared by the service veneers
//! in this repository: the error model, the retry and backoff machinery, the
//! paging abstraction, and the per-request options.

/// An alias of [std::result::Result] where the error is always [crate::error::Error].
///
/// This is the result type used by all functions wrapping RPCs.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The core error types used by the service clients.
pub mod error;

/// Defines some types and traits to consume list RPCs as pages or streams.
pub mod paginator;

/// The credentials seam used by the transport implementations.
///
/// This crate does not implement OAuth2. It only defines the trait that the
/// clients consume, plus trivial implementations for tests and for
/// pre-acquired tokens.
pub mod credentials;

pub mod backoff_policy;
pub mod client_builder;
pub mod exponential_backoff;
pub mod options;
pub mod retry_policy;
pub mod retry_result;
pub mod retry_throttler;
pub mod throttle_result;

#[doc(hidden)]
pub mod retry_loop_internal;

#[cfg(test)]
pub(crate) mod mock_rng;
