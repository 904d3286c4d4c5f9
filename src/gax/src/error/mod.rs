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

//! The error types produced by the client libraries.
//!
//! Errors come from multiple sources: the service may reject a request, the
//! transport may fail before a response is received, the retry policy may be
//! exhausted, or the library may be unable to serialize the request. All of
//! them surface as [Error], which offers predicates and accessors to query
//! the details.

mod core_error;
pub use core_error::Error;

/// The `google.rpc` error model used by Google Cloud services.
pub mod rpc;
