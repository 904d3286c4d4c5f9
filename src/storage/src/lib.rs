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

//! An idiomatic veneer over the Cloud Storage JSON API.
//!
//! This crate contains a client for buckets and objects. Uploads accept any
//! [StreamingSource][upload_source::StreamingSource], including streams of
//! unknown length: small payloads are sent in a single request, large ones
//! switch to the resumable upload protocol once a buffering threshold is
//! exceeded.
//!
//! # Example
//! ```no_run
//! # use gcloud_storage::client::Storage;
//! # tokio_test::block_on(async {
//! let client = Storage::builder()
//!     .with_project_id("my-project")
//!     .build()?;
//! let object = client
//!     .upload_object("my-bucket", "greeting.txt", "hello world")
//!     .send()
//!     .await?;
//! println!("uploaded: {object:?}");
//! # anyhow::Result::<()>::Ok(()) });
//! ```

pub use gax::Result;
pub use gax::error::Error;

/// The wire-level resource types of the Storage API.
pub mod model;

/// The client façade and its builder.
pub mod client;

/// Data sources for uploads.
pub mod upload_source;

/// Traits to mock or replace the transport.
pub mod stub;

pub(crate) mod transport;
pub(crate) mod upload;
