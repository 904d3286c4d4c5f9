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

//! An idiomatic veneer over the Cloud Datastore REST API.
//!
//! This crate contains a client for the raw Datastore operations (lookup,
//! commit, queries, transactions), and a mapping layer to move data between
//! typed application structs and the wire-level key/entity representation.
//! Most applications will use:
//!
//! * [Datastore][client::Datastore] for the raw operations.
//! * [Db][db::Db] plus a [ModelRegistry][db::ModelRegistry] for the typed
//!   operations.
//!
//! # Example
//! ```no_run
//! # use gcloud_datastore::client::Datastore;
//! # use gcloud_datastore::model::Key;
//! # tokio_test::block_on(async {
//! let client = Datastore::builder()
//!     .with_project_id("my-project")
//!     .build()?;
//! let response = client
//!     .lookup([Key::new("Book").with_name("moby-dick")])
//!     .await?;
//! println!("found: {:?}", response.found);
//! # anyhow::Result::<()>::Ok(()) });
//! ```

pub use gax::Result;
pub use gax::error::Error;

/// Error categories specific to the Datastore service.
pub mod error;

/// The wire-level request and response types of the Datastore API.
pub mod model;

/// The model/entity mapping layer.
pub mod db;

/// The client façade and its builder.
pub mod client;

/// The retrying decorator for [stub::DatastoreStub] implementations.
pub mod retry;

/// Traits to mock or replace the transport.
pub mod stub;

pub(crate) mod transport;
