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

//! An idiomatic veneer over the Cloud Pub/Sub REST API.
//!
//! This crate contains two clients: [Publisher][client::Publisher] manages
//! topics and publishes messages, [Subscriber][client::Subscriber] manages
//! subscriptions and pulls messages.
//!
//! # Example
//! ```no_run
//! # use gcloud_pubsub::client::Publisher;
//! # use gcloud_pubsub::model::PubsubMessage;
//! # tokio_test::block_on(async {
//! let publisher = Publisher::builder()
//!     .with_project_id("my-project")
//!     .build()?;
//! let ids = publisher
//!     .publish("my-topic", [PubsubMessage::from_data("hello world")])
//!     .await?;
//! println!("published: {ids:?}");
//! # anyhow::Result::<()>::Ok(()) });
//! ```

pub use gax::Result;
pub use gax::error::Error;

/// The wire-level resource types of the Pub/Sub API.
pub mod model;

/// The client façades and their builders.
pub mod client;

/// Traits to mock or replace the transport.
pub mod stub;

pub(crate) mod transport;
