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

use crate::Result;
use crate::model::*;
use crate::stub::{PublisherStub, SubscriberStub};
use crate::transport::HttpPubSub;
use gax::credentials::{AnonymousCredentials, SharedCredentials};
use gax::error::Error;
use gax::options::RequestOptions;
use gax::paginator::Paginator;
use std::sync::Arc;

/// The default service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// The OAuth2 scopes used by this client.
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/pubsub"];

/// A builder for [Publisher] and [Subscriber].
pub struct ClientBuilder {
    project_id: Option<String>,
    endpoint: String,
    scopes: Vec<String>,
    credentials: Option<SharedCredentials>,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            project_id: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            credentials: None,
            http_client: None,
        }
    }

    /// Sets the project all requests are scoped to. Required.
    pub fn with_project_id<T: Into<String>>(mut self, v: T) -> Self {
        self.project_id = Some(v.into());
        self
    }

    /// Overrides the default endpoint, e.g. to target an emulator.
    pub fn with_endpoint<T: Into<String>>(mut self, v: T) -> Self {
        self.endpoint = v.into();
        self
    }

    /// Overrides the OAuth2 scopes requested from the credentials.
    pub fn with_scopes<I, T>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.scopes = v.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the credentials.
    ///
    /// By default no authentication headers are sent, which only works
    /// against emulators and test servers. Production applications must
    /// provide credentials.
    pub fn with_credentials<T: Into<SharedCredentials>>(mut self, v: T) -> Self {
        self.credentials = Some(v.into());
        self
    }

    /// Provides the HTTP client instance to use as the transport.
    pub fn with_http_client(mut self, v: reqwest::Client) -> Self {
        self.http_client = Some(v);
        self
    }

    fn transport(self) -> gax::client_builder::Result<(HttpPubSub, String)> {
        use gax::client_builder::Error;
        let project_id = self.project_id.ok_or(Error::MissingField("project_id"))?;
        let client = self.http_client.unwrap_or_default();
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(AnonymousCredentials));
        let transport = HttpPubSub::new(client, self.endpoint, credentials, self.scopes);
        Ok((transport, project_id))
    }

    /// Builds a [Publisher].
    pub fn build(self) -> gax::client_builder::Result<Publisher> {
        let (transport, project_id) = self.transport()?;
        Ok(Publisher::from_stub(transport, project_id))
    }

    /// Builds a [Subscriber].
    pub fn build_subscriber(self) -> gax::client_builder::Result<Subscriber> {
        let (transport, project_id) = self.transport()?;
        Ok(Subscriber::from_stub(transport, project_id))
    }
}

/// Expands a short resource ID into a full resource name.
///
/// Full names (anything already containing a `/`) pass through unchanged.
fn full_name(project_id: &str, collection: &str, id: &str) -> String {
    if id.contains('/') {
        return id.to_string();
    }
    format!("projects/{project_id}/{collection}/{id}")
}

/// Implements a client for the topic side of the Pub/Sub API.
#[derive(Clone, Debug)]
pub struct Publisher {
    inner: Arc<dyn PublisherStub>,
    project_id: String,
}

impl Publisher {
    /// Returns a builder for [Publisher].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client over a custom stub, typically a mock.
    pub fn from_stub<S, T>(stub: S, project_id: T) -> Self
    where
        S: PublisherStub + 'static,
        T: Into<String>,
    {
        Self {
            inner: Arc::new(stub),
            project_id: project_id.into(),
        }
    }

    /// The full name of a topic in this project.
    pub fn topic_name(&self, id: &str) -> String {
        full_name(&self.project_id, "topics", id)
    }

    /// Creates a topic.
    pub async fn create_topic<T: AsRef<str>>(&self, id: T) -> Result<Topic> {
        let topic = Topic::default().set_name(self.topic_name(id.as_ref()));
        self.inner
            .create_topic(topic, RequestOptions::default())
            .await
    }

    /// Fetches a topic.
    pub async fn get_topic<T: AsRef<str>>(&self, id: T) -> Result<Topic> {
        self.inner
            .get_topic(self.topic_name(id.as_ref()), RequestOptions::default())
            .await
    }

    /// Deletes a topic.
    pub async fn delete_topic<T: AsRef<str>>(&self, id: T) -> Result<()> {
        self.inner
            .delete_topic(self.topic_name(id.as_ref()), RequestOptions::default())
            .await
    }

    /// Lists the topics in the project, returning a stream of pages.
    pub fn list_topics(&self) -> Paginator<ListTopicsResponse, Error> {
        let inner = self.inner.clone();
        let project = format!("projects/{}", self.project_id);
        let execute = move |token: String| {
            let inner = inner.clone();
            let project = project.clone();
            async move {
                inner
                    .list_topics(project, token, RequestOptions::default())
                    .await
            }
        };
        Paginator::new(String::new(), execute)
    }

    /// Publishes messages to a topic, returning the server-assigned IDs.
    pub async fn publish<T, I>(&self, topic: T, messages: I) -> Result<Vec<String>>
    where
        T: AsRef<str>,
        I: IntoIterator<Item = PubsubMessage>,
    {
        let req = PublishRequest {
            messages: messages.into_iter().collect(),
        };
        let response = self
            .inner
            .publish(self.topic_name(topic.as_ref()), req, RequestOptions::default())
            .await?;
        Ok(response.message_ids)
    }
}

/// Implements a client for the subscription side of the Pub/Sub API.
#[derive(Clone, Debug)]
pub struct Subscriber {
    inner: Arc<dyn SubscriberStub>,
    project_id: String,
}

impl Subscriber {
    /// Returns a builder for [Subscriber].
    ///
    /// Note that the builder is shared with [Publisher], finish it with
    /// [build_subscriber][ClientBuilder::build_subscriber].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client over a custom stub, typically a mock.
    pub fn from_stub<S, T>(stub: S, project_id: T) -> Self
    where
        S: SubscriberStub + 'static,
        T: Into<String>,
    {
        Self {
            inner: Arc::new(stub),
            project_id: project_id.into(),
        }
    }

    /// The full name of a subscription in this project.
    pub fn subscription_name(&self, id: &str) -> String {
        full_name(&self.project_id, "subscriptions", id)
    }

    /// Creates a pull subscription on a topic.
    pub async fn create_subscription<S, T>(&self, id: S, topic: T) -> Result<Subscription>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let subscription = Subscription::default()
            .set_name(self.subscription_name(id.as_ref()))
            .set_topic(full_name(&self.project_id, "topics", topic.as_ref()));
        self.inner
            .create_subscription(subscription, RequestOptions::default())
            .await
    }

    /// Creates a subscription from a fully specified resource.
    pub async fn create_subscription_from(&self, subscription: Subscription) -> Result<Subscription> {
        self.inner
            .create_subscription(subscription, RequestOptions::default())
            .await
    }

    /// Fetches a subscription.
    pub async fn get_subscription<T: AsRef<str>>(&self, id: T) -> Result<Subscription> {
        self.inner
            .get_subscription(self.subscription_name(id.as_ref()), RequestOptions::default())
            .await
    }

    /// Deletes a subscription.
    pub async fn delete_subscription<T: AsRef<str>>(&self, id: T) -> Result<()> {
        self.inner
            .delete_subscription(self.subscription_name(id.as_ref()), RequestOptions::default())
            .await
    }

    /// Lists the subscriptions in the project, returning a stream of pages.
    pub fn list_subscriptions(&self) -> Paginator<ListSubscriptionsResponse, Error> {
        let inner = self.inner.clone();
        let project = format!("projects/{}", self.project_id);
        let execute = move |token: String| {
            let inner = inner.clone();
            let project = project.clone();
            async move {
                inner
                    .list_subscriptions(project, token, RequestOptions::default())
                    .await
            }
        };
        Paginator::new(String::new(), execute)
    }

    /// Pulls up to `max_messages` messages from a subscription.
    ///
    /// Returns an empty vector when no messages are available.
    pub async fn pull<T: AsRef<str>>(
        &self,
        subscription: T,
        max_messages: i32,
    ) -> Result<Vec<ReceivedMessage>> {
        let req = PullRequest { max_messages };
        let response = self
            .inner
            .pull(
                self.subscription_name(subscription.as_ref()),
                req,
                RequestOptions::default(),
            )
            .await?;
        Ok(response.received_messages)
    }

    /// Acknowledges messages delivered by [pull][Subscriber::pull].
    pub async fn acknowledge<T, I, A>(&self, subscription: T, ack_ids: I) -> Result<()>
    where
        T: AsRef<str>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let req = AcknowledgeRequest {
            ack_ids: ack_ids.into_iter().map(Into::into).collect(),
        };
        self.inner
            .acknowledge(
                self.subscription_name(subscription.as_ref()),
                req,
                RequestOptions::default(),
            )
            .await
    }

    /// Changes the acknowledgement deadline of delivered messages.
    ///
    /// A deadline of zero makes the messages immediately available for
    /// redelivery.
    pub async fn modify_ack_deadline<T, I, A>(
        &self,
        subscription: T,
        ack_ids: I,
        ack_deadline_seconds: i32,
    ) -> Result<()>
    where
        T: AsRef<str>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let req = ModifyAckDeadlineRequest {
            ack_ids: ack_ids.into_iter().map(Into::into).collect(),
            ack_deadline_seconds,
        };
        self.inner
            .modify_ack_deadline(
                self.subscription_name(subscription.as_ref()),
                req,
                RequestOptions::default(),
            )
            .await
    }
}
