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

use crate::model::{
    AcknowledgeRequest, ListSubscriptionsResponse, ListTopicsResponse, ModifyAckDeadlineRequest,
    PublishRequest, PublishResponse, PullRequest, PullResponse, Subscription, Topic,
};
use gax::Result;
use gax::options::RequestOptions;

/// The transport interface used by [Publisher][crate::client::Publisher].
///
/// All resource names are full names, e.g.
/// `projects/my-project/topics/my-topic`.
#[async_trait::async_trait]
pub trait PublisherStub: Send + Sync + std::fmt::Debug {
    /// Creates a topic.
    async fn create_topic(&self, topic: Topic, options: RequestOptions) -> Result<Topic>;

    /// Fetches a topic.
    async fn get_topic(&self, name: String, options: RequestOptions) -> Result<Topic>;

    /// Deletes a topic.
    async fn delete_topic(&self, name: String, options: RequestOptions) -> Result<()>;

    /// Lists the topics of a project.
    async fn list_topics(
        &self,
        project: String,
        page_token: String,
        options: RequestOptions,
    ) -> Result<ListTopicsResponse>;

    /// Publishes messages to a topic.
    async fn publish(
        &self,
        topic: String,
        req: PublishRequest,
        options: RequestOptions,
    ) -> Result<PublishResponse>;
}

/// The transport interface used by [Subscriber][crate::client::Subscriber].
#[async_trait::async_trait]
pub trait SubscriberStub: Send + Sync + std::fmt::Debug {
    /// Creates a subscription.
    async fn create_subscription(
        &self,
        subscription: Subscription,
        options: RequestOptions,
    ) -> Result<Subscription>;

    /// Fetches a subscription.
    async fn get_subscription(
        &self,
        name: String,
        options: RequestOptions,
    ) -> Result<Subscription>;

    /// Deletes a subscription.
    async fn delete_subscription(&self, name: String, options: RequestOptions) -> Result<()>;

    /// Lists the subscriptions of a project.
    async fn list_subscriptions(
        &self,
        project: String,
        page_token: String,
        options: RequestOptions,
    ) -> Result<ListSubscriptionsResponse>;

    /// Pulls messages from a subscription.
    async fn pull(
        &self,
        subscription: String,
        req: PullRequest,
        options: RequestOptions,
    ) -> Result<PullResponse>;

    /// Acknowledges messages.
    async fn acknowledge(
        &self,
        subscription: String,
        req: AcknowledgeRequest,
        options: RequestOptions,
    ) -> Result<()>;

    /// Changes the acknowledgement deadline of messages.
    async fn modify_ack_deadline(
        &self,
        subscription: String,
        req: ModifyAckDeadlineRequest,
        options: RequestOptions,
    ) -> Result<()>;
}
