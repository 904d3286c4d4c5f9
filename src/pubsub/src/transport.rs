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

//! The HTTP implementation of the Pub/Sub stubs.

use crate::model::*;
use crate::stub::{PublisherStub, SubscriberStub};
use gax::Result;
use gax::credentials::SharedCredentials;
use gax::error::Error;
use gax::error::rpc::Status;
use gax::options::RequestOptions;

pub(crate) struct HttpPubSub {
    client: reqwest::Client,
    endpoint: String,
    credentials: SharedCredentials,
    scopes: Vec<String>,
}

impl std::fmt::Debug for HttpPubSub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPubSub")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HttpPubSub {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        credentials: SharedCredentials,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client,
            endpoint,
            credentials,
            scopes,
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/v1/{suffix}", self.endpoint.trim_end_matches('/'))
    }

    async fn send<Resp>(
        &self,
        builder: reqwest::RequestBuilder,
        options: &RequestOptions,
    ) -> Result<Resp>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let headers = self.credentials.headers(&self.scopes).await?;
        let mut builder = builder.headers(headers);
        if let Some(timeout) = options.attempt_timeout() {
            builder = builder.timeout(*timeout);
        }
        let response = builder.send().await.map_err(map_send_error)?;
        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            let headers = response.headers().clone();
            let payload = response.bytes().await.map_err(map_send_error)?;
            let status = Status::try_from(&payload).unwrap_or_else(|_| {
                let mut status =
                    Status::default().set_message(String::from_utf8_lossy(&payload).into_owned());
                status.code = status_code as i32;
                status
            });
            tracing::debug!(status_code, ?status, "service error");
            return Err(Error::service_with_http_metadata(
                status,
                Some(status_code),
                Some(headers),
            ));
        }
        let payload = response.bytes().await.map_err(map_send_error)?;
        if payload.is_empty() {
            // Some operations return an empty body, deserialize as `{}`.
            return serde_json::from_slice(b"{}").map_err(Error::deser);
        }
        serde_json::from_slice(&payload).map_err(Error::deser)
    }
}

fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(e)
    } else {
        Error::io(e)
    }
}

/// The REST API encodes "no response" as an empty JSON object.
#[derive(serde::Deserialize)]
struct Empty {}

#[async_trait::async_trait]
impl PublisherStub for HttpPubSub {
    async fn create_topic(&self, topic: Topic, options: RequestOptions) -> Result<Topic> {
        let builder = self.client.put(self.url(&topic.name)).json(&topic);
        self.send(builder, &options).await
    }

    async fn get_topic(&self, name: String, options: RequestOptions) -> Result<Topic> {
        let builder = self.client.get(self.url(&name));
        self.send(builder, &options).await
    }

    async fn delete_topic(&self, name: String, options: RequestOptions) -> Result<()> {
        let builder = self.client.delete(self.url(&name));
        self.send::<Empty>(builder, &options).await.map(|_| ())
    }

    async fn list_topics(
        &self,
        project: String,
        page_token: String,
        options: RequestOptions,
    ) -> Result<ListTopicsResponse> {
        let mut query = Vec::new();
        if !page_token.is_empty() {
            query.push(("pageToken", page_token));
        }
        let builder = self
            .client
            .get(self.url(&format!("{project}/topics")))
            .query(&query);
        self.send(builder, &options).await
    }

    async fn publish(
        &self,
        topic: String,
        req: PublishRequest,
        options: RequestOptions,
    ) -> Result<PublishResponse> {
        let builder = self
            .client
            .post(self.url(&format!("{topic}:publish")))
            .json(&req);
        self.send(builder, &options).await
    }
}

#[async_trait::async_trait]
impl SubscriberStub for HttpPubSub {
    async fn create_subscription(
        &self,
        subscription: Subscription,
        options: RequestOptions,
    ) -> Result<Subscription> {
        let builder = self
            .client
            .put(self.url(&subscription.name))
            .json(&subscription);
        self.send(builder, &options).await
    }

    async fn get_subscription(
        &self,
        name: String,
        options: RequestOptions,
    ) -> Result<Subscription> {
        let builder = self.client.get(self.url(&name));
        self.send(builder, &options).await
    }

    async fn delete_subscription(&self, name: String, options: RequestOptions) -> Result<()> {
        let builder = self.client.delete(self.url(&name));
        self.send::<Empty>(builder, &options).await.map(|_| ())
    }

    async fn list_subscriptions(
        &self,
        project: String,
        page_token: String,
        options: RequestOptions,
    ) -> Result<ListSubscriptionsResponse> {
        let mut query = Vec::new();
        if !page_token.is_empty() {
            query.push(("pageToken", page_token));
        }
        let builder = self
            .client
            .get(self.url(&format!("{project}/subscriptions")))
            .query(&query);
        self.send(builder, &options).await
    }

    async fn pull(
        &self,
        subscription: String,
        req: PullRequest,
        options: RequestOptions,
    ) -> Result<PullResponse> {
        let builder = self
            .client
            .post(self.url(&format!("{subscription}:pull")))
            .json(&req);
        self.send(builder, &options).await
    }

    async fn acknowledge(
        &self,
        subscription: String,
        req: AcknowledgeRequest,
        options: RequestOptions,
    ) -> Result<()> {
        let builder = self
            .client
            .post(self.url(&format!("{subscription}:acknowledge")))
            .json(&req);
        self.send::<Empty>(builder, &options).await.map(|_| ())
    }

    async fn modify_ack_deadline(
        &self,
        subscription: String,
        req: ModifyAckDeadlineRequest,
        options: RequestOptions,
    ) -> Result<()> {
        let builder = self
            .client
            .post(self.url(&format!("{subscription}:modifyAckDeadline")))
            .json(&req);
        self.send::<Empty>(builder, &options).await.map(|_| ())
    }
}
