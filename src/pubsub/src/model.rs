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

//! The resource types of the Cloud Pub/Sub v1 API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A topic resource.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Topic {
    /// The full name of the topic, in
    /// `projects/{project}/topics/{topic}` format.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// User labels.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Topic {
    /// Sets the value of `name`.
    pub fn set_name<T: Into<String>>(mut self, v: T) -> Self {
        self.name = v.into();
        self
    }
}

/// The push delivery configuration of a subscription.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PushConfig {
    /// The URL of the endpoint to which messages are pushed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub push_endpoint: String,
}

/// A subscription resource.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Subscription {
    /// The full name of the subscription, in
    /// `projects/{project}/subscriptions/{subscription}` format.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The full name of the topic from which this subscription receives
    /// messages.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub topic: String,

    /// The push delivery configuration. Unset for pull subscriptions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_config: Option<PushConfig>,

    /// How long the service waits for an acknowledgement before redelivery.
    #[serde(skip_serializing_if = "is_zero")]
    pub ack_deadline_seconds: i32,
}

impl Subscription {
    /// Sets the value of `name`.
    pub fn set_name<T: Into<String>>(mut self, v: T) -> Self {
        self.name = v.into();
        self
    }

    /// Sets the value of `topic`.
    pub fn set_topic<T: Into<String>>(mut self, v: T) -> Self {
        self.topic = v.into();
        self
    }

    /// Sets the value of `push_config`.
    pub fn set_push_config(mut self, v: PushConfig) -> Self {
        self.push_config = Some(v);
        self
    }

    /// Sets the value of `ack_deadline_seconds`.
    pub fn set_ack_deadline_seconds(mut self, v: i32) -> Self {
        self.ack_deadline_seconds = v;
        self
    }
}

/// A message published to a topic and delivered to subscribers.
#[serde_with::serde_as]
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PubsubMessage {
    /// The message payload, base64 on the wire.
    #[serde_as(as = "serde_with::base64::Base64")]
    #[serde(skip_serializing_if = "bytes::Bytes::is_empty")]
    pub data: bytes::Bytes,

    /// Attributes for this message.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// The ID of this message, assigned by the service on publish.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message_id: String,

    /// The time at which the message was published, assigned by the
    /// service, as an RFC 3339 string.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publish_time: String,
}

impl PubsubMessage {
    /// Creates a message with the given payload.
    pub fn from_data<T: Into<bytes::Bytes>>(data: T) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    /// Adds an attribute.
    pub fn set_attribute<K: Into<String>, V: Into<String>>(mut self, k: K, v: V) -> Self {
        self.attributes.insert(k.into(), v.into());
        self
    }
}

/// A message delivered by a pull, with its acknowledgement handle.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ReceivedMessage {
    /// The handle to acknowledge this delivery.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ack_id: String,

    /// The message.
    pub message: PubsubMessage,
}

/// The request to publish messages to a topic.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PublishRequest {
    /// The messages to publish.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<PubsubMessage>,
}

/// The response for a publish.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PublishResponse {
    /// The server-assigned IDs, in the same order as the request messages.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub message_ids: Vec<String>,
}

/// The request to pull messages from a subscription.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PullRequest {
    /// The maximum number of messages to return.
    #[serde(skip_serializing_if = "is_zero")]
    pub max_messages: i32,
}

/// The response for a pull.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct PullResponse {
    /// The received messages, possibly fewer than requested, or none.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub received_messages: Vec<ReceivedMessage>,
}

/// The request to acknowledge messages.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct AcknowledgeRequest {
    /// The acknowledgement handles from the pull responses.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ack_ids: Vec<String>,
}

/// The request to change the acknowledgement deadline of messages.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ModifyAckDeadlineRequest {
    /// The acknowledgement handles.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ack_ids: Vec<String>,

    /// The new deadline, from now, in seconds. Zero makes the messages
    /// immediately available for redelivery.
    pub ack_deadline_seconds: i32,
}

/// One page of topic listing results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListTopicsResponse {
    /// The topics in this page.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Topic>,

    /// The continuation token, empty on the last page.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}

impl gax::paginator::PageableResponse for ListTopicsResponse {
    type PageItem = Topic;

    fn next_page_token(&self) -> String {
        self.next_page_token.clone()
    }

    fn into_items(self) -> Vec<Topic> {
        self.topics
    }
}

/// One page of subscription listing results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListSubscriptionsResponse {
    /// The subscriptions in this page.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subscriptions: Vec<Subscription>,

    /// The continuation token, empty on the last page.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}

impl gax::paginator::PageableResponse for ListSubscriptionsResponse {
    type PageItem = Subscription;

    fn next_page_token(&self) -> String {
        self.next_page_token.clone()
    }

    fn into_items(self) -> Vec<Subscription> {
        self.subscriptions
    }
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_serde() -> anyhow::Result<()> {
        let message = PubsubMessage::from_data("hello").set_attribute("origin", "test");
        let got = serde_json::to_value(&message)?;
        let want = json!({
            "data": "aGVsbG8=",
            "attributes": {"origin": "test"}
        });
        assert_eq!(got, want);
        assert_eq!(serde_json::from_value::<PubsubMessage>(want)?, message);
        Ok(())
    }

    #[test]
    fn received_message_serde() -> anyhow::Result<()> {
        let got = serde_json::from_value::<PullResponse>(json!({
            "receivedMessages": [{
                "ackId": "ack-1",
                "message": {
                    "data": "aGVsbG8=",
                    "messageId": "m-1",
                    "publishTime": "2025-01-01T00:00:00Z"
                }
            }]
        }))?;
        assert_eq!(got.received_messages.len(), 1);
        let received = &got.received_messages[0];
        assert_eq!(received.ack_id, "ack-1");
        assert_eq!(&received.message.data[..], b"hello");
        assert_eq!(received.message.message_id, "m-1");
        Ok(())
    }

    #[test]
    fn list_paging() {
        use gax::paginator::PageableResponse;
        let response = ListTopicsResponse {
            topics: vec![Topic::default().set_name("t")],
            next_page_token: "token".to_string(),
        };
        assert_eq!(response.next_page_token(), "token");
        assert_eq!(response.into_items().len(), 1);
    }
}
