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

//! Tests for the clients over a local HTTP server.

use gcloud_pubsub::client::{Publisher, Subscriber};
use gcloud_pubsub::model::PubsubMessage;
use httptest::{Expectation, Server, matchers::*, responders::*};
use serde_json::json;

type Result = anyhow::Result<()>;

fn publisher(server: &Server) -> Publisher {
    Publisher::builder()
        .with_project_id("test-project")
        .with_endpoint(format!("http://{}", server.addr()))
        .with_credentials(gax::credentials::testing::test_credentials())
        .build()
        .expect("test configuration is complete")
}

fn subscriber(server: &Server) -> Subscriber {
    Subscriber::builder()
        .with_project_id("test-project")
        .with_endpoint(format!("http://{}", server.addr()))
        .with_credentials(gax::credentials::testing::test_credentials())
        .build_subscriber()
        .expect("test configuration is complete")
}

#[tokio::test]
async fn create_and_publish() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("PUT", "/v1/projects/test-project/topics/my-topic"),
            request::headers(contains(("authorization", "Bearer test-only-token"))),
        ])
        .respond_with(json_encoded(json!({
            "name": "projects/test-project/topics/my-topic"
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/projects/test-project/topics/my-topic:publish"),
            request::body(json_decoded(eq(json!({
                "messages": [{"data": "aGVsbG8="}]
            })))),
        ])
        .respond_with(json_encoded(json!({"messageIds": ["m-1"]}))),
    );

    let client = publisher(&server);
    let topic = client.create_topic("my-topic").await?;
    assert_eq!(topic.name, "projects/test-project/topics/my-topic");

    let ids = client
        .publish("my-topic", [PubsubMessage::from_data("hello")])
        .await?;
    assert_eq!(ids, vec!["m-1"]);
    Ok(())
}

#[tokio::test]
async fn publish_errors_surface_the_status() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/v1/projects/test-project/topics/missing:publish",
        ))
        .respond_with(status_code(404).body(
            json!({"error": {"code": 404, "message": "topic not found", "status": "NOT_FOUND"}})
                .to_string(),
        )),
    );

    let client = publisher(&server);
    let err = client
        .publish("missing", [PubsubMessage::from_data("x")])
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(gax::error::rpc::Code::NotFound), "{err:?}");
    assert!(err.to_string().contains("topic not found"), "{err}");
    Ok(())
}

#[tokio::test]
async fn list_topics_pages_through_tokens() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/v1/projects/test-project/topics"),
            request::query(url_decoded(not(contains(key("pageToken"))))),
        ])
        .respond_with(json_encoded(json!({
            "topics": [{"name": "projects/test-project/topics/a"}],
            "nextPageToken": "t1"
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/v1/projects/test-project/topics"),
            request::query(url_decoded(contains(("pageToken", "t1")))),
        ])
        .respond_with(json_encoded(json!({
            "topics": [{"name": "projects/test-project/topics/b"}]
        }))),
    );

    let client = publisher(&server);
    let mut names = Vec::new();
    let mut stream = client.list_topics().items();
    while let Some(topic) = stream.next().await {
        names.push(topic?.name);
    }
    assert_eq!(
        names,
        vec![
            "projects/test-project/topics/a",
            "projects/test-project/topics/b"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn subscription_lifecycle() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path(
                "PUT",
                "/v1/projects/test-project/subscriptions/my-subscription"
            ),
            request::body(json_decoded(eq(json!({
                "name": "projects/test-project/subscriptions/my-subscription",
                "topic": "projects/test-project/topics/my-topic"
            })))),
        ])
        .respond_with(json_encoded(json!({
            "name": "projects/test-project/subscriptions/my-subscription",
            "topic": "projects/test-project/topics/my-topic",
            "ackDeadlineSeconds": 10
        }))),
    );
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/v1/projects/test-project/subscriptions/my-subscription:pull",
        ))
        .respond_with(json_encoded(json!({
            "receivedMessages": [{
                "ackId": "ack-1",
                "message": {"data": "aGVsbG8=", "messageId": "m-1"}
            }]
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path(
                "POST",
                "/v1/projects/test-project/subscriptions/my-subscription:acknowledge"
            ),
            request::body(json_decoded(eq(json!({"ackIds": ["ack-1"]})))),
        ])
        .respond_with(json_encoded(json!({}))),
    );

    let client = subscriber(&server);
    let subscription = client
        .create_subscription("my-subscription", "my-topic")
        .await?;
    assert_eq!(subscription.ack_deadline_seconds, 10);

    let messages = client.pull("my-subscription", 5).await?;
    assert_eq!(messages.len(), 1);
    assert_eq!(&messages[0].message.data[..], b"hello");

    client
        .acknowledge("my-subscription", messages.into_iter().map(|m| m.ack_id))
        .await?;
    Ok(())
}
