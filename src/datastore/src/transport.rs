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

//! The HTTP implementation of [DatastoreStub].

use crate::model::*;
use crate::stub::DatastoreStub;
use gax::Result;
use gax::credentials::SharedCredentials;
use gax::error::Error;
use gax::error::rpc::Status;
use gax::options::RequestOptions;

/// Translates stub calls into `POST /v1/projects/{project}:{verb}` requests.
pub(crate) struct HttpDatastore {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    credentials: SharedCredentials,
    scopes: Vec<String>,
}

impl std::fmt::Debug for HttpDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDatastore")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl HttpDatastore {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        project_id: String,
        credentials: SharedCredentials,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client,
            endpoint,
            project_id,
            credentials,
            scopes,
        }
    }

    async fn call<Req, Resp>(&self, verb: &str, req: &Req, options: &RequestOptions) -> Result<Resp>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!(
            "{}/v1/projects/{}:{verb}",
            self.endpoint.trim_end_matches('/'),
            self.project_id
        );
        let headers = self.credentials.headers(&self.scopes).await?;
        let mut builder = self.client.post(url).headers(headers).json(req);
        if let Some(timeout) = options.attempt_timeout() {
            builder = builder.timeout(*timeout);
        }
        let response = builder.send().await.map_err(map_send_error)?;
        handle_response(response).await
    }
}

fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(e)
    } else {
        Error::io(e)
    }
}

async fn handle_response<Resp>(response: reqwest::Response) -> Result<Resp>
where
    Resp: serde::de::DeserializeOwned,
{
    let status_code = response.status().as_u16();
    if !response.status().is_success() {
        let headers = response.headers().clone();
        let payload = response.bytes().await.map_err(map_send_error)?;
        let status = Status::try_from(&payload).unwrap_or_else(|_| {
            // Proxies and load balancers may generate errors without the
            // standard envelope.
            let mut status = Status::default()
                .set_message(String::from_utf8_lossy(&payload).into_owned());
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
    serde_json::from_slice(&payload).map_err(Error::deser)
}

#[async_trait::async_trait]
impl DatastoreStub for HttpDatastore {
    async fn lookup(&self, req: LookupRequest, options: RequestOptions) -> Result<LookupResponse> {
        self.call("lookup", &req, &options).await
    }

    async fn run_query(
        &self,
        req: RunQueryRequest,
        options: RequestOptions,
    ) -> Result<RunQueryResponse> {
        self.call("runQuery", &req, &options).await
    }

    async fn begin_transaction(
        &self,
        req: BeginTransactionRequest,
        options: RequestOptions,
    ) -> Result<BeginTransactionResponse> {
        self.call("beginTransaction", &req, &options).await
    }

    async fn commit(&self, req: CommitRequest, options: RequestOptions) -> Result<CommitResponse> {
        self.call("commit", &req, &options).await
    }

    async fn rollback(
        &self,
        req: RollbackRequest,
        options: RequestOptions,
    ) -> Result<RollbackResponse> {
        self.call("rollback", &req, &options).await
    }

    async fn allocate_ids(
        &self,
        req: AllocateIdsRequest,
        options: RequestOptions,
    ) -> Result<AllocateIdsResponse> {
        self.call("allocateIds", &req, &options).await
    }
}
