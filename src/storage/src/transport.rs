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

//! The HTTP implementation of [StorageStub].

use crate::model::*;
use crate::stub::StorageStub;
use gax::Result;
use gax::credentials::SharedCredentials;
use gax::error::Error;
use gax::error::rpc::Status;
use gax::options::RequestOptions;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Object names may contain `/` and other special characters, they must be
/// percent-encoded in the request path.
const OBJECT_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(crate) struct HttpStorage {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    credentials: SharedCredentials,
    scopes: Vec<String>,
}

impl std::fmt::Debug for HttpStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStorage")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl HttpStorage {
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

    fn base(&self) -> String {
        format!("{}/storage/v1", self.endpoint.trim_end_matches('/'))
    }

    fn upload_base(&self) -> String {
        format!("{}/upload/storage/v1", self.endpoint.trim_end_matches('/'))
    }

    fn object_path(&self, bucket: &str, object: &str) -> String {
        format!(
            "{}/b/{bucket}/o/{}",
            self.base(),
            utf8_percent_encode(object, OBJECT_NAME)
        )
    }

    async fn prepare(
        &self,
        builder: reqwest::RequestBuilder,
        options: &RequestOptions,
    ) -> Result<reqwest::RequestBuilder> {
        let headers = self.credentials.headers(&self.scopes).await?;
        let mut builder = builder.headers(headers);
        if let Some(timeout) = options.attempt_timeout() {
            builder = builder.timeout(*timeout);
        }
        Ok(builder)
    }

    async fn send_json<Resp>(
        &self,
        builder: reqwest::RequestBuilder,
        options: &RequestOptions,
    ) -> Result<Resp>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let builder = self.prepare(builder, options).await?;
        let response = builder.send().await.map_err(map_send_error)?;
        let payload = check_response(response).await?;
        serde_json::from_slice(&payload).map_err(Error::deser)
    }

    async fn send_empty(
        &self,
        builder: reqwest::RequestBuilder,
        options: &RequestOptions,
    ) -> Result<()> {
        let builder = self.prepare(builder, options).await?;
        let response = builder.send().await.map_err(map_send_error)?;
        check_response(response).await.map(|_| ())
    }
}

fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(e)
    } else {
        Error::io(e)
    }
}

/// Returns the payload of a successful response, or the error mapped from
/// the JSON API error envelope.
async fn check_response(response: reqwest::Response) -> Result<bytes::Bytes> {
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
    response.bytes().await.map_err(map_send_error)
}

#[async_trait::async_trait]
impl StorageStub for HttpStorage {
    async fn create_bucket(&self, bucket: Bucket, options: RequestOptions) -> Result<Bucket> {
        let builder = self
            .client
            .post(format!("{}/b", self.base()))
            .query(&[("project", self.project_id.as_str())])
            .json(&bucket);
        self.send_json(builder, &options).await
    }

    async fn get_bucket(&self, name: String, options: RequestOptions) -> Result<Bucket> {
        let builder = self.client.get(format!("{}/b/{name}", self.base()));
        self.send_json(builder, &options).await
    }

    async fn delete_bucket(&self, name: String, options: RequestOptions) -> Result<()> {
        let builder = self.client.delete(format!("{}/b/{name}", self.base()));
        self.send_empty(builder, &options).await
    }

    async fn list_buckets(
        &self,
        req: ListBucketsRequest,
        options: RequestOptions,
    ) -> Result<ListBucketsResponse> {
        let mut query = vec![("project", self.project_id.clone())];
        if !req.page_token.is_empty() {
            query.push(("pageToken", req.page_token));
        }
        if let Some(v) = req.max_results {
            query.push(("maxResults", v.to_string()));
        }
        if let Some(v) = req.prefix {
            query.push(("prefix", v));
        }
        let builder = self.client.get(format!("{}/b", self.base())).query(&query);
        self.send_json(builder, &options).await
    }

    async fn get_object(
        &self,
        bucket: String,
        object: String,
        options: RequestOptions,
    ) -> Result<Object> {
        let builder = self.client.get(self.object_path(&bucket, &object));
        self.send_json(builder, &options).await
    }

    async fn delete_object(
        &self,
        bucket: String,
        object: String,
        options: RequestOptions,
    ) -> Result<()> {
        let builder = self.client.delete(self.object_path(&bucket, &object));
        self.send_empty(builder, &options).await
    }

    async fn list_objects(
        &self,
        req: ListObjectsRequest,
        options: RequestOptions,
    ) -> Result<ListObjectsResponse> {
        let mut query = Vec::new();
        if !req.page_token.is_empty() {
            query.push(("pageToken", req.page_token));
        }
        if let Some(v) = req.max_results {
            query.push(("maxResults", v.to_string()));
        }
        if let Some(v) = req.prefix {
            query.push(("prefix", v));
        }
        let builder = self
            .client
            .get(format!("{}/b/{}/o", self.base(), req.bucket))
            .query(&query);
        self.send_json(builder, &options).await
    }

    async fn read_object(
        &self,
        bucket: String,
        object: String,
        options: RequestOptions,
    ) -> Result<bytes::Bytes> {
        let builder = self
            .client
            .get(self.object_path(&bucket, &object))
            .query(&[("alt", "media")]);
        let builder = self.prepare(builder, &options).await?;
        let response = builder.send().await.map_err(map_send_error)?;
        check_response(response).await
    }

    async fn insert_object(
        &self,
        bucket: String,
        object: String,
        data: bytes::Bytes,
        options: RequestOptions,
    ) -> Result<Object> {
        let builder = self
            .client
            .post(format!("{}/b/{bucket}/o", self.upload_base()))
            .query(&[("uploadType", "media"), ("name", object.as_str())])
            .header("content-type", "application/octet-stream")
            .body(data);
        self.send_json(builder, &options).await
    }

    async fn start_resumable_upload(
        &self,
        bucket: String,
        object: String,
        options: RequestOptions,
    ) -> Result<String> {
        let builder = self
            .client
            .post(format!("{}/b/{bucket}/o", self.upload_base()))
            .query(&[("uploadType", "resumable"), ("name", object.as_str())]);
        let builder = self.prepare(builder, &options).await?;
        let response = builder.send().await.map_err(map_send_error)?;
        let location = response
            .headers()
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let _ = check_response(response).await?;
        location.ok_or_else(|| {
            Error::deser("the resumable upload response has no Location header")
        })
    }

    async fn upload_chunk(
        &self,
        upload_url: String,
        offset: u64,
        data: bytes::Bytes,
        total_size: Option<u64>,
        options: RequestOptions,
    ) -> Result<ResumableUploadStatus> {
        let total = total_size
            .map(|t| t.to_string())
            .unwrap_or_else(|| "*".to_string());
        let range = if data.is_empty() {
            format!("bytes */{total}")
        } else {
            format!("bytes {}-{}/{total}", offset, offset + data.len() as u64 - 1)
        };
        let builder = self
            .client
            .put(upload_url)
            .header("content-type", "application/octet-stream")
            .header("Content-Range", range)
            .body(data);
        let builder = self.prepare(builder, &options).await?;
        let response = builder.send().await.map_err(map_send_error)?;

        // 308 signals the upload is incomplete, the Range header carries
        // how much the service has persisted.
        if response.status().as_u16() == 308 {
            let persisted = response
                .headers()
                .get(http::header::RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_range_end)
                .map_or(0, |end| end + 1);
            return Ok(ResumableUploadStatus::Partial(persisted));
        }
        let payload = check_response(response).await?;
        let object = serde_json::from_slice(&payload).map_err(Error::deser)?;
        Ok(ResumableUploadStatus::Finalized(Box::new(object)))
    }
}

/// Parses the end of a `bytes=0-{end}` range header.
fn parse_range_end(value: &str) -> Option<u64> {
    value
        .strip_prefix("bytes=")?
        .split_once('-')
        .and_then(|(_, end)| end.parse::<u64>().ok())
}
