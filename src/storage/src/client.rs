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
use crate::stub::StorageStub;
use crate::transport::HttpStorage;
use crate::upload::{PerformUpload, RESUMABLE_UPLOAD_QUANTUM};
use crate::upload_source::{InsertPayload, StreamingSource};
use gax::credentials::{AnonymousCredentials, SharedCredentials};
use gax::error::Error;
use gax::options::RequestOptions;
use gax::paginator::Paginator;
use std::sync::Arc;

/// The default service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// The OAuth2 scopes used by this client.
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/devstorage.read_write"];

/// The default buffering threshold before an upload switches to the
/// resumable protocol.
pub const DEFAULT_RESUMABLE_UPLOAD_THRESHOLD: usize = 4 * RESUMABLE_UPLOAD_QUANTUM;

/// A builder for [Storage].
pub struct ClientBuilder {
    project_id: Option<String>,
    endpoint: String,
    scopes: Vec<String>,
    credentials: Option<SharedCredentials>,
    http_client: Option<reqwest::Client>,
    resumable_upload_threshold: usize,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            project_id: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            credentials: None,
            http_client: None,
            resumable_upload_threshold: DEFAULT_RESUMABLE_UPLOAD_THRESHOLD,
        }
    }

    /// Sets the project used for bucket operations. Required.
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

    /// Changes the default buffering threshold for uploads.
    pub fn with_resumable_upload_threshold(mut self, v: usize) -> Self {
        self.resumable_upload_threshold = v;
        self
    }

    /// Builds the client.
    pub fn build(self) -> gax::client_builder::Result<Storage> {
        use gax::client_builder::Error;
        let project_id = self.project_id.ok_or(Error::MissingField("project_id"))?;
        let client = self.http_client.unwrap_or_default();
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(AnonymousCredentials));
        let transport = HttpStorage::new(
            client,
            self.endpoint,
            project_id.clone(),
            credentials,
            self.scopes,
        );
        let mut storage = Storage::from_stub(transport, project_id);
        storage.resumable_upload_threshold = self.resumable_upload_threshold;
        Ok(storage)
    }
}

/// Implements a client for the Cloud Storage API.
///
/// # Pooling and Cloning
///
/// `Storage` holds a connection pool internally, it is advised to create
/// one and then reuse it. You do not need to wrap `Storage` in an
/// [Rc](std::rc::Rc) or [Arc] to reuse it, because it already uses an `Arc`
/// internally.
#[derive(Clone, Debug)]
pub struct Storage {
    inner: Arc<dyn StorageStub>,
    project_id: String,
    resumable_upload_threshold: usize,
}

impl Storage {
    /// Returns a builder for [Storage].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client over a custom stub, typically a mock.
    pub fn from_stub<S, T>(stub: S, project_id: T) -> Self
    where
        S: StorageStub + 'static,
        T: Into<String>,
    {
        Self {
            inner: Arc::new(stub),
            project_id: project_id.into(),
            resumable_upload_threshold: DEFAULT_RESUMABLE_UPLOAD_THRESHOLD,
        }
    }

    /// The project this client is scoped to.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Creates a new bucket.
    pub async fn create_bucket(&self, bucket: Bucket) -> Result<Bucket> {
        self.inner
            .create_bucket(bucket, RequestOptions::default())
            .await
    }

    /// Fetches the metadata of a bucket.
    pub async fn get_bucket<T: Into<String>>(&self, name: T) -> Result<Bucket> {
        self.inner
            .get_bucket(name.into(), RequestOptions::default())
            .await
    }

    /// Deletes an empty bucket.
    pub async fn delete_bucket<T: Into<String>>(&self, name: T) -> Result<()> {
        self.inner
            .delete_bucket(name.into(), RequestOptions::default())
            .await
    }

    /// Lists the buckets in the project, returning a stream of pages.
    pub fn list_buckets(&self) -> Paginator<ListBucketsResponse, Error> {
        self.list_buckets_request(ListBucketsRequest::default())
    }

    /// Lists buckets with a fully specified request.
    pub fn list_buckets_request(
        &self,
        req: ListBucketsRequest,
    ) -> Paginator<ListBucketsResponse, Error> {
        let inner = self.inner.clone();
        let execute = move |token: String| {
            let mut req = req.clone();
            let inner = inner.clone();
            req.page_token = token;
            async move { inner.list_buckets(req, RequestOptions::default()).await }
        };
        Paginator::new(String::new(), execute)
    }

    /// Fetches the metadata of an object.
    pub async fn get_object<B, O>(&self, bucket: B, object: O) -> Result<Object>
    where
        B: Into<String>,
        O: Into<String>,
    {
        self.inner
            .get_object(bucket.into(), object.into(), RequestOptions::default())
            .await
    }

    /// Deletes an object.
    pub async fn delete_object<B, O>(&self, bucket: B, object: O) -> Result<()>
    where
        B: Into<String>,
        O: Into<String>,
    {
        self.inner
            .delete_object(bucket.into(), object.into(), RequestOptions::default())
            .await
    }

    /// Lists the objects in a bucket, returning a stream of pages.
    pub fn list_objects<B: Into<String>>(&self, bucket: B) -> Paginator<ListObjectsResponse, Error> {
        self.list_objects_request(ListObjectsRequest::new(bucket))
    }

    /// Lists objects with a fully specified request.
    pub fn list_objects_request(
        &self,
        req: ListObjectsRequest,
    ) -> Paginator<ListObjectsResponse, Error> {
        let inner = self.inner.clone();
        let execute = move |token: String| {
            let mut req = req.clone();
            let inner = inner.clone();
            req.page_token = token;
            async move { inner.list_objects(req, RequestOptions::default()).await }
        };
        Paginator::new(String::new(), execute)
    }

    /// A simple download into a buffer.
    pub async fn read_object<B, O>(&self, bucket: B, object: O) -> Result<bytes::Bytes>
    where
        B: Into<String>,
        O: Into<String>,
    {
        self.inner
            .read_object(bucket.into(), object.into(), RequestOptions::default())
            .await
    }

    /// Uploads an object from a streaming source.
    ///
    /// The source length does not need to be known in advance: small
    /// payloads are sent in a single request, payloads whose buffered size
    /// exceeds the [threshold][ClientBuilder::with_resumable_upload_threshold]
    /// switch to the resumable protocol. Dropping the returned builder, or
    /// the future produced by [send()][UploadObject::send], stops the
    /// upload and stops consuming the source.
    ///
    /// # Example
    /// ```no_run
    /// # use gcloud_storage::client::Storage;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// let response = client
    ///     .upload_object("my-bucket", "my-object", "hello world")
    ///     .send()
    ///     .await?;
    /// println!("response details={response:?}");
    /// # Ok(()) }
    /// ```
    pub fn upload_object<B, O, T, P>(&self, bucket: B, object: O, payload: T) -> UploadObject<P>
    where
        B: Into<String>,
        O: Into<String>,
        T: Into<InsertPayload<P>>,
        P: StreamingSource,
    {
        UploadObject {
            stub: self.inner.clone(),
            bucket: bucket.into(),
            object: object.into(),
            payload: payload.into(),
            threshold: self.resumable_upload_threshold,
            options: RequestOptions::default(),
        }
    }
}

/// A pending upload operation.
pub struct UploadObject<S> {
    stub: Arc<dyn StorageStub>,
    bucket: String,
    object: String,
    payload: InsertPayload<S>,
    threshold: usize,
    options: RequestOptions,
}

impl<S> UploadObject<S>
where
    S: StreamingSource + 'static,
{
    /// Changes the buffering threshold for this upload only.
    pub fn with_resumable_upload_threshold(mut self, v: usize) -> Self {
        self.threshold = v;
        self
    }

    /// Sets the per-attempt timeout for the requests made by this upload.
    pub fn with_attempt_timeout<T: Into<std::time::Duration>>(mut self, v: T) -> Self {
        self.options.set_attempt_timeout(v);
        self
    }

    /// Performs the upload.
    pub async fn send(self) -> Result<Object> {
        PerformUpload::new(
            self.stub,
            self.bucket,
            self.object,
            self.payload,
            self.threshold,
            self.options,
        )
        .send()
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::tests::MockStorageStub;

    #[tokio::test]
    async fn list_buckets_pages() -> anyhow::Result<()> {
        let mut seq = mockall::Sequence::new();
        let mut mock = MockStorageStub::new();
        mock.expect_list_buckets()
            .once()
            .in_sequence(&mut seq)
            .withf(|req, _| req.page_token.is_empty())
            .returning(|_, _| {
                Ok(ListBucketsResponse {
                    items: vec![Bucket::default().set_name("a")],
                    next_page_token: "t1".to_string(),
                })
            });
        mock.expect_list_buckets()
            .once()
            .in_sequence(&mut seq)
            .withf(|req, _| req.page_token == "t1")
            .returning(|_, _| {
                Ok(ListBucketsResponse {
                    items: vec![Bucket::default().set_name("b")],
                    next_page_token: String::new(),
                })
            });

        let client = Storage::from_stub(mock, "p");
        let mut names = Vec::new();
        let mut stream = client.list_buckets().items();
        while let Some(bucket) = stream.next().await {
            names.push(bucket?.name);
        }
        assert_eq!(names, vec!["a", "b"]);
        Ok(())
    }

    #[tokio::test]
    async fn object_operations() -> anyhow::Result<()> {
        let mut mock = MockStorageStub::new();
        mock.expect_get_object()
            .once()
            .withf(|bucket, object, _| bucket == "b" && object == "o")
            .returning(|_, object, _| Ok(Object::default().set_name(object)));
        mock.expect_delete_object()
            .once()
            .returning(|_, _, _| Ok(()));
        mock.expect_read_object()
            .once()
            .returning(|_, _, _| Ok(bytes::Bytes::from_static(b"contents")));

        let client = Storage::from_stub(mock, "p");
        let object = client.get_object("b", "o").await?;
        assert_eq!(object.name, "o");
        client.delete_object("b", "o").await?;
        let data = client.read_object("b", "o").await?;
        assert_eq!(&data[..], b"contents");
        Ok(())
    }

    #[tokio::test]
    async fn upload_object_uses_client_threshold() -> anyhow::Result<()> {
        let mut mock = MockStorageStub::new();
        // A one-byte payload with a zero threshold goes straight to the
        // resumable protocol.
        mock.expect_start_resumable_upload()
            .once()
            .returning(|_, _, _| Ok("url".to_string()));
        mock.expect_upload_chunk().once().returning(|_, _, _, _, _| {
            Ok(ResumableUploadStatus::Finalized(Box::new(
                Object::default(),
            )))
        });

        let client = Storage::from_stub(mock, "p");
        client
            .upload_object("b", "o", "x")
            .with_resumable_upload_threshold(0)
            .send()
            .await?;
        Ok(())
    }
}
