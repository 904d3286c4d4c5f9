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
    Bucket, ListBucketsRequest, ListBucketsResponse, ListObjectsRequest, ListObjectsResponse,
    Object, ResumableUploadStatus,
};
use gax::Result;
use gax::options::RequestOptions;

/// The transport interface of the Storage service.
///
/// The default implementation translates calls into HTTP requests against
/// the JSON API. Applications may provide their own implementation in
/// mocks.
#[async_trait::async_trait]
pub trait StorageStub: Send + Sync + std::fmt::Debug {
    /// Creates a new bucket.
    async fn create_bucket(&self, bucket: Bucket, options: RequestOptions) -> Result<Bucket>;

    /// Fetches the metadata of a bucket.
    async fn get_bucket(&self, name: String, options: RequestOptions) -> Result<Bucket>;

    /// Deletes an empty bucket.
    async fn delete_bucket(&self, name: String, options: RequestOptions) -> Result<()>;

    /// Lists the buckets of the configured project.
    async fn list_buckets(
        &self,
        req: ListBucketsRequest,
        options: RequestOptions,
    ) -> Result<ListBucketsResponse>;

    /// Fetches the metadata of an object.
    async fn get_object(
        &self,
        bucket: String,
        object: String,
        options: RequestOptions,
    ) -> Result<Object>;

    /// Deletes an object.
    async fn delete_object(
        &self,
        bucket: String,
        object: String,
        options: RequestOptions,
    ) -> Result<()>;

    /// Lists the objects in a bucket.
    async fn list_objects(
        &self,
        req: ListObjectsRequest,
        options: RequestOptions,
    ) -> Result<ListObjectsResponse>;

    /// Downloads the data of an object.
    async fn read_object(
        &self,
        bucket: String,
        object: String,
        options: RequestOptions,
    ) -> Result<bytes::Bytes>;

    /// Uploads an object in a single request.
    async fn insert_object(
        &self,
        bucket: String,
        object: String,
        data: bytes::Bytes,
        options: RequestOptions,
    ) -> Result<Object>;

    /// Starts a resumable upload session, returning the session URL.
    async fn start_resumable_upload(
        &self,
        bucket: String,
        object: String,
        options: RequestOptions,
    ) -> Result<String>;

    /// Uploads one chunk of a resumable session.
    ///
    /// `total_size` is `None` while the stream length is still unknown, and
    /// set on the final chunk.
    async fn upload_chunk(
        &self,
        upload_url: String,
        offset: u64,
        data: bytes::Bytes,
        total_size: Option<u64>,
        options: RequestOptions,
    ) -> Result<ResumableUploadStatus>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    mockall::mock! {
        #[derive(Debug)]
        pub(crate) StorageStub {}
        #[async_trait::async_trait]
        impl StorageStub for StorageStub {
            async fn create_bucket(&self, bucket: Bucket, options: RequestOptions) -> Result<Bucket>;
            async fn get_bucket(&self, name: String, options: RequestOptions) -> Result<Bucket>;
            async fn delete_bucket(&self, name: String, options: RequestOptions) -> Result<()>;
            async fn list_buckets(&self, req: ListBucketsRequest, options: RequestOptions) -> Result<ListBucketsResponse>;
            async fn get_object(&self, bucket: String, object: String, options: RequestOptions) -> Result<Object>;
            async fn delete_object(&self, bucket: String, object: String, options: RequestOptions) -> Result<()>;
            async fn list_objects(&self, req: ListObjectsRequest, options: RequestOptions) -> Result<ListObjectsResponse>;
            async fn read_object(&self, bucket: String, object: String, options: RequestOptions) -> Result<bytes::Bytes>;
            async fn insert_object(&self, bucket: String, object: String, data: bytes::Bytes, options: RequestOptions) -> Result<Object>;
            async fn start_resumable_upload(&self, bucket: String, object: String, options: RequestOptions) -> Result<String>;
            async fn upload_chunk(&self, upload_url: String, offset: u64, data: bytes::Bytes, total_size: Option<u64>, options: RequestOptions) -> Result<ResumableUploadStatus>;
        }
    }
}
