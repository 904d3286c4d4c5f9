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

//! The resource types of the Cloud Storage JSON API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bucket.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Bucket {
    /// The name of the bucket, globally unique.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The location of the bucket, e.g. `US-EAST1`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,

    /// The bucket's default storage class.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub storage_class: String,

    /// The creation time, as an RFC 3339 string.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub time_created: String,

    /// The modification time, as an RFC 3339 string.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated: String,
}

impl Bucket {
    /// Sets the value of `name`.
    pub fn set_name<T: Into<String>>(mut self, v: T) -> Self {
        self.name = v.into();
        self
    }

    /// Sets the value of `location`.
    pub fn set_location<T: Into<String>>(mut self, v: T) -> Self {
        self.location = v.into();
        self
    }

    /// Sets the value of `storage_class`.
    pub fn set_storage_class<T: Into<String>>(mut self, v: T) -> Self {
        self.storage_class = v.into();
        self
    }
}

/// An object, the unit of data storage.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Object {
    /// The name of the object within the bucket.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The name of the bucket containing this object.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bucket: String,

    /// The size of the object data in bytes. The service encodes this as a
    /// decimal string.
    #[serde(with = "u64_string", skip_serializing_if = "is_zero")]
    pub size: u64,

    /// The content generation of this object.
    #[serde(with = "i64_string", skip_serializing_if = "is_zero_i64")]
    pub generation: i64,

    /// The `Content-Type` of the object data.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content_type: String,

    /// User-provided metadata, in key/value pairs.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    /// The creation time, as an RFC 3339 string.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub time_created: String,
}

impl Object {
    /// Sets the value of `name`.
    pub fn set_name<T: Into<String>>(mut self, v: T) -> Self {
        self.name = v.into();
        self
    }

    /// Sets the value of `bucket`.
    pub fn set_bucket<T: Into<String>>(mut self, v: T) -> Self {
        self.bucket = v.into();
        self
    }

    /// Sets the value of `content_type`.
    pub fn set_content_type<T: Into<String>>(mut self, v: T) -> Self {
        self.content_type = v.into();
        self
    }
}

/// The request to list buckets in a project.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct ListBucketsRequest {
    /// The maximum number of buckets per page.
    pub max_results: Option<i32>,

    /// The continuation token from a previous page.
    pub page_token: String,

    /// Restricts the results to buckets whose names begin with this prefix.
    pub prefix: Option<String>,
}

impl ListBucketsRequest {
    /// Sets the value of `max_results`.
    pub fn set_max_results(mut self, v: i32) -> Self {
        self.max_results = Some(v);
        self
    }

    /// Sets the value of `prefix`.
    pub fn set_prefix<T: Into<String>>(mut self, v: T) -> Self {
        self.prefix = Some(v.into());
        self
    }
}

/// One page of bucket listing results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListBucketsResponse {
    /// The buckets in this page.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Bucket>,

    /// The continuation token, empty on the last page.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}

impl gax::paginator::PageableResponse for ListBucketsResponse {
    type PageItem = Bucket;

    fn next_page_token(&self) -> String {
        self.next_page_token.clone()
    }

    fn into_items(self) -> Vec<Bucket> {
        self.items
    }
}

/// The request to list objects in a bucket.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct ListObjectsRequest {
    /// The bucket to list.
    pub bucket: String,

    /// The maximum number of objects per page.
    pub max_results: Option<i32>,

    /// The continuation token from a previous page.
    pub page_token: String,

    /// Restricts the results to objects whose names begin with this prefix.
    pub prefix: Option<String>,
}

impl ListObjectsRequest {
    /// Creates a request for the given bucket.
    pub fn new<T: Into<String>>(bucket: T) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Sets the value of `max_results`.
    pub fn set_max_results(mut self, v: i32) -> Self {
        self.max_results = Some(v);
        self
    }

    /// Sets the value of `prefix`.
    pub fn set_prefix<T: Into<String>>(mut self, v: T) -> Self {
        self.prefix = Some(v.into());
        self
    }
}

/// One page of object listing results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListObjectsResponse {
    /// The objects in this page.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Object>,

    /// The continuation token, empty on the last page.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}

impl gax::paginator::PageableResponse for ListObjectsResponse {
    type PageItem = Object;

    fn next_page_token(&self) -> String {
        self.next_page_token.clone()
    }

    fn into_items(self) -> Vec<Object> {
        self.items
    }
}

/// The state of a resumable upload session after a chunk is sent.
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub enum ResumableUploadStatus {
    /// The upload completed, the service created the object.
    Finalized(Box<Object>),

    /// The upload is incomplete, the service has persisted the given number
    /// of bytes.
    Partial(u64),
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

/// The JSON API encodes 64-bit sizes as decimal strings.
mod u64_string {
    use serde::Deserialize;

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MaybeQuoted {
            Num(u64),
            Str(String),
        }
        match MaybeQuoted::deserialize(deserializer)? {
            MaybeQuoted::Num(v) => Ok(v),
            MaybeQuoted::Str(s) => s.parse::<u64>().map_err(D::Error::custom),
        }
    }
}

mod i64_string {
    use serde::Deserialize;

    pub fn serialize<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MaybeQuoted {
            Num(i64),
            Str(String),
        }
        match MaybeQuoted::deserialize(deserializer)? {
            MaybeQuoted::Num(v) => Ok(v),
            MaybeQuoted::Str(s) => s.parse::<i64>().map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_serde() -> anyhow::Result<()> {
        let object = serde_json::from_value::<Object>(json!({
            "name": "greeting.txt",
            "bucket": "my-bucket",
            "size": "11",
            "generation": "1234",
            "contentType": "text/plain",
            "metadata": {"owner": "me"}
        }))?;
        assert_eq!(object.name, "greeting.txt");
        assert_eq!(object.size, 11);
        assert_eq!(object.generation, 1234);
        assert_eq!(object.metadata.get("owner").map(String::as_str), Some("me"));

        let value = serde_json::to_value(&object)?;
        assert_eq!(value.get("size"), Some(&json!("11")));
        Ok(())
    }

    #[test]
    fn object_size_accepts_numbers() -> anyhow::Result<()> {
        let object = serde_json::from_value::<Object>(json!({"size": 11}))?;
        assert_eq!(object.size, 11);
        Ok(())
    }

    #[test]
    fn list_paging() {
        use gax::paginator::PageableResponse;
        let response = ListObjectsResponse {
            items: vec![Object::default().set_name("a")],
            next_page_token: "token".to_string(),
        };
        assert_eq!(response.next_page_token(), "token");
        assert_eq!(response.into_items().len(), 1);
    }
}
