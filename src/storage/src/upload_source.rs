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

//! Defines upload data sources.

/// Provides bytes for an upload from single-pass sources.
///
/// The length of the stream does not need to be known in advance. The
/// client buffers the data until it can choose between a single-request
/// upload and the resumable upload protocol.
pub trait StreamingSource: Send {
    /// The error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Gets the next set of data to upload. `None` when the stream ends.
    fn next(&mut self) -> impl Future<Output = Option<Result<bytes::Bytes, Self::Error>>> + Send;
}

/// The payload for [upload_object()][crate::client::Storage::upload_object].
///
/// `upload_object()` consumes any type that can be converted to this type.
/// That includes simple buffers, and any type implementing
/// [StreamingSource].
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use gcloud_storage::upload_source::{InsertPayload, StreamingSource};
/// let buffer: &'static [u8] = b"the quick brown fox jumps over the lazy dog";
/// let mut size = 0_usize;
/// let mut payload = InsertPayload::from(buffer);
/// while let Some(bytes) = payload.next().await.transpose()? {
///     size += bytes.len();
/// }
/// assert_eq!(size, 43);
/// # anyhow::Result::<()>::Ok(()) });
/// ```
pub struct InsertPayload<T> {
    payload: T,
}

impl<T> StreamingSource for InsertPayload<T>
where
    T: StreamingSource,
{
    type Error = T::Error;

    fn next(&mut self) -> impl Future<Output = Option<Result<bytes::Bytes, Self::Error>>> + Send {
        self.payload.next()
    }
}

impl From<bytes::Bytes> for InsertPayload<BytesSource> {
    fn from(value: bytes::Bytes) -> Self {
        Self {
            payload: BytesSource::new(value),
        }
    }
}

impl From<&'static str> for InsertPayload<BytesSource> {
    fn from(value: &'static str) -> Self {
        InsertPayload::from(bytes::Bytes::from_static(value.as_bytes()))
    }
}

impl From<Vec<u8>> for InsertPayload<BytesSource> {
    fn from(value: Vec<u8>) -> Self {
        InsertPayload::from(bytes::Bytes::from(value))
    }
}

impl From<String> for InsertPayload<BytesSource> {
    fn from(value: String) -> Self {
        InsertPayload::from(bytes::Bytes::from(value))
    }
}

impl<S> From<S> for InsertPayload<S>
where
    S: StreamingSource,
{
    fn from(value: S) -> Self {
        Self { payload: value }
    }
}

/// Wraps a `bytes::Bytes` to support `StreamingSource`.
pub struct BytesSource {
    current: Option<bytes::Bytes>,
}

impl BytesSource {
    pub(crate) fn new(contents: bytes::Bytes) -> Self {
        Self {
            current: Some(contents),
        }
    }
}

impl StreamingSource for BytesSource {
    type Error = crate::Error;

    async fn next(&mut self) -> Option<Result<bytes::Bytes, Self::Error>> {
        self.current.take().map(Result::Ok)
    }
}

/// Wraps an iterator of buffers to support `StreamingSource`.
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I> {
    pub fn new<T>(collection: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: collection.into_iter(),
        }
    }
}

impl<I> StreamingSource for IterSource<I>
where
    I: Iterator<Item = bytes::Bytes> + Send,
{
    type Error = crate::Error;

    async fn next(&mut self) -> Option<Result<bytes::Bytes, Self::Error>> {
        self.iter.next().map(Result::Ok)
    }
}

const READ_SIZE: usize = 256 * 1024;

impl<S> StreamingSource for S
where
    S: tokio::io::AsyncRead + Unpin + Send,
{
    type Error = std::io::Error;

    async fn next(&mut self) -> Option<Result<bytes::Bytes, Self::Error>> {
        let mut buffer = vec![0_u8; READ_SIZE];
        match tokio::io::AsyncReadExt::read(self, &mut buffer).await {
            Err(e) => Some(Err(e)),
            Ok(0) => None,
            Ok(n) => {
                buffer.resize(n, 0_u8);
                Some(Ok(bytes::Bytes::from_owner(buffer)))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const CONTENTS: &[u8] = b"how vexingly quick daft zebras jump";

    pub(crate) async fn collect<S>(mut source: S) -> anyhow::Result<Vec<u8>>
    where
        S: StreamingSource,
    {
        let mut vec = Vec::new();
        while let Some(bytes) = source.next().await.transpose()? {
            vec.extend_from_slice(&bytes);
        }
        Ok(vec)
    }

    #[tokio::test]
    async fn empty_bytes() -> anyhow::Result<()> {
        let payload = InsertPayload::from(bytes::Bytes::default());
        let got = collect(payload).await?;
        assert!(got.is_empty(), "{got:?}");
        Ok(())
    }

    #[tokio::test]
    async fn simple_bytes() -> anyhow::Result<()> {
        let payload = InsertPayload::from(bytes::Bytes::from_static(CONTENTS));
        let got = collect(payload).await?;
        assert_eq!(got[..], CONTENTS[..]);
        Ok(())
    }

    #[tokio::test]
    async fn simple_str() -> anyhow::Result<()> {
        let payload = InsertPayload::from("hello");
        let got = collect(payload).await?;
        assert_eq!(got[..], b"hello"[..]);
        Ok(())
    }

    #[tokio::test]
    async fn iter_source() -> anyhow::Result<()> {
        let source = IterSource::new(vec![
            bytes::Bytes::from_static(b"how "),
            bytes::Bytes::from_static(b"vexingly"),
        ]);
        let got = collect(source).await?;
        assert_eq!(got[..], b"how vexingly"[..]);
        Ok(())
    }

    #[tokio::test]
    async fn async_read_source() -> anyhow::Result<()> {
        let cursor = std::io::Cursor::new(CONTENTS.to_vec());
        let got = collect(cursor).await?;
        assert_eq!(got[..], CONTENTS[..]);
        Ok(())
    }
}
