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

//! The upload strategy for streams of unknown length.
//!
//! The data is buffered until one of two things happens. If the stream ends
//! first, the whole payload is known and a single-request upload is used.
//! If the buffered size exceeds the configured threshold first, the upload
//! switches to the resumable protocol: the already-buffered bytes are
//! forwarded as the first chunks, and the rest of the stream follows.

use crate::model::{Object, ResumableUploadStatus};
use crate::stub::StorageStub;
use crate::upload_source::StreamingSource;
use bytes::{Buf, Bytes, BytesMut};
use gax::Result;
use gax::error::Error;
use gax::options::RequestOptions;
use std::sync::Arc;

/// Resumable upload chunks (except for the last chunk) *must* be sized to a
/// multiple of 256 KiB.
pub const RESUMABLE_UPLOAD_QUANTUM: usize = 256 * 1024;

pub(crate) struct PerformUpload<S> {
    stub: Arc<dyn StorageStub>,
    bucket: String,
    object: String,
    source: S,
    threshold: usize,
    options: RequestOptions,
}

impl<S> PerformUpload<S>
where
    S: StreamingSource,
{
    pub(crate) fn new(
        stub: Arc<dyn StorageStub>,
        bucket: String,
        object: String,
        source: S,
        threshold: usize,
        options: RequestOptions,
    ) -> Self {
        Self {
            stub,
            bucket,
            object,
            source,
            threshold,
            options,
        }
    }

    pub(crate) async fn send(mut self) -> Result<Object> {
        let mut buffer = BytesMut::new();
        loop {
            match self.source.next().await.transpose().map_err(Error::ser)? {
                None => {
                    // The stream ended within the threshold, the full
                    // payload is in memory.
                    return self.single_shot(buffer.freeze()).await;
                }
                Some(chunk) => {
                    buffer.extend_from_slice(&chunk);
                    if buffer.len() > self.threshold {
                        return self.resumable(buffer).await;
                    }
                }
            }
        }
    }

    async fn single_shot(self, data: Bytes) -> Result<Object> {
        tracing::debug!(size = data.len(), "upload fits in a single request");
        self.stub
            .insert_object(self.bucket, self.object, data, self.options)
            .await
    }

    async fn resumable(mut self, mut buffer: BytesMut) -> Result<Object> {
        tracing::debug!(
            buffered = buffer.len(),
            threshold = self.threshold,
            "switching to a resumable upload"
        );
        let upload_url = self
            .stub
            .start_resumable_upload(self.bucket.clone(), self.object.clone(), self.options.clone())
            .await?;
        // `buffer` holds the bytes not yet acknowledged by the service,
        // `offset` is the number of acknowledged bytes before them.
        let mut offset = 0_u64;
        let mut source_done = false;
        loop {
            while !source_done && buffer.len() < RESUMABLE_UPLOAD_QUANTUM {
                match self.source.next().await.transpose().map_err(Error::ser)? {
                    None => source_done = true,
                    Some(chunk) => buffer.extend_from_slice(&chunk),
                }
            }
            let (len, total_size) = if source_done {
                (buffer.len(), Some(offset + buffer.len() as u64))
            } else {
                (
                    (buffer.len() / RESUMABLE_UPLOAD_QUANTUM) * RESUMABLE_UPLOAD_QUANTUM,
                    None,
                )
            };
            let payload = Bytes::copy_from_slice(&buffer[..len]);
            let status = self
                .stub
                .upload_chunk(
                    upload_url.clone(),
                    offset,
                    payload,
                    total_size,
                    self.options.clone(),
                )
                .await?;
            match status {
                ResumableUploadStatus::Finalized(object) => return Ok(*object),
                ResumableUploadStatus::Partial(persisted) => {
                    if persisted <= offset || persisted > offset + len as u64 {
                        return Err(Error::io(format!(
                            "the service acknowledged {persisted} bytes, \
                             expected a value in ({offset}, {}]",
                            offset + len as u64
                        )));
                    }
                    // Unacknowledged bytes stay in the buffer and are
                    // resent in the next chunk.
                    buffer.advance((persisted - offset) as usize);
                    offset = persisted;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::tests::MockStorageStub;
    use crate::upload_source::IterSource;

    fn upload<S: StreamingSource>(
        mock: MockStorageStub,
        source: S,
        threshold: usize,
    ) -> PerformUpload<S> {
        PerformUpload::new(
            Arc::new(mock),
            "b".to_string(),
            "o".to_string(),
            source,
            threshold,
            RequestOptions::default(),
        )
    }

    fn chunked(data: &'static [u8], chunk: usize) -> IterSource<impl Iterator<Item = Bytes> + Send> {
        IterSource::new(
            data.chunks(chunk)
                .map(Bytes::from_static)
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn payload_at_threshold_uses_single_shot() -> anyhow::Result<()> {
        const THRESHOLD: usize = 1024;
        let mut mock = MockStorageStub::new();
        mock.expect_insert_object()
            .once()
            .withf(|bucket, object, data, _| {
                bucket == "b" && object == "o" && data.len() == THRESHOLD
            })
            .returning(|_, object, _, _| Ok(Object::default().set_name(object)));

        let source = chunked(&[0_u8; THRESHOLD], 100);
        let object = upload(mock, source, THRESHOLD).send().await?;
        assert_eq!(object.name, "o");
        Ok(())
    }

    #[tokio::test]
    async fn payload_over_threshold_switches_to_resumable() -> anyhow::Result<()> {
        const THRESHOLD: usize = 1024;
        let mut mock = MockStorageStub::new();
        mock.expect_start_resumable_upload()
            .once()
            .returning(|_, _, _| Ok("https://upload.test/session-1".to_string()));
        mock.expect_upload_chunk()
            .once()
            .withf(|url, offset, data, total, _| {
                url == "https://upload.test/session-1"
                    && *offset == 0
                    && data.len() == THRESHOLD + 1
                    && *total == Some(THRESHOLD as u64 + 1)
            })
            .returning(|_, _, _, _, _| {
                Ok(ResumableUploadStatus::Finalized(Box::new(
                    Object::default().set_name("o"),
                )))
            });
        mock.expect_insert_object().never();

        let source = chunked(&[0_u8; THRESHOLD + 1], 100);
        let object = upload(mock, source, THRESHOLD).send().await?;
        assert_eq!(object.name, "o");
        Ok(())
    }

    #[tokio::test]
    async fn resumable_sends_quantum_aligned_chunks() -> anyhow::Result<()> {
        // A payload of 2.5 quanta with a small threshold: the upload sends
        // full quanta while the stream is open, then the remainder.
        const TOTAL: usize = 2 * RESUMABLE_UPLOAD_QUANTUM + RESUMABLE_UPLOAD_QUANTUM / 2;
        static DATA: [u8; TOTAL] = [42_u8; TOTAL];

        let mut seq = mockall::Sequence::new();
        let mut mock = MockStorageStub::new();
        mock.expect_start_resumable_upload()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok("url".to_string()));
        mock.expect_upload_chunk()
            .once()
            .in_sequence(&mut seq)
            .withf(|_, offset, data, total, _| {
                *offset == 0 && data.len() == RESUMABLE_UPLOAD_QUANTUM && total.is_none()
            })
            .returning(|_, offset, data, _, _| {
                Ok(ResumableUploadStatus::Partial(offset + data.len() as u64))
            });
        mock.expect_upload_chunk()
            .once()
            .in_sequence(&mut seq)
            .withf(|_, offset, data, total, _| {
                *offset == RESUMABLE_UPLOAD_QUANTUM as u64
                    && data.len() == RESUMABLE_UPLOAD_QUANTUM
                    && total.is_none()
            })
            .returning(|_, offset, data, _, _| {
                Ok(ResumableUploadStatus::Partial(offset + data.len() as u64))
            });
        mock.expect_upload_chunk()
            .once()
            .in_sequence(&mut seq)
            .withf(|_, offset, data, total, _| {
                *offset == 2 * RESUMABLE_UPLOAD_QUANTUM as u64
                    && data.len() == RESUMABLE_UPLOAD_QUANTUM / 2
                    && *total == Some(TOTAL as u64)
            })
            .returning(|_, _, _, _, _| {
                Ok(ResumableUploadStatus::Finalized(Box::new(
                    Object::default().set_name("o"),
                )))
            });

        let source = chunked(&DATA, 100_000);
        let object = upload(mock, source, 1024).send().await?;
        assert_eq!(object.name, "o");
        Ok(())
    }

    #[tokio::test]
    async fn resumable_resends_unacknowledged_bytes() -> anyhow::Result<()> {
        // The service only persists half of the first chunk, the second
        // request must resend the rest.
        const TOTAL: usize = RESUMABLE_UPLOAD_QUANTUM + 8;
        static DATA: [u8; TOTAL] = [7_u8; TOTAL];
        const PERSISTED: u64 = RESUMABLE_UPLOAD_QUANTUM as u64 / 2;

        let mut seq = mockall::Sequence::new();
        let mut mock = MockStorageStub::new();
        mock.expect_start_resumable_upload()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok("url".to_string()));
        mock.expect_upload_chunk()
            .once()
            .in_sequence(&mut seq)
            .withf(|_, offset, data, _, _| {
                *offset == 0 && data.len() == RESUMABLE_UPLOAD_QUANTUM
            })
            .returning(|_, _, _, _, _| Ok(ResumableUploadStatus::Partial(PERSISTED)));
        mock.expect_upload_chunk()
            .once()
            .in_sequence(&mut seq)
            .withf(|_, offset, data, total, _| {
                *offset == PERSISTED
                    && data.len() == TOTAL - PERSISTED as usize
                    && *total == Some(TOTAL as u64)
            })
            .returning(|_, _, _, _, _| {
                Ok(ResumableUploadStatus::Finalized(Box::new(Object::default())))
            });

        let source = chunked(&DATA, 100_000);
        upload(mock, source, 1024).send().await?;
        Ok(())
    }

    #[tokio::test]
    async fn resumable_rejects_bogus_acknowledgements() {
        let mut mock = MockStorageStub::new();
        mock.expect_start_resumable_upload()
            .once()
            .returning(|_, _, _| Ok("url".to_string()));
        mock.expect_upload_chunk()
            .once()
            .returning(|_, _, _, _, _| Ok(ResumableUploadStatus::Partial(0)));

        let source = chunked(&[0_u8; 2048], 100_000);
        let err = upload(mock, source, 1024).send().await.unwrap_err();
        assert!(err.is_io(), "{err:?}");
    }

    #[tokio::test]
    async fn source_errors_become_serialization_errors() {
        #[derive(Default)]
        struct FailingSource;
        impl StreamingSource for FailingSource {
            type Error = std::io::Error;
            async fn next(&mut self) -> Option<Result<Bytes, Self::Error>> {
                Some(Err(std::io::Error::other("stream broke")))
            }
        }

        let mock = MockStorageStub::new();
        let err = upload(mock, FailingSource, 1024).send().await.unwrap_err();
        assert!(err.is_serialization(), "{err:?}");
        assert!(err.to_string().contains("stream broke"), "{err}");
    }

    #[tokio::test]
    async fn empty_source_uses_single_shot() -> anyhow::Result<()> {
        let mut mock = MockStorageStub::new();
        mock.expect_insert_object()
            .once()
            .withf(|_, _, data, _| data.is_empty())
            .returning(|_, _, _, _| Ok(Object::default()));

        let source = IterSource::new(Vec::<Bytes>::new());
        upload(mock, source, 1024).send().await?;
        Ok(())
    }
}
