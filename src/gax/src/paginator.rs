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

//! Adapters to consume list RPCs as pages or as lazy item streams.
//!
//! List operations in Google Cloud services return results in pages, each
//! page carrying a continuation token for the next one. The types in this
//! module drive the page fetches: either one [Page] at a time, or as a
//! [futures::Stream] over pages or items.
//!
//! The streams are lazy. Dropping a stream, or simply not polling it,
//! fetches no further pages. That is the cancellation mechanism: callers
//! stop consuming and the fetch loop stops with them.

use futures::stream::unfold;
use futures::{Stream, StreamExt};
use pin_project::pin_project;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

/// Describes a type that can be iterated over asyncly when used with [Paginator].
pub trait PageableResponse {
    /// The type of the items in the page.
    type PageItem;

    /// The continuation token for the next page. Empty when this is the
    /// last page.
    fn next_page_token(&self) -> String;

    /// Consumes the response, returning the items in the page.
    fn into_items(self) -> Vec<Self::PageItem>;
}

/// An adapter that converts list RPCs as defined by [AIP-4233](https://google.aip.dev/client-libraries/4233)
/// into a [futures::Stream] that can be iterated over in an async fashion.
#[pin_project]
pub struct Paginator<T, E> {
    #[pin]
    stream: Pin<Box<dyn Stream<Item = Result<T, E>> + Send>>,
}

type ControlFlow = std::ops::ControlFlow<(), String>;

impl<T, E> Paginator<T, E>
where
    T: PageableResponse,
{
    /// Creates a new [Paginator] given the initial page token and a function
    /// to fetch the next [PageableResponse].
    pub fn new<F>(seed_token: String, execute: impl Fn(String) -> F + Clone + Send + 'static) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let stream = unfold(ControlFlow::Continue(seed_token), move |state| {
            let execute = execute.clone();
            async move {
                let token = match state {
                    ControlFlow::Continue(token) => token,
                    ControlFlow::Break(_) => return None,
                };
                match execute(token).await {
                    Ok(page_resp) => {
                        let tok = page_resp.next_page_token();
                        let next_state = if tok.is_empty() {
                            ControlFlow::Break(())
                        } else {
                            ControlFlow::Continue(tok)
                        };
                        Some((Ok(page_resp), next_state))
                    }
                    Err(e) => Some((Err(e), ControlFlow::Break(()))),
                }
            }
        });
        Self {
            stream: Box::pin(stream),
        }
    }

    /// Returns the next mutation of the wrapped stream.
    pub fn next(&mut self) -> futures::stream::Next<'_, Self> {
        StreamExt::next(self)
    }

    /// Converts the paginator into a stream over the individual items.
    pub fn items(self) -> ItemPaginator<T, E> {
        ItemPaginator::new(self)
    }

    /// Fetches the next page, consuming the paginator.
    ///
    /// Returns `None` when all pages have been returned. On success the
    /// returned [Page] holds the paginator, use [Page::next] to continue.
    pub async fn into_page(mut self) -> Option<Result<Page<T, E>, E>> {
        match self.next().await? {
            Err(e) => Some(Err(e)),
            Ok(resp) => {
                let is_last = resp.next_page_token().is_empty();
                Some(Ok(Page {
                    items: resp.into_items(),
                    is_last,
                    paginator: self,
                }))
            }
        }
    }
}

impl<T, E> Stream for Paginator<T, E> {
    type Item = Result<T, E>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.project().stream.poll_next(cx)
    }
}

/// A single page of a list operation.
///
/// # Example
/// ```no_run
/// # use gcloud_gax::paginator::{Page, Paginator, PageableResponse};
/// # async fn sample<T: PageableResponse>(paginator: Paginator<T, gcloud_gax::error::Error>)
/// # -> gcloud_gax::Result<()> {
/// let mut page = paginator.into_page().await.transpose()?;
/// while let Some(p) = page {
///     for _item in p.items() { /* ... */ }
///     if p.is_last() { break; }
///     page = p.next().await.transpose()?;
/// }
/// # Ok(()) }
/// ```
pub struct Page<T, E>
where
    T: PageableResponse,
{
    items: Vec<T::PageItem>,
    is_last: bool,
    paginator: Paginator<T, E>,
}

impl<T, E> Page<T, E>
where
    T: PageableResponse,
{
    /// The items in this page.
    pub fn items(&self) -> &[T::PageItem] {
        &self.items
    }

    /// Consumes the page, returning its items.
    pub fn into_items(self) -> Vec<T::PageItem> {
        self.items
    }

    /// If true, no further pages follow this one.
    pub fn is_last(&self) -> bool {
        self.is_last
    }

    /// Fetches the next page.
    ///
    /// Returns `None` if this was the last page.
    pub async fn next(self) -> Option<Result<Page<T, E>, E>> {
        if self.is_last {
            return None;
        }
        self.paginator.into_page().await
    }
}

/// An adapter that flattens a [Paginator] into a stream over the items.
#[pin_project]
pub struct ItemPaginator<T, E>
where
    T: PageableResponse,
{
    #[pin]
    stream: Paginator<T, E>,
    current: VecDeque<T::PageItem>,
}

impl<T, E> ItemPaginator<T, E>
where
    T: PageableResponse,
{
    fn new(paginator: Paginator<T, E>) -> Self {
        Self {
            stream: paginator,
            current: VecDeque::new(),
        }
    }

    /// Returns the next item of the wrapped stream.
    pub fn next(&mut self) -> futures::stream::Next<'_, Self> {
        StreamExt::next(self)
    }
}

impl<T, E> Stream for ItemPaginator<T, E>
where
    T: PageableResponse,
{
    type Item = Result<T::PageItem, E>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(item) = this.current.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }
            match futures::ready!(this.stream.as_mut().poll_next(cx)) {
                None => return Poll::Ready(None),
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                Some(Ok(page)) => {
                    *this.current = page.into_items().into();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct TestResponse {
        items: Vec<PageItem>,
        next_page_token: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct PageItem {
        name: String,
    }

    impl PageableResponse for TestResponse {
        type PageItem = PageItem;

        fn next_page_token(&self) -> String {
            self.next_page_token.clone()
        }

        fn into_items(self) -> Vec<PageItem> {
            self.items
        }
    }

    fn item(name: &str) -> PageItem {
        PageItem {
            name: name.to_string(),
        }
    }

    fn two_page_responses() -> VecDeque<TestResponse> {
        let mut responses = VecDeque::new();
        responses.push_back(TestResponse {
            items: vec![item("item1"), item("item2")],
            next_page_token: "token2".to_string(),
        });
        responses.push_back(TestResponse {
            items: vec![item("item3")],
            next_page_token: String::new(),
        });
        responses
    }

    type TestError = Box<dyn std::error::Error + Send + Sync>;

    fn paginator_over(
        responses: VecDeque<TestResponse>,
    ) -> Paginator<TestResponse, TestError> {
        let state = Arc::new(Mutex::new(responses));
        let execute = move |_token: String| {
            let resp = state.clone().lock().unwrap().pop_front().unwrap();
            async move { Ok(resp) }
        };
        Paginator::new(String::new(), execute)
    }

    #[tokio::test]
    async fn paginator_pages() {
        let mut resps = vec![];
        let mut stream = paginator_over(two_page_responses());
        while let Some(resp) = stream.next().await {
            resps.push(resp.unwrap());
        }
        assert_eq!(resps.len(), 2);
        assert_eq!(resps[0].items[0], item("item1"));
        assert_eq!(resps[0].items[1], item("item2"));
        assert_eq!(resps[1].items[0], item("item3"));
    }

    #[tokio::test]
    async fn paginator_tokens() {
        let mut expected_tokens = VecDeque::new();
        expected_tokens.push_back("token1".to_string());
        expected_tokens.push_back("token2".to_string());

        let state = Arc::new(Mutex::new(two_page_responses()));
        let tokens = Arc::new(Mutex::new(expected_tokens));
        let execute = move |token: String| {
            let expected_token = tokens.clone().lock().unwrap().pop_front().unwrap();
            assert_eq!(token, expected_token);
            let resp = state.clone().lock().unwrap().pop_front().unwrap();
            async move { Ok::<_, TestError>(resp) }
        };

        let mut stream = Paginator::new("token1".to_string(), execute);
        let mut count = 0;
        while let Some(resp) = stream.next().await {
            assert!(resp.is_ok());
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn item_paginator() {
        let mut names = vec![];
        let mut stream = paginator_over(two_page_responses()).items();
        while let Some(i) = stream.next().await {
            names.push(i.unwrap().name);
        }
        assert_eq!(names, vec!["item1", "item2", "item3"]);
    }

    #[tokio::test]
    async fn pages() {
        let page = paginator_over(two_page_responses())
            .into_page()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.items(), &[item("item1"), item("item2")]);
        assert!(!page.is_last());

        let page = page.next().await.unwrap().unwrap();
        assert_eq!(page.items(), &[item("item3")]);
        assert!(page.is_last());

        assert!(page.next().await.is_none());
    }

    #[tokio::test]
    async fn error_ends_stream() {
        let execute = |_| async { Err::<TestResponse, TestError>("err".into()) };
        let mut paginator = Paginator::new(String::new(), execute);
        let mut count = 0;
        while let Some(resp) = paginator.next().await {
            match resp {
                Ok(_) => panic!("should not succeed"),
                Err(e) => {
                    assert_eq!(e.to_string(), "err");
                    count += 1;
                }
            }
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn dropping_fetches_no_more_pages() {
        let calls = Arc::new(Mutex::new(0_usize));
        let counter = calls.clone();
        let execute = move |_token: String| {
            *counter.lock().unwrap() += 1;
            async move {
                Ok::<_, TestError>(TestResponse {
                    items: vec![item("x")],
                    next_page_token: "more".to_string(),
                })
            }
        };
        let mut stream = Paginator::new(String::new(), execute);
        let _ = stream.next().await;
        let _ = stream.next().await;
        drop(stream);
        // Only the polled pages were fetched, the stream is lazy.
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
