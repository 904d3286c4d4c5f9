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

//! The credentials seam consumed by the transport implementations.
//!
//! This crate does not implement OAuth2 or any other authentication flow.
//! The clients only need a source of request headers, injected through the
//! [Credentials] trait. Applications bring their own implementation, often
//! wrapping a token cache, or use [StaticTokenCredentials] with a
//! pre-acquired token.

use crate::Result;
use crate::error::Error;
use http::{HeaderMap, HeaderValue};
use std::sync::Arc;

/// A source of authentication headers for each request.
#[async_trait::async_trait]
pub trait Credentials: Send + Sync + std::fmt::Debug {
    /// Returns the headers to attach to a request.
    ///
    /// The OAuth2 scopes required by the service are passed in. Token
    /// sources that do not use scopes ignore them. Implementations may need
    /// to perform I/O to refresh a cached token, failures surface as
    /// [authentication][Error::is_authentication] errors.
    async fn headers(&self, scopes: &[String]) -> Result<HeaderMap>;
}

/// Credentials shared by all the requests in a client.
pub type SharedCredentials = Arc<dyn Credentials>;

/// Credentials that attach no headers.
///
/// Useful against emulators and test servers that perform no authentication.
#[derive(Clone, Debug, Default)]
pub struct AnonymousCredentials;

#[async_trait::async_trait]
impl Credentials for AnonymousCredentials {
    async fn headers(&self, _scopes: &[String]) -> Result<HeaderMap> {
        Ok(HeaderMap::new())
    }
}

/// Credentials wrapping a pre-acquired OAuth2 access token.
///
/// The token is used as-is, it is never refreshed.
#[derive(Clone)]
pub struct StaticTokenCredentials {
    token: String,
}

impl StaticTokenCredentials {
    pub fn new<T: Into<String>>(token: T) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token is a secret, do not include it in the output.
        f.debug_struct("StaticTokenCredentials")
            .field("token", &"[censored]")
            .finish()
    }
}

#[async_trait::async_trait]
impl Credentials for StaticTokenCredentials {
    async fn headers(&self, _scopes: &[String]) -> Result<HeaderMap> {
        let value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(Error::authentication)?;
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, value);
        Ok(headers)
    }
}

/// Credentials for tests.
pub mod testing {
    use super::*;

    /// Returns credentials that produce a fixed, obviously fake, token.
    pub fn test_credentials() -> SharedCredentials {
        Arc::new(StaticTokenCredentials::new("test-only-token"))
    }
}
