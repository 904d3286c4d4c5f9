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

//! The error type returned by all client builders.

/// An alias of [std::result::Result] for client builders.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors detected while building a client.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A required configuration field was never set.
    #[error("the {0} configuration is required and was not set")]
    MissingField(&'static str),

    /// The transport could not be created from the configuration.
    #[error("cannot create the transport: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// A problem creating the transport.
    pub fn transport<T: Into<Box<dyn std::error::Error + Send + Sync>>>(source: T) -> Self {
        Self::Transport(source.into())
    }
}
