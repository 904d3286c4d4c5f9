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

use super::rpc::{Code, Status};
use http::HeaderMap;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The core error returned by all client libraries.
///
/// Most applications will just return the error or log it, without any
/// further action. Applications that need to interrogate the error can use
/// the predicates to determine the error kind, and the accessors to query
/// the most common details. The error [source][std::error::Error::source]
/// provides deeper information.
///
/// # Example
/// ```
/// use gcloud_gax::error::Error;
/// use gcloud_gax::error::rpc::{Code, Status};
/// fn handle(result: gcloud_gax::Result<String>) {
///     match result {
///         Err(e) if e.status().is_some() => println!("service error {e}"),
///         Err(e) if e.is_timeout() => println!("not enough time {e}"),
///         Err(e) => println!("some other error {e}"),
///         Ok(_) => println!("success"),
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

impl Error {
    /// Creates an error with the information returned by Google Cloud services.
    pub fn service(status: Status) -> Self {
        let details = ServiceDetails {
            status,
            status_code: None,
            headers: None,
        };
        Self {
            kind: ErrorKind::Service(Box::new(details)),
            source: None,
        }
    }

    /// Creates a service error including transport metadata.
    pub fn service_with_http_metadata(
        status: Status,
        status_code: Option<u16>,
        headers: Option<HeaderMap>,
    ) -> Self {
        let details = ServiceDetails {
            status,
            status_code,
            headers,
        };
        Self {
            kind: ErrorKind::Service(Box::new(details)),
            source: None,
        }
    }

    /// Creates an error representing a timeout.
    pub fn timeout<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            source: Some(source.into()),
        }
    }

    /// The request could not be completed before its deadline.
    ///
    /// This is always a client-side generated error. Note that the request
    /// may or may not have started, and it may or may not complete in the
    /// service.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Creates an error representing an exhausted retry policy.
    pub fn exhausted<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Exhausted,
            source: Some(source.into()),
        }
    }

    /// The request could not complete before the retry policy expired.
    ///
    /// This is always a client-side generated error, but it may be the
    /// result of multiple errors received from the service. The last such
    /// error is available via [source][std::error::Error::source].
    pub fn is_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::Exhausted)
    }

    /// Creates an error representing a serialization problem.
    pub fn ser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Serialization,
            source: Some(source.into()),
        }
    }

    /// The request could not be serialized.
    ///
    /// This error is never transient: the serialization is deterministic and
    /// will fail on future attempts with the same input data.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Serialization)
    }

    /// Creates an error representing a deserialization problem.
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The response could not be deserialized.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// Creates an error representing a failure to create authentication headers.
    pub fn authentication<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Authentication,
            source: Some(source.into()),
        }
    }

    /// Could not create the authentication headers before sending the request.
    ///
    /// The request never left the client.
    pub fn is_authentication(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication)
    }

    /// A problem reported by the transport layer, with a full HTTP response.
    pub fn http(status_code: u16, headers: HeaderMap, payload: bytes::Bytes) -> Self {
        let details = TransportDetails {
            status_code: Some(status_code),
            headers: Some(headers),
            payload: Some(payload),
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: None,
        }
    }

    /// A problem in the transport layer without a full HTTP response.
    ///
    /// Examples include a broken connection after the request is sent, or
    /// any HTTP error that did not include a status code.
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        let details = TransportDetails {
            status_code: None,
            headers: None,
            payload: None,
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: Some(source.into()),
        }
    }

    /// If true, the error was generated before a response was received.
    pub fn is_io(&self) -> bool {
        matches!(
            &self.kind,
            ErrorKind::Transport(d) if matches!(**d, TransportDetails {
                status_code: None,
                headers: None,
                payload: None,
            }))
    }

    /// If true, the error was reported by the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(&self.kind, ErrorKind::Transport { .. })
    }

    /// The [Status] payload associated with this error.
    ///
    /// Google Cloud services return a detailed `Status` message including a
    /// numeric code for the error type, a human-readable message, and a
    /// sequence of details. See [AIP-193] for background information about
    /// the error model in Google Cloud services.
    ///
    /// [AIP-193]: https://google.aip.dev/193
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            ErrorKind::Service(d) => Some(&d.as_ref().status),
            _ => None,
        }
    }

    /// The canonical status code associated with this error, if any.
    pub fn code(&self) -> Option<Code> {
        self.status().map(Status::canonical_code)
    }

    /// The HTTP status code, if any, associated with this error.
    pub fn http_status_code(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Transport(d) => d.as_ref().status_code,
            ErrorKind::Service(d) => d.as_ref().status_code,
            _ => None,
        }
    }

    /// The headers, if any, associated with this error.
    pub fn http_headers(&self) -> Option<&HeaderMap> {
        match &self.kind {
            ErrorKind::Transport(d) => d.as_ref().headers.as_ref(),
            ErrorKind::Service(d) => d.as_ref().headers.as_ref(),
            _ => None,
        }
    }

    /// The payload, if any, associated with this error.
    pub fn http_payload(&self) -> Option<&bytes::Bytes> {
        match &self.kind {
            ErrorKind::Transport(d) => d.payload.as_ref(),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::Serialization, Some(e)) => write!(f, "cannot serialize the request {e}"),
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "cannot deserialize the response {e}")
            }
            (ErrorKind::Authentication, Some(e)) => {
                write!(f, "cannot create the authentication headers {e}")
            }
            (ErrorKind::Timeout, Some(e)) => {
                write!(f, "the request exceeded the request deadline {e}")
            }
            (ErrorKind::Exhausted, Some(e)) => write!(f, "{e}"),
            (ErrorKind::Transport(details), _) => details.display(self.source(), f),
            (ErrorKind::Service(d), _) => {
                write!(
                    f,
                    "the service reports an error with code {} described as: {}",
                    d.status.canonical_code().name(),
                    d.status.message
                )
            }
            (_, None) => unreachable!("no constructor allows this"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error))
    }
}

/// The type of error held by an [Error] instance.
#[derive(Debug)]
enum ErrorKind {
    Serialization,
    Deserialization,
    Authentication,
    Timeout,
    Exhausted,
    Transport(Box<TransportDetails>),
    Service(Box<ServiceDetails>),
}

#[derive(Debug)]
struct TransportDetails {
    status_code: Option<u16>,
    headers: Option<HeaderMap>,
    payload: Option<bytes::Bytes>,
}

impl TransportDetails {
    fn display(
        &self,
        source: Option<&(dyn StdError + 'static)>,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match (source, &self) {
            (
                _,
                TransportDetails {
                    status_code: Some(code),
                    payload: Some(p),
                    ..
                },
            ) => {
                if let Ok(message) = std::str::from_utf8(p.as_ref()) {
                    write!(f, "the HTTP transport reports a [{code}] error: {message}")
                } else {
                    write!(f, "the HTTP transport reports a [{code}] error: {p:?}")
                }
            }
            (Some(source), _) => write!(f, "the transport reports an error: {source}"),
            (None, _) => unreachable!("no Error constructor allows this"),
        }
    }
}

#[derive(Debug)]
struct ServiceDetails {
    status_code: Option<u16>,
    headers: Option<HeaderMap>,
    status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn service() {
        let status = Status::default()
            .set_code(Code::NotFound)
            .set_message("NOT FOUND");
        let error = Error::service(status.clone());
        assert!(error.source().is_none(), "{error:?}");
        assert_eq!(error.status(), Some(&status));
        assert_eq!(error.code(), Some(Code::NotFound));
        assert!(error.to_string().contains("NOT FOUND"), "{error}");
        assert!(error.to_string().contains("NOT_FOUND"), "{error}");
    }

    #[test]
    fn service_with_http_metadata() {
        let status = Status::default()
            .set_code(Code::NotFound)
            .set_message("NOT FOUND");
        let headers = {
            let mut headers = HeaderMap::new();
            headers.insert(
                "content-type",
                http::HeaderValue::from_static("application/json"),
            );
            headers
        };
        let error =
            Error::service_with_http_metadata(status.clone(), Some(404), Some(headers.clone()));
        assert_eq!(error.status(), Some(&status));
        assert_eq!(error.http_status_code(), Some(404));
        assert_eq!(error.http_headers(), Some(&headers));
        assert!(error.http_payload().is_none(), "{error:?}");
    }

    #[test]
    fn timeout() {
        let error = Error::timeout("simulated timeout");
        assert!(error.is_timeout(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("simulated timeout"), "{error}");
        assert!(error.status().is_none(), "{error:?}");
        assert!(error.http_status_code().is_none(), "{error:?}");
    }

    #[test]
    fn exhausted() {
        let error = Error::exhausted("too many retry attempts");
        assert!(error.is_exhausted(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(
            error.to_string().contains("too many retry attempts"),
            "{error}"
        );
    }

    #[test]
    fn serialization() {
        let error = Error::ser("simulated problem");
        assert!(error.is_serialization(), "{error:?}");
        assert!(!error.is_deserialization(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");

        let error = Error::deser("simulated problem");
        assert!(error.is_deserialization(), "{error:?}");
        assert!(!error.is_serialization(), "{error:?}");
    }

    #[test]
    fn authentication() {
        let error = Error::authentication("missing credentials");
        assert!(error.is_authentication(), "{error:?}");
        assert!(error.to_string().contains("missing credentials"), "{error}");
    }

    #[test]
    fn http() {
        let headers = {
            let mut headers = HeaderMap::new();
            headers.insert(
                "content-type",
                http::HeaderValue::from_static("application/json"),
            );
            headers
        };
        let payload = bytes::Bytes::from_static(b"NOT FOUND");
        let error = Error::http(404, headers.clone(), payload.clone());
        assert!(error.is_transport(), "{error:?}");
        assert!(!error.is_io(), "{error:?}");
        assert!(error.source().is_none(), "{error:?}");
        assert_eq!(error.http_status_code(), Some(404));
        assert_eq!(error.http_headers(), Some(&headers));
        assert_eq!(error.http_payload(), Some(&payload));
        assert!(error.to_string().contains("404"), "{error}");
        assert!(error.to_string().contains("NOT FOUND"), "{error}");
    }

    #[test]
    fn io() {
        let error = Error::io("broken connection");
        assert!(error.is_transport(), "{error:?}");
        assert!(error.is_io(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("broken connection"), "{error}");
    }
}
