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

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// The [Status] type defines a logical error model that is suitable for
/// different programming environments, including REST APIs and RPC APIs. Each
/// [Status] message contains three pieces of data: error code, error message,
/// and error details.
///
/// You can find out more about this error model and how to work with it in
/// the [API Design Guide](https://cloud.google.com/apis/design/errors).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Status {
    /// The status code.
    ///
    /// When using a HTTP transport this is the HTTP status code. When using
    /// gRPC, this is one of the values enumerated in [Code].
    pub code: i32,

    /// A developer-facing error message, which should be in English.
    pub message: String,

    /// The underlying `google.rpc.Status.code`, as a string.
    ///
    /// When serialized over JSON, status messages include both the HTTP
    /// status code (in the `code` field), and the status [Code] as a string.
    pub status: Option<String>,

    /// A list of messages that carry the error details. There is a common
    /// set of message types for APIs to use. This library does not interpret
    /// them, they are preserved as raw JSON objects.
    pub details: Vec<serde_json::Value>,
}

impl Status {
    /// Sets the value of `code` from a canonical [Code].
    ///
    /// This also sets the `status` field to the matching string form, as the
    /// services do.
    pub fn set_code(mut self, v: Code) -> Self {
        self.code = v.clone() as i32;
        self.status = Some(v.name().to_string());
        self
    }

    /// Sets the value of `message`.
    pub fn set_message<T: Into<String>>(mut self, v: T) -> Self {
        self.message = v.into();
        self
    }

    /// Sets the value of `details`.
    pub fn set_details<T: IntoIterator<Item = serde_json::Value>>(mut self, v: T) -> Self {
        self.details = v.into_iter().collect();
        self
    }

    /// The canonical code for this status.
    ///
    /// The services return the code in different forms depending on the
    /// transport: as a string name (`"PERMISSION_DENIED"`), as the canonical
    /// number, or only as a HTTP status code. This resolves all three.
    pub fn canonical_code(&self) -> Code {
        if let Some(code) = self.status.as_deref().and_then(|s| Code::try_from(s).ok()) {
            return code;
        }
        if (0..=16).contains(&self.code) {
            return Code::from(self.code);
        }
        Code::from_http_status(self.code as u16)
    }
}

/// The canonical error codes for APIs.
///
/// Sometimes multiple error codes may apply. Services should return the most
/// specific error code that applies. For example, prefer `OUT_OF_RANGE` over
/// `FAILED_PRECONDITION` if both codes apply.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Code {
    /// Not an error; returned on success.
    ///
    /// HTTP Mapping: 200 OK
    Ok = 0,

    /// The operation was cancelled, typically by the caller.
    ///
    /// HTTP Mapping: 499 Client Closed Request
    Canceled = 1,

    /// Unknown error. Errors raised by APIs that do not return enough error
    /// information may be converted to this error.
    ///
    /// HTTP Mapping: 500 Internal Server Error
    Unknown = 2,

    /// The client specified an invalid argument, regardless of the state of
    /// the system.
    ///
    /// HTTP Mapping: 400 Bad Request
    InvalidArgument = 3,

    /// The deadline expired before the operation could complete.
    ///
    /// HTTP Mapping: 504 Gateway Timeout
    DeadlineExceeded = 4,

    /// Some requested entity (e.g., file or directory) was not found.
    ///
    /// HTTP Mapping: 404 Not Found
    NotFound = 5,

    /// The entity that a client attempted to create already exists.
    ///
    /// HTTP Mapping: 409 Conflict
    AlreadyExists = 6,

    /// The caller does not have permission to execute the specified
    /// operation.
    ///
    /// HTTP Mapping: 403 Forbidden
    PermissionDenied = 7,

    /// Some resource has been exhausted, perhaps a per-user quota.
    ///
    /// HTTP Mapping: 429 Too Many Requests
    ResourceExhausted = 8,

    /// The operation was rejected because the system is not in a state
    /// required for the operation's execution. For example, a query requires
    /// an index that has not been built.
    ///
    /// HTTP Mapping: 400 Bad Request
    FailedPrecondition = 9,

    /// The operation was aborted, typically due to a concurrency issue such
    /// as a transaction abort.
    ///
    /// HTTP Mapping: 409 Conflict
    Aborted = 10,

    /// The operation was attempted past the valid range.
    ///
    /// HTTP Mapping: 400 Bad Request
    OutOfRange = 11,

    /// The operation is not implemented or is not supported/enabled in this
    /// service.
    ///
    /// HTTP Mapping: 501 Not Implemented
    Unimplemented = 12,

    /// Internal errors. Some invariants expected by the underlying system
    /// have been broken.
    ///
    /// HTTP Mapping: 500 Internal Server Error
    Internal = 13,

    /// The service is currently unavailable. This is most likely a transient
    /// condition, which can be corrected by retrying with a backoff. Note
    /// that it is not always safe to retry non-idempotent operations.
    ///
    /// HTTP Mapping: 503 Service Unavailable
    Unavailable = 14,

    /// Unrecoverable data loss or corruption.
    ///
    /// HTTP Mapping: 500 Internal Server Error
    DataLoss = 15,

    /// The request does not have valid authentication credentials for the
    /// operation.
    ///
    /// HTTP Mapping: 401 Unauthorized
    Unauthenticated = 16,
}

impl Code {
    /// The string form of this code, as used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Code::Ok => "OK",
            Code::Canceled => "CANCELED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Aborted => "ABORTED",
            Code::OutOfRange => "OUT_OF_RANGE",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
            Code::Unavailable => "UNAVAILABLE",
            Code::DataLoss => "DATA_LOSS",
            Code::Unauthenticated => "UNAUTHENTICATED",
        }
    }

    /// Maps a plain HTTP status code to the closest canonical code.
    ///
    /// Some errors are generated before they reach any Google Cloud service,
    /// for example by proxies or load balancers, and carry only the HTTP
    /// status code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200 => Code::Ok,
            400 => Code::InvalidArgument,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::NotFound,
            409 => Code::Aborted,
            412 => Code::FailedPrecondition,
            416 => Code::OutOfRange,
            429 => Code::ResourceExhausted,
            499 => Code::Canceled,
            500 => Code::Internal,
            501 => Code::Unimplemented,
            503 => Code::Unavailable,
            504 => Code::DeadlineExceeded,
            _ => Code::Unknown,
        }
    }
}

impl Default for Code {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::convert::From<i32> for Code {
    fn from(value: i32) -> Self {
        match value {
            0 => Code::Ok,
            1 => Code::Canceled,
            2 => Code::Unknown,
            3 => Code::InvalidArgument,
            4 => Code::DeadlineExceeded,
            5 => Code::NotFound,
            6 => Code::AlreadyExists,
            7 => Code::PermissionDenied,
            8 => Code::ResourceExhausted,
            9 => Code::FailedPrecondition,
            10 => Code::Aborted,
            11 => Code::OutOfRange,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            14 => Code::Unavailable,
            15 => Code::DataLoss,
            16 => Code::Unauthenticated,
            _ => Code::default(),
        }
    }
}

impl std::convert::TryFrom<&str> for Code {
    type Error = String;
    fn try_from(value: &str) -> std::result::Result<Code, Self::Error> {
        match value {
            "OK" => Ok(Code::Ok),
            "CANCELED" => Ok(Code::Canceled),
            "UNKNOWN" => Ok(Code::Unknown),
            "INVALID_ARGUMENT" => Ok(Code::InvalidArgument),
            "DEADLINE_EXCEEDED" => Ok(Code::DeadlineExceeded),
            "NOT_FOUND" => Ok(Code::NotFound),
            "ALREADY_EXISTS" => Ok(Code::AlreadyExists),
            "PERMISSION_DENIED" => Ok(Code::PermissionDenied),
            "RESOURCE_EXHAUSTED" => Ok(Code::ResourceExhausted),
            "FAILED_PRECONDITION" => Ok(Code::FailedPrecondition),
            "ABORTED" => Ok(Code::Aborted),
            "OUT_OF_RANGE" => Ok(Code::OutOfRange),
            "UNIMPLEMENTED" => Ok(Code::Unimplemented),
            "INTERNAL" => Ok(Code::Internal),
            "UNAVAILABLE" => Ok(Code::Unavailable),
            "DATA_LOSS" => Ok(Code::DataLoss),
            "UNAUTHENTICATED" => Ok(Code::Unauthenticated),
            _ => Err(format!("unknown status code value {value}")),
        }
    }
}

/// A helper class to deserialize wrapped Status messages.
#[derive(Clone, Debug, Deserialize, Serialize)]
struct ErrorWrapper {
    error: Status,
}

impl TryFrom<&bytes::Bytes> for Status {
    type Error = Error;

    fn try_from(value: &bytes::Bytes) -> Result<Self, Self::Error> {
        serde_json::from_slice::<ErrorWrapper>(value)
            .map(|w| w.error)
            .map_err(Error::deser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        for i in 0..=16 {
            let code = Code::from(i);
            assert_eq!(Code::try_from(code.name()), Ok(code.clone()), "{i}");
            assert_eq!(code.clone() as i32, i, "{code:?}");
        }
        assert_eq!(Code::from(42), Code::Unknown);
        assert!(Code::try_from("NOT_A_CODE").is_err());
    }

    #[test]
    fn code_from_http_status() {
        assert_eq!(Code::from_http_status(403), Code::PermissionDenied);
        assert_eq!(Code::from_http_status(404), Code::NotFound);
        assert_eq!(Code::from_http_status(429), Code::ResourceExhausted);
        assert_eq!(Code::from_http_status(503), Code::Unavailable);
        assert_eq!(Code::from_http_status(418), Code::Unknown);
    }

    #[test]
    fn status_canonical_code() {
        let status = Status::default().set_code(Code::Aborted);
        assert_eq!(status.canonical_code(), Code::Aborted);

        // The REST envelope carries the HTTP code and the string status.
        let status = Status {
            code: 409,
            status: Some("ABORTED".to_string()),
            ..Default::default()
        };
        assert_eq!(status.canonical_code(), Code::Aborted);

        // Only a HTTP status code.
        let status = Status {
            code: 503,
            ..Default::default()
        };
        assert_eq!(status.canonical_code(), Code::Unavailable);
    }

    #[test]
    fn deserialize_error_envelope() -> anyhow::Result<()> {
        let payload = bytes::Bytes::from_static(
            br###"{
                "error": {
                    "code": 400,
                    "message": "no matching index found",
                    "status": "FAILED_PRECONDITION",
                    "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo"}]
                }
            }"###,
        );
        let status = Status::try_from(&payload)?;
        assert_eq!(status.code, 400);
        assert_eq!(status.message, "no matching index found");
        assert_eq!(status.canonical_code(), Code::FailedPrecondition);
        assert_eq!(status.details.len(), 1);
        Ok(())
    }

    #[test]
    fn deserialize_bad_envelope() {
        let payload = bytes::Bytes::from_static(b"not json");
        let err = Status::try_from(&payload).unwrap_err();
        assert!(err.is_deserialization(), "{err:?}");
    }
}
