// awsio: AWS service-call engine for Rust
// Copyright 2024 the awsio authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error definitions and per-protocol error-response classification

use std::fmt::Debug;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use thiserror::Error as ThisError;
use xmltree::Element;

use crate::aws::header_constants::X_AMZN_ERROR_TYPE;
use crate::aws::multimap_ext::{Multimap, MultimapExt};
use crate::aws::protocol::ServiceProtocol;
use crate::aws::utils::{get_default_text, get_option_text};

/// Error codes the service reports for caller mistakes. A 4xx body whose
/// code appears here surfaces as [`Error::AwsClient`].
const CLIENT_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "AuthFailure",
    "ConditionalCheckFailedException",
    "ExpiredToken",
    "ExpiredTokenException",
    "IncompleteSignature",
    "InvalidAction",
    "InvalidClientTokenId",
    "InvalidParameterCombination",
    "InvalidParameterValue",
    "InvalidQueryParameter",
    "InvalidSignatureException",
    "MalformedQueryString",
    "MissingAction",
    "MissingAuthenticationToken",
    "MissingParameter",
    "NoSuchBucket",
    "NoSuchEntity",
    "NoSuchKey",
    "OptInRequired",
    "RequestExpired",
    "ResourceNotFoundException",
    "SignatureDoesNotMatch",
    "Throttling",
    "ThrottlingException",
    "UnauthorizedOperation",
    "UnrecognizedClientException",
    "ValidationError",
    "ValidationException",
];

/// Error codes the service reports for its own failures. A 5xx body whose
/// code appears here surfaces as [`Error::AwsServer`].
const SERVER_ERROR_CODES: &[&str] = &[
    "InternalError",
    "InternalFailure",
    "InternalServerError",
    "ServiceFailure",
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "SlowDown",
    "Unavailable",
];

/// Error definitions
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    UnsupportedOperation(String),

    #[error("{0}")]
    MissingParameter(String),

    #[error("received a response head in an unexpected state")]
    MalformedHead,

    #[error("received body data without a response head")]
    MalformedBody,

    #[error("malformed URL on the wire")]
    MalformedUrl,

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("unknown region {0}")]
    UnknownRegion(String),

    #[error("client error {code}: {message} (HTTP {status_code})")]
    AwsClient {
        code: String,
        message: String,
        status_code: u16,
    },

    #[error("server error {code}: {message} (HTTP {status_code})")]
    AwsServer {
        code: String,
        message: String,
        status_code: u16,
    },

    #[error("response error {code}: {message} (HTTP {status_code})")]
    AwsResponse {
        code: String,
        message: String,
        status_code: u16,
    },

    #[error("{type_name} error {code}: {message}")]
    Service {
        type_name: String,
        code: String,
        message: String,
    },

    #[error("{message}")]
    Aws { message: String, raw_body: Bytes },

    #[error("{0}")]
    DecodeError(String),

    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    XmlParseError(#[from] xmltree::ParseError),

    #[error("{0}")]
    XmlWriteError(#[from] xmltree::Error),

    #[error("{0}")]
    TimeParseError(#[from] chrono::ParseError),

    #[error("{0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    #[error("{0}")]
    IntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    TlsError(#[from] native_tls::Error),

    #[error("{0}")]
    UriError(#[from] http::uri::InvalidUri),
}

/// Service-specific error matcher. A client registers one per known error
/// type; during classification the registry is consulted before the common
/// client/server code lists.
pub trait ServiceErrorType: Debug + Send + Sync {
    /// Returns the typed error when `code` belongs to this error type.
    fn match_error(&self, code: &str, message: &str, status_code: u16) -> Option<Error>;
}

/// Error code and message extracted from a failed exchange.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorParts {
    pub code: Option<String>,
    pub message: String,
}

fn find_error_element(root: &Element) -> Option<&Element> {
    if root.name == "Error" {
        return Some(root);
    }
    root.get_child("Error").or_else(|| {
        root.children
            .iter()
            .filter_map(|n| n.as_element())
            .find_map(find_error_element)
    })
}

fn case_insensitive_field<'a>(value: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    value.as_object()?.iter().find_map(|(k, v)| {
        if k.eq_ignore_ascii_case(field) {
            v.as_str()
        } else {
            None
        }
    })
}

/// Extracts an error code and message from a non-2xx body per protocol.
pub fn extract_error_parts(
    protocol: &ServiceProtocol,
    headers: &Multimap,
    body: &Bytes,
) -> ErrorParts {
    match protocol {
        ServiceProtocol::Query | ServiceProtocol::Other(_) => {
            let Ok(root) = Element::parse(body.clone().reader()) else {
                return ErrorParts::default();
            };
            match find_error_element(&root) {
                Some(err) => ErrorParts {
                    code: get_option_text(err, "Code"),
                    message: get_default_text(err, "Message"),
                },
                None => ErrorParts::default(),
            }
        }
        ServiceProtocol::RestXml => {
            let Ok(root) = Element::parse(body.clone().reader()) else {
                return ErrorParts::default();
            };
            // An explicit <Message> child wins; otherwise every remaining
            // child contributes `name: value`.
            let message = match get_option_text(&root, "Message") {
                Some(message) => message,
                None => root
                    .children
                    .iter()
                    .filter_map(|n| n.as_element())
                    .filter(|e| e.name != "Code")
                    .map(|e| format!("{}: {}", e.name, e.get_text().unwrap_or_default()))
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            ErrorParts {
                code: get_option_text(&root, "Code"),
                message,
            }
        }
        ServiceProtocol::RestJson => {
            // Code travels in the x-amzn-ErrorType header; a `:`-separated
            // suffix may follow it.
            let code = headers
                .get_ci(X_AMZN_ERROR_TYPE)
                .map(|v| v.split(':').next().unwrap_or(v).to_string());
            let message = serde_json::from_slice::<serde_json::Value>(body)
                .ok()
                .and_then(|v| case_insensitive_field(&v, "message").map(String::from))
                .unwrap_or_default();
            ErrorParts { code, message }
        }
        ServiceProtocol::Json { .. } => {
            let value = serde_json::from_slice::<serde_json::Value>(body).ok();
            let code = value.as_ref().and_then(|v| {
                v.get("__type").and_then(|t| t.as_str()).map(|t| {
                    // Strip the namespace prefix and any `:` suffix.
                    let t = t.rsplit('#').next().unwrap_or(t);
                    t.split(':').next().unwrap_or(t).to_string()
                })
            });
            let message = value
                .as_ref()
                .and_then(|v| case_insensitive_field(v, "message").map(String::from))
                .unwrap_or_default();
            ErrorParts { code, message }
        }
    }
}

/// Classifies a failed exchange into a typed error.
///
/// Resolution order: caller-registered service error types, the common
/// client-error code list, the common server-error code list, a generic
/// response error when the code is present but unknown, and finally the
/// opaque fallback carrying the raw body.
pub fn classify_error(
    parts: ErrorParts,
    status_code: u16,
    raw_body: Bytes,
    registry: &[Arc<dyn ServiceErrorType>],
) -> Error {
    if let Some(code) = parts.code {
        for error_type in registry {
            if let Some(e) = error_type.match_error(&code, &parts.message, status_code) {
                return e;
            }
        }
        if CLIENT_ERROR_CODES.contains(&code.as_str()) {
            return Error::AwsClient {
                code,
                message: parts.message,
                status_code,
            };
        }
        if SERVER_ERROR_CODES.contains(&code.as_str()) {
            return Error::AwsServer {
                code,
                message: parts.message,
                status_code,
            };
        }
        if !code.is_empty() {
            return Error::AwsResponse {
                code,
                message: parts.message,
                status_code,
            };
        }
    }

    let message = if parts.message.is_empty() {
        format!("request failed with HTTP status {status_code}")
    } else {
        parts.message
    };
    Error::Aws {
        message,
        raw_body,
    }
}
