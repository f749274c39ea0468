//! Error taxonomy shared by every backend and route.
//!
//! Each failure is a [`GatewayError`] carrying three layers: a stable
//! [`ErrorKind`], a context message naming the operation that was being
//! attempted, and optionally the text reported by the failing call. The HTTP
//! status is never stored on the error; it is looked up in [`STATUS_TABLE`]
//! when the error is rendered, so the same kind maps to the same status no
//! matter which backend produced it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

/// Prefix used for error ids until [`init_app_name`] is called.
pub const DEFAULT_APP_NAME: &str = "translate-gateway";

static APP_NAME: OnceLock<String> = OnceLock::new();

/// Set the prefix of rendered error ids. Only the first call has any effect.
pub fn init_app_name(name: &str) {
    let _ = APP_NAME.set(name.to_string());
}

fn app_name() -> &'static str {
    APP_NAME.get().map(String::as_str).unwrap_or(DEFAULT_APP_NAME)
}

/// Every failure the gateway can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The upstream call succeeded but carried no results
    BackendEmptyResult,
    /// The upstream call itself failed (transport or non-2xx status)
    BackendCallFailed,
    /// The detection envelope was present but its inner result list was empty
    BackendEmptyDetection,
    /// A language code from a backend could not be parsed as a tag
    LanguageTagConversionFailed,
    /// A required request field was empty or absent
    MissingField,
    /// A request field was present but not acceptable
    InvalidField,
    /// The request body was not valid JSON for the route
    DecodeRequestBody,
    /// The success body could not be serialised
    EncodeResponse,
    /// Anything else; deliberately absent from the status table
    Internal,
}

impl ErrorKind {
    /// Stable numeric code, used as the suffix of the rendered error id.
    pub fn code(self) -> u16 {
        match self {
            ErrorKind::BackendEmptyResult => 1,
            ErrorKind::BackendCallFailed => 2,
            ErrorKind::BackendEmptyDetection => 3,
            ErrorKind::LanguageTagConversionFailed => 4,
            ErrorKind::MissingField => 5,
            ErrorKind::InvalidField => 6,
            ErrorKind::DecodeRequestBody => 7,
            ErrorKind::EncodeResponse => 8,
            ErrorKind::Internal => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::BackendEmptyResult => "backend_empty_result",
            ErrorKind::BackendCallFailed => "backend_call_failed",
            ErrorKind::BackendEmptyDetection => "backend_empty_detection",
            ErrorKind::LanguageTagConversionFailed => "language_tag_conversion_failed",
            ErrorKind::MissingField => "missing_field",
            ErrorKind::InvalidField => "invalid_field",
            ErrorKind::DecodeRequestBody => "decode_request_body",
            ErrorKind::EncodeResponse => "encode_response",
            ErrorKind::Internal => "internal",
        }
    }

    /// Rendered id, e.g. `translate-gateway.5`.
    pub fn id(self) -> String {
        format!("{}.{}", app_name(), self.code())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status families, walked in order. Kinds not listed fall back to
/// [`DEFAULT_STATUS`].
pub const STATUS_TABLE: &[(StatusCode, &[ErrorKind])] = &[
    (StatusCode::BAD_REQUEST, &[ErrorKind::DecodeRequestBody]),
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        &[ErrorKind::MissingField, ErrorKind::InvalidField],
    ),
    (StatusCode::INTERNAL_SERVER_ERROR, &[ErrorKind::EncodeResponse]),
    (
        StatusCode::BAD_GATEWAY,
        &[
            ErrorKind::BackendCallFailed,
            ErrorKind::BackendEmptyResult,
            ErrorKind::BackendEmptyDetection,
            ErrorKind::LanguageTagConversionFailed,
        ],
    ),
];

pub const DEFAULT_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Map an error kind to its HTTP status family.
pub fn classify(kind: ErrorKind) -> StatusCode {
    STATUS_TABLE
        .iter()
        .find(|(_, kinds)| kinds.contains(&kind))
        .map(|(status, _)| *status)
        .unwrap_or(DEFAULT_STATUS)
}

/// A classified failure: `{kind, message, cause}`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    /// What the gateway was trying to do
    pub message: String,
    /// What the failing call actually reported, if anything
    pub cause: Option<String>,
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// `"<field>" field in body is empty`
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorKind::MissingField,
            format!("\"{}\" field in body is empty", field),
        )
    }

    pub fn invalid_field(field: &str, cause: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InvalidField,
            format!("\"{}\" field in body is invalid", field),
        )
        .with_cause(cause)
    }

    pub fn backend_call(operation: &str, cause: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::BackendCallFailed,
            format!("{} returned an error", operation),
        )
        .with_cause(cause)
    }

    pub fn empty_result(operation: &str) -> Self {
        Self::new(
            ErrorKind::BackendEmptyResult,
            format!("{} returned no results", operation),
        )
    }

    pub fn tag_conversion(what: &str, raw: &str, cause: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::LanguageTagConversionFailed,
            format!("could not convert {} \"{}\" to a language tag", what, raw),
        )
        .with_cause(cause)
    }

    pub fn status(&self) -> StatusCode {
        classify(self.kind)
    }

    pub fn body(&self) -> ErrorResponse {
        ErrorResponse {
            error_code: ErrorCode {
                id: self.kind.id(),
                description: self.message.clone(),
                cause: self.cause.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorCode {
    pub id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();

        info!(
            error_code_id = %body.error_code.id,
            kind = %self.kind,
            status = status.as_u16(),
            cause = self.cause.as_deref().unwrap_or(""),
            "{}",
            self.message
        );

        (status, Json(body)).into_response()
    }
}
