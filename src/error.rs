//! Error types for Arpa API calls.
//!
//! Every operation on [`Client`](crate::Client) fails with a single error type,
//! [`ApiError`], carrying a numeric code, a human-readable message and a coarse
//! [`ApiErrorKind`]. The lower-level cause, when there is one, is kept as a
//! [`TransportError`] and exposed through [`std::error::Error::source`].
//!
//! [`check_for_error`] is the only place where transport outcomes are turned
//! into an [`ApiError`].

use crate::response::RawResponse;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Message used when the transport produced neither a response nor an error.
pub const EMPTY_RESPONSE: &str = "empty response";

/// Coarse classification of an [`ApiError`].
///
/// The kind is derived from the error text by substring match, not from a
/// structured code sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApiErrorKind {
    /// Errors that are not strongly typed.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,

    /// The token endpoint rejected the credentials with `invalid_grant`.
    #[serde(rename = "oauth: invalid grant")]
    InvalidGrant,
}

/// Substring markers, checked in order. The first match wins.
const KIND_MARKERS: &[(&str, ApiErrorKind)] = &[("invalid_grant", ApiErrorKind::InvalidGrant)];

impl ApiErrorKind {
    /// Classifies an error text by looking for known markers.
    ///
    /// # Examples
    ///
    /// ```
    /// use arpa_client::ApiErrorKind;
    ///
    /// assert_eq!(
    ///     ApiErrorKind::classify("400 Bad Request: invalid_grant"),
    ///     ApiErrorKind::InvalidGrant
    /// );
    /// assert_eq!(ApiErrorKind::classify("connection reset"), ApiErrorKind::Unknown);
    /// ```
    pub fn classify(text: &str) -> Self {
        KIND_MARKERS
            .iter()
            .find(|(marker, _)| text.contains(marker))
            .map(|(_, kind)| *kind)
            .unwrap_or_default()
    }

    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorKind::Unknown => "unknown",
            ApiErrorKind::InvalidGrant => "oauth: invalid grant",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned by every [`Client`](crate::Client) operation.
///
/// # Examples
///
/// ```no_run
/// use arpa_client::{ApiError, ApiErrorKind, CallContext, Client};
///
/// # async fn example() -> Result<(), ApiError> {
/// let client = Client::new("https://arpa.example.com")?;
///
/// match client.admin_authenticate(&CallContext::new(), "admin", "secret").await {
///     Ok(jwt) => println!("token expires at {:?}", jwt.expires_at),
///     Err(e) if e.kind == ApiErrorKind::InvalidGrant => eprintln!("bad credentials"),
///     Err(e) => eprintln!("error {}: {}", e.code, e.message),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug, Clone, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    /// The HTTP status code, or `0` when no error status was received.
    pub code: u16,

    /// A description of the failure, prefixed with the operation's context.
    pub message: String,

    /// The coarse classification of the failure.
    #[serde(rename = "type")]
    pub kind: ApiErrorKind,

    #[source]
    #[serde(skip)]
    cause: Option<Arc<TransportError>>,
}

impl ApiError {
    /// Creates an error with no underlying transport cause.
    pub fn new(code: u16, message: impl Into<String>, kind: ApiErrorKind) -> Self {
        Self {
            code,
            message: message.into(),
            kind,
            cause: None,
        }
    }

    /// Wraps a transport failure with the caller's context message.
    ///
    /// The code is always `0`; the kind is classified from the full error chain.
    pub fn from_transport(err: TransportError, context: &str) -> Self {
        let kind = ApiErrorKind::classify(&chain_text(&err));
        Self {
            code: 0,
            message: format!("{}: {}", context, err),
            kind,
            cause: Some(Arc::new(err)),
        }
    }

    /// Returns the transport error behind this failure, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        self.cause.as_deref()
    }

    /// Returns `true` if the call was aborted through its [`CallContext`](crate::CallContext).
    pub fn is_cancelled(&self) -> bool {
        matches!(self.transport_error(), Some(TransportError::Cancelled))
    }

    /// Returns `true` if the server rejected the credentials.
    pub fn is_invalid_grant(&self) -> bool {
        self.kind == ApiErrorKind::InvalidGrant
    }

    /// Returns the HTTP status code if the server answered with an error status.
    pub fn status(&self) -> Option<StatusCode> {
        if self.code == 0 {
            return None;
        }
        StatusCode::from_u16(self.code).ok()
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        let kind = ApiErrorKind::classify(&chain_text(&err));
        Self {
            code: 0,
            message: err.to_string(),
            kind,
            cause: Some(Arc::new(err)),
        }
    }
}

/// Failures below the HTTP status layer.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// Connection, DNS, TLS or protocol failure reported by `reqwest`.
    ///
    /// The request URL is stripped, since query strings can carry credentials.
    #[error(transparent)]
    Network(reqwest::Error),

    /// The call's cancellation token fired before the round trip finished.
    #[error("request cancelled")]
    Cancelled,

    /// The request body could not be encoded as JSON.
    #[error("failed to serialize request: {0}")]
    SerializationFailed(String),

    /// A success response body did not match the expected shape.
    #[error("failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The HTTP status of the response
        status: StatusCode,
        /// The body that failed to decode
        raw_response: String,
        /// The serde error message
        serde_error: String,
    },

    /// Invalid client or request configuration.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// An authenticated call was made without the credential it requires.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// A URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.without_url())
    }
}

/// Structured error body returned by the server alongside an error status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Short error code, e.g. `invalid_grant`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,

    /// Error message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Longer description.
    #[serde(
        default,
        rename = "error_description",
        skip_serializing_if = "String::is_empty"
    )]
    pub description: String,
}

impl HttpErrorResponse {
    /// Returns `true` if any field carries text.
    pub fn not_empty(&self) -> bool {
        !self.error.is_empty() || !self.message.is_empty() || !self.description.is_empty()
    }
}

impl fmt::Display for HttpErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [&self.error, &self.message, &self.description];
        let mut first = true;
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            if !first {
                f.write_str(": ")?;
            }
            f.write_str(part)?;
            first = false;
        }
        Ok(())
    }
}

/// Maps the outcome of a round trip to the response or an [`ApiError`].
///
/// * `Err(e)` - transport failure: code `0`, message `"{context}: {e}"`.
/// * `Ok(None)` - no response at all: code `0`, message [`EMPTY_RESPONSE`].
/// * `Ok(Some(resp))` with an error status: code is the status; the message
///   is the status line, followed by the structured error body if one was sent.
///   The kind is always [`ApiErrorKind::Unknown`].
/// * `Ok(Some(resp))` otherwise: success, the response is handed back.
///
/// # Examples
///
/// ```
/// use arpa_client::{check_for_error, RawResponse};
/// use http::{HeaderMap, StatusCode};
/// use std::time::Duration;
///
/// let resp = RawResponse::new(
///     StatusCode::INTERNAL_SERVER_ERROR,
///     HeaderMap::new(),
///     r#"{"error":"unknown_error"}"#.to_string(),
///     Vec::new(),
///     Duration::ZERO,
/// );
///
/// let err = check_for_error(Ok(Some(resp)), "could not create customer").unwrap_err();
/// assert_eq!(err.code, 500);
/// assert_eq!(err.message, "500 Internal Server Error: unknown_error");
/// ```
pub fn check_for_error(
    outcome: std::result::Result<Option<RawResponse>, TransportError>,
    context: &str,
) -> Result<RawResponse> {
    let error = match outcome {
        Err(err) => ApiError::from_transport(err, context),
        Ok(None) => ApiError::new(0, EMPTY_RESPONSE, ApiErrorKind::Unknown),
        Ok(Some(resp)) if resp.is_error() => {
            let message = match resp.error_body() {
                Some(body) if body.not_empty() => format!("{}: {}", resp.status_line(), body),
                _ => resp.status_line(),
            };
            // Only transport failures are classified.
            ApiError::new(resp.status.as_u16(), message, ApiErrorKind::Unknown)
        }
        Ok(Some(resp)) => return Ok(resp),
    };

    tracing::warn!(
        code = error.code,
        kind = %error.kind,
        error = %error.message,
        "Arpa API call failed"
    );

    Err(error)
}

fn chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// A specialized `Result` type for Arpa API calls.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;
    use std::time::Duration;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            body.to_string(),
            Vec::new(),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_success_passes_through() {
        let resp = response(200, "{}");
        assert!(check_for_error(Ok(Some(resp)), "ctx").is_ok());

        // 3xx is not an error status
        let resp = response(304, "");
        assert!(check_for_error(Ok(Some(resp)), "ctx").is_ok());
    }

    #[test]
    fn test_transport_failure_is_wrapped() {
        let err = check_for_error(Err(TransportError::Cancelled), "could not get token").unwrap_err();
        assert_eq!(err.code, 0);
        assert_eq!(err.message, "could not get token: request cancelled");
        assert_eq!(err.kind, ApiErrorKind::Unknown);
        assert!(err.is_cancelled());
        assert!(err.status().is_none());
    }

    #[test]
    fn test_transport_failure_invalid_grant() {
        let err = check_for_error(
            Err(TransportError::ConfigurationError("oauth2: invalid_grant".into())),
            "could not get token",
        )
        .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::InvalidGrant);
        assert!(err.is_invalid_grant());
    }

    #[test]
    fn test_empty_response() {
        let err = check_for_error(Ok(None), "could not create service").unwrap_err();
        assert_eq!(err.code, 0);
        assert_eq!(err.message, EMPTY_RESPONSE);
        assert_eq!(err.kind, ApiErrorKind::Unknown);
        assert!(err.transport_error().is_none());
    }

    #[test]
    fn test_error_status_with_structured_body() {
        let resp = response(500, r#"{"error":"unknown_error"}"#);
        let err = check_for_error(Ok(Some(resp)), "ctx").unwrap_err();
        assert_eq!(err.code, 500);
        assert_eq!(err.message, "500 Internal Server Error: unknown_error");
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_error_status_without_structured_body() {
        let resp = response(404, "Not found");
        let err = check_for_error(Ok(Some(resp)), "ctx").unwrap_err();
        assert_eq!(err.code, 404);
        assert_eq!(err.message, "404 Not Found");

        let resp = response(502, "{}");
        let err = check_for_error(Ok(Some(resp)), "ctx").unwrap_err();
        assert_eq!(err.message, "502 Bad Gateway");
    }

    #[test]
    fn test_error_status_is_never_classified() {
        let resp = response(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#,
        );
        let err = check_for_error(Ok(Some(resp)), "ctx").unwrap_err();
        assert_eq!(
            err.message,
            "400 Bad Request: invalid_grant: Invalid user credentials"
        );
        assert_eq!(err.code, 400);
        assert_eq!(err.kind, ApiErrorKind::Unknown);
        assert!(!err.is_invalid_grant());
    }

    #[test]
    fn test_http_error_response_display() {
        let body = HttpErrorResponse {
            error: String::new(),
            message: "boom".into(),
            description: "details".into(),
        };
        assert!(body.not_empty());
        assert_eq!(body.to_string(), "boom: details");
        assert!(!HttpErrorResponse::default().not_empty());
    }

    #[test]
    fn test_api_error_serializes_kind_as_type() {
        let err = ApiError::new(401, "401 Unauthorized", ApiErrorKind::InvalidGrant);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 401);
        assert_eq!(json["type"], "oauth: invalid grant");
        assert_eq!(err.to_string(), "401 Unauthorized");
    }
}
