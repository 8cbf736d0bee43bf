//! The raw side of a completed round trip.
//!
//! [`RawResponse`] keeps the status, headers, body text and session cookies of
//! a response together with the measured latency. The error mapper and the
//! typed decoders in [`Client`](crate::Client) both work from it.

use crate::error::{HttpErrorResponse, TransportError};
use crate::models::SessionCookie;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A received HTTP response, read to completion.
///
/// # Examples
///
/// ```
/// use arpa_client::RawResponse;
/// use http::{HeaderMap, StatusCode};
/// use std::time::Duration;
///
/// let resp = RawResponse::new(
///     StatusCode::UNAUTHORIZED,
///     HeaderMap::new(),
///     r#"{"error":"invalid_grant"}"#.to_string(),
///     Vec::new(),
///     Duration::from_millis(12),
/// );
///
/// assert!(resp.is_error());
/// assert_eq!(resp.status_line(), "401 Unauthorized");
/// assert_eq!(resp.error_body().unwrap().error, "invalid_grant");
/// ```
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The response body as text.
    pub raw_body: String,

    /// Cookies set by the server through `Set-Cookie`.
    pub cookies: Vec<SessionCookie>,

    /// Time from sending the request until the body was read.
    pub latency: Duration,
}

impl RawResponse {
    /// Creates a new `RawResponse`.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        raw_body: String,
        cookies: Vec<SessionCookie>,
        latency: Duration,
    ) -> Self {
        Self {
            status,
            headers,
            raw_body,
            cookies,
            latency,
        }
    }

    /// Reads a `reqwest` response to completion.
    pub(crate) async fn read(
        response: reqwest::Response,
        started: std::time::Instant,
    ) -> Result<Self, TransportError> {
        let status = response.status();
        let headers = response.headers().clone();
        let cookies = response.cookies().map(SessionCookie::from).collect();
        let raw_body = response.text().await?;

        Ok(Self::new(
            status,
            headers,
            raw_body,
            cookies,
            started.elapsed(),
        ))
    }

    /// Returns `true` for 4xx and 5xx statuses.
    pub fn is_error(&self) -> bool {
        self.status.as_u16() > 399
    }

    /// Returns the status line, e.g. `"500 Internal Server Error"`.
    pub fn status_line(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {}", self.status.as_u16(), reason),
            None => self.status.as_u16().to_string(),
        }
    }

    /// Parses the body as a structured error, if it is one.
    pub fn error_body(&self) -> Option<HttpErrorResponse> {
        serde_json::from_str(&self.raw_body).ok()
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::DeserializationFailed`] with the raw body if the
    /// body does not match `T`.
    pub fn json<T>(&self) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(&self.raw_body).map_err(|e| {
            tracing::error!(
                error = %e,
                status = self.status.as_u16(),
                raw_response = %self.raw_body,
                "Failed to deserialize response"
            );
            TransportError::DeserializationFailed {
                status: self.status,
                raw_response: self.raw_body.clone(),
                serde_error: e.to_string(),
            }
        })
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde::Deserialize;

    fn response(status: StatusCode, body: &str) -> RawResponse {
        RawResponse::new(
            status,
            HeaderMap::new(),
            body.to_string(),
            Vec::new(),
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_status_line_without_reason() {
        let resp = response(StatusCode::from_u16(599).unwrap(), "");
        assert_eq!(resp.status_line(), "599");
        assert!(resp.is_error());
    }

    #[test]
    fn test_error_body_ignores_non_json() {
        let resp = response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(resp.error_body().is_none());
    }

    #[test]
    fn test_json_failure_keeps_raw_body() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Expected {
            id: u64,
        }

        let resp = response(StatusCode::OK, "not json");
        match resp.json::<Expected>() {
            Err(TransportError::DeserializationFailed {
                status,
                raw_response,
                serde_error,
            }) => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(raw_response, "not json");
                assert!(serde_error.contains("expected"));
            }
            other => panic!("Expected DeserializationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_header_lookup() {
        let mut resp = response(StatusCode::OK, "");
        resp.headers
            .insert("content-type", HeaderValue::from_static("application/json"));
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.header("x-missing"), None);
    }
}
