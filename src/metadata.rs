//! Outbound request descriptions.
//!
//! A [`RequestMetadata`] is everything the client needs to send one request:
//! method, endpoint path, headers and query parameters. The `with_*` methods
//! attach the Arpa authentication pieces.

use crate::error::TransportError;
use crate::models::SessionCookie;
use http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::collections::BTreeMap;

/// Metadata for an individual HTTP request.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The endpoint path, relative to the client's base URL.
    pub path: String,

    /// Headers for this request.
    pub headers: HeaderMap,

    /// Query parameters for this request.
    pub query_params: BTreeMap<String, String>,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query_params: BTreeMap::new(),
        }
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, TransportError> {
        let name = HeaderName::try_from(name.as_ref()).map_err(|e| {
            TransportError::ConfigurationError(format!("Invalid header name: {}", e))
        })?;
        let value = HeaderValue::try_from(value.as_ref()).map_err(|e| {
            TransportError::ConfigurationError(format!("Invalid header value: {}", e))
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Sets `Content-Type: application/json`.
    pub fn with_json_content_type(mut self) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    /// Sets `Authorization: Bearer <token>` and the JSON content type.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MissingCredential`] for an empty token.
    pub fn with_bearer_auth(mut self, token: &str) -> Result<Self, TransportError> {
        if token.is_empty() {
            return Err(TransportError::MissingCredential("bearer token"));
        }
        let mut value = HeaderValue::try_from(format!("Bearer {}", token)).map_err(|e| {
            TransportError::ConfigurationError(format!("Invalid bearer token: {}", e))
        })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self.with_json_content_type())
    }

    /// Sets `Cache-Control: no-cache`.
    pub fn with_no_cache(mut self) -> Self {
        self.headers
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        self
    }

    /// Sends the first of `cookies` in a `Cookie` header.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MissingCredential`] if `cookies` is empty.
    pub fn with_session_cookie(mut self, cookies: &[SessionCookie]) -> Result<Self, TransportError> {
        let cookie = cookies
            .first()
            .ok_or(TransportError::MissingCredential("session cookie"))?;
        let mut value = HeaderValue::try_from(cookie.header_value()).map_err(|e| {
            TransportError::ConfigurationError(format!("Invalid cookie: {}", e))
        })?;
        value.set_sensitive(true);
        self.headers.insert(COOKIE, value);
        Ok(self)
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_auth_sets_json_headers() {
        let metadata = RequestMetadata::new(Method::POST, "serv/api/PostService")
            .with_bearer_auth("abc")
            .unwrap();
        assert_eq!(metadata.headers[AUTHORIZATION], "Bearer abc");
        assert!(metadata.headers[AUTHORIZATION].is_sensitive());
        assert_eq!(metadata.headers[CONTENT_TYPE], "application/json");
        assert!(metadata.headers.get(CACHE_CONTROL).is_none());
    }

    #[test]
    fn test_empty_bearer_token_is_rejected() {
        let err = RequestMetadata::default().with_bearer_auth("").unwrap_err();
        assert!(matches!(err, TransportError::MissingCredential("bearer token")));
    }

    #[test]
    fn test_no_cache() {
        let metadata = RequestMetadata::default().with_no_cache();
        assert_eq!(metadata.headers[CACHE_CONTROL], "no-cache");
    }

    #[test]
    fn test_session_cookie_uses_first() {
        let cookies = vec![
            SessionCookie::new("session", "one"),
            SessionCookie::new("other", "two"),
        ];
        let metadata = RequestMetadata::default()
            .with_session_cookie(&cookies)
            .unwrap();
        assert_eq!(metadata.headers[COOKIE], "session=one");
        assert_eq!(metadata.headers.get_all(COOKIE).iter().count(), 1);
    }

    #[test]
    fn test_empty_cookie_slice_is_rejected() {
        let err = RequestMetadata::default()
            .with_session_cookie(&[])
            .unwrap_err();
        assert!(matches!(err, TransportError::MissingCredential("session cookie")));
    }

    #[test]
    fn test_invalid_header_is_configuration_error() {
        let err = RequestMetadata::default()
            .with_header("bad header", "x")
            .unwrap_err();
        assert!(matches!(err, TransportError::ConfigurationError(_)));
    }

    #[test]
    fn test_query_params() {
        let metadata = RequestMetadata::default()
            .with_query_param("Mobile", "0912")
            .with_query_params([("ItemCode".to_string(), "S-1".to_string())]);
        assert_eq!(metadata.query_params["Mobile"], "0912");
        assert_eq!(metadata.query_params["ItemCode"], "S-1");
    }
}
