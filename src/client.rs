//! The Arpa API client.
//!
//! The [`Client`] type is the main entry point. Use [`ClientBuilder`] to
//! configure the base URL, the endpoint table and the shared transport.

use crate::{
    context::{inject_tracing_headers, CallContext},
    error::{check_for_error, ApiError, TransportError},
    metadata::RequestMetadata,
    models::{
        CreateCustomerRequest, CreateCustomerResponse, CreateServiceRequest, CreateServiceResponse,
        CreateTransactionRequest, CreateTransactionResponse, CustomerQuery, GetCustomerResponse,
        GetServiceResponse, Jwt, ServiceQuery, ServiceToken, SessionCookie,
    },
    response::RawResponse,
    types::to_query_params,
    Result,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const URL_SEPARATOR: &str = "/";

const DEFAULT_USER_AGENT: &str = concat!("arpa-client/", env!("CARGO_PKG_VERSION"));

/// Joins path segments with `/`.
///
/// ```
/// assert_eq!(arpa_client::make_url(&["serv", "api", "PostService"]), "serv/api/PostService");
/// ```
pub fn make_url(segments: &[&str]) -> String {
    segments.join(URL_SEPARATOR)
}

/// Path suffixes of the Arpa endpoints, relative to the base URL.
///
/// Missing fields take their default when deserialized, so a configuration
/// file only needs to list the paths it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Legacy token endpoint (POST, credentials in headers).
    pub authenticate: String,
    /// Token endpoint issuing a raw token and session cookies (GET).
    pub get_service_token: String,
    pub create_customer: String,
    pub create_transaction: String,
    pub create_service: String,
    pub get_customer: String,
    pub get_service: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authenticate: make_url(&["serv", "token", "GetServiceToken"]),
            get_service_token: make_url(&["serv", "token", "GetServiceToken"]),
            create_customer: make_url(&["serv", "api", "PostBussiness"]),
            create_transaction: make_url(&["serv", "api", "NewTransaction"]),
            create_service: make_url(&["serv", "api", "PostService"]),
            get_customer: make_url(&["serv", "api", "GetBusiness"]),
            get_service: make_url(&["serv", "api", "GetService"]),
        }
    }
}

/// A client for the Arpa customer, transaction and service API.
///
/// The client is cheap to clone and safe to share between tasks; clones share
/// the same connection pool.
///
/// # Examples
///
/// ```no_run
/// use arpa_client::{CallContext, Client, CreateCustomerRequest};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), arpa_client::ApiError> {
/// let client = Client::builder()
///     .base_url("https://arpa.example.com")?
///     .timeout(Duration::from_secs(30))
///     .build()?;
///
/// let ctx = CallContext::new();
/// let token = client.get_admin_token(&ctx, "admin", "secret").await?;
///
/// let customer = CreateCustomerRequest {
///     bus_name: "Acme".to_string(),
///     mobile: Some("09120000000".to_string()),
///     ..Default::default()
/// };
/// let created = client.create_customer(&ctx, &token.token, &customer).await?;
/// println!("Customer code: {}", created.business_code);
///
/// let found = client
///     .get_customer_by_business_code(&ctx, &token.token, &token.cookies, &created.business_code)
///     .await?;
/// println!("Found {} records", found.data.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Clone)]
struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    default_headers: HeaderMap,
    endpoints: Endpoints,
}

impl Client {
    /// Creates a client for `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the transport cannot be built.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::builder().base_url(base_url)?.build()
    }

    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the base URL, without a trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Returns the endpoint table.
    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// Returns the underlying HTTP transport.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.inner.http_client
    }

    /// Replaces the underlying HTTP transport.
    ///
    /// Clones made before this call keep the previous transport.
    pub fn set_http_client(&mut self, http_client: reqwest::Client) {
        Arc::make_mut(&mut self.inner).http_client = http_client;
    }

    /// Returns a base request with trace headers injected from `ctx`.
    pub fn get_request(&self, ctx: &CallContext, method: Method, path: &str) -> RequestMetadata {
        let mut metadata = RequestMetadata::new(method, path);
        inject_tracing_headers(ctx, &mut metadata.headers);
        metadata
    }

    /// Returns a JSON request carrying `Authorization: Bearer <token>`.
    pub fn get_request_with_bearer_auth(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        token: &str,
    ) -> std::result::Result<RequestMetadata, TransportError> {
        self.get_request(ctx, method, path).with_bearer_auth(token)
    }

    /// Like [`get_request_with_bearer_auth`](Self::get_request_with_bearer_auth),
    /// with `Cache-Control: no-cache`.
    pub fn get_request_with_bearer_auth_no_cache(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        token: &str,
    ) -> std::result::Result<RequestMetadata, TransportError> {
        Ok(self
            .get_request_with_bearer_auth(ctx, method, path, token)?
            .with_no_cache())
    }

    /// Like [`get_request_with_bearer_auth`](Self::get_request_with_bearer_auth),
    /// also sending the first session cookie.
    pub fn get_request_with_bearer_auth_with_cookie(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        token: &str,
        cookies: &[SessionCookie],
    ) -> std::result::Result<RequestMetadata, TransportError> {
        self.get_request_with_bearer_auth(ctx, method, path, token)?
            .with_session_cookie(cookies)
    }

    /// Resolves an endpoint path against the base URL.
    pub fn endpoint_url(&self, path: &str) -> std::result::Result<Url, TransportError> {
        let url = format!(
            "{}{}{}",
            self.inner.base_url,
            URL_SEPARATOR,
            path.trim_start_matches(URL_SEPARATOR)
        );
        Ok(Url::parse(&url)?)
    }

    /// Sends one request and reads the response to completion.
    ///
    /// The round trip is aborted with [`TransportError::Cancelled`] if the
    /// context's cancellation token fires first. HTTP error statuses are not
    /// treated as failures here; see [`check_for_error`].
    pub async fn execute<Req>(
        &self,
        ctx: &CallContext,
        metadata: RequestMetadata,
        body: Option<&Req>,
    ) -> std::result::Result<RawResponse, TransportError>
    where
        Req: Serialize + ?Sized,
    {
        let mut url = self.endpoint_url(&metadata.path)?;
        if !metadata.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &metadata.query_params {
                pairs.append_pair(key, value);
            }
        }

        tracing::debug!(
            method = %metadata.method,
            path = %metadata.path,
            "Executing Arpa API request"
        );

        let mut request = self
            .inner
            .http_client
            .request(metadata.method.clone(), url);

        for (name, value) in &self.inner.default_headers {
            request = request.header(name, value);
        }

        for (name, value) in &metadata.headers {
            request = request.header(name, value);
        }

        if let Some(body) = body {
            let json = serde_json::to_value(body)
                .map_err(|e| TransportError::SerializationFailed(e.to_string()))?;
            request = request.json(&json);
        }

        let round_trip = async {
            let started = Instant::now();
            let response = request.send().await?;
            RawResponse::read(response, started).await
        };

        let response = match ctx.cancellation_token() {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!(path = %metadata.path, "Arpa API request cancelled");
                    return Err(TransportError::Cancelled);
                }
                result = round_trip => result?,
            },
            None => round_trip.await?,
        };

        tracing::info!(
            status = response.status.as_u16(),
            latency_ms = response.latency.as_millis(),
            path = %metadata.path,
            "Received Arpa API response"
        );

        Ok(response)
    }

    /// Sends a prepared request and maps the outcome with `context`.
    async fn send<Req>(
        &self,
        ctx: &CallContext,
        metadata: std::result::Result<RequestMetadata, TransportError>,
        body: Option<&Req>,
        context: &str,
    ) -> Result<RawResponse>
    where
        Req: Serialize + ?Sized,
    {
        let outcome = match metadata {
            Ok(metadata) => self.execute(ctx, metadata, body).await,
            Err(e) => Err(e),
        };
        check_for_error(outcome.map(Some), context)
    }

    /// Authenticates with the legacy token endpoint.
    ///
    /// The credentials travel as `username` and `password` headers.
    pub async fn admin_authenticate(
        &self,
        ctx: &CallContext,
        username: &str,
        password: &str,
    ) -> Result<Jwt> {
        const ERR_MESSAGE: &str = "could not get token";

        let metadata = self
            .get_request(ctx, Method::POST, &self.inner.endpoints.authenticate)
            .with_header("username", username)
            .and_then(|m| m.with_header("password", password));

        let response = self
            .send::<()>(ctx, metadata, None, ERR_MESSAGE)
            .await?;
        decode(&response, ERR_MESSAGE)
    }

    /// Obtains a raw service token and the session cookies issued with it.
    ///
    /// The cookies are needed by the customer and service lookups.
    pub async fn get_admin_token(
        &self,
        ctx: &CallContext,
        username: &str,
        password: &str,
    ) -> Result<ServiceToken> {
        const ERR_MESSAGE: &str = "could not get token";

        let metadata = self
            .get_request(ctx, Method::GET, &self.inner.endpoints.get_service_token)
            .with_query_param("username", username)
            .with_query_param("password", password);

        let response = self
            .send::<()>(ctx, Ok(metadata), None, ERR_MESSAGE)
            .await?;

        Ok(ServiceToken {
            token: response.raw_body,
            cookies: response.cookies,
        })
    }

    /// Creates a customer, or reports the existing one.
    pub async fn create_customer(
        &self,
        ctx: &CallContext,
        access_token: &str,
        customer: &CreateCustomerRequest,
    ) -> Result<CreateCustomerResponse> {
        const ERR_MESSAGE: &str = "could not create customer";

        let metadata = self.get_request_with_bearer_auth(
            ctx,
            Method::POST,
            &self.inner.endpoints.create_customer,
            access_token,
        );

        let response = self
            .send(ctx, metadata, Some(customer), ERR_MESSAGE)
            .await?;
        decode(&response, ERR_MESSAGE)
    }

    /// Creates a transaction (invoice) with its line items.
    pub async fn create_transaction(
        &self,
        ctx: &CallContext,
        access_token: &str,
        transaction: &CreateTransactionRequest,
    ) -> Result<CreateTransactionResponse> {
        const ERR_MESSAGE: &str = "could not create transaction";

        let metadata = self.get_request_with_bearer_auth(
            ctx,
            Method::POST,
            &self.inner.endpoints.create_transaction,
            access_token,
        );

        let response = self
            .send(ctx, metadata, Some(transaction), ERR_MESSAGE)
            .await?;
        decode(&response, ERR_MESSAGE)
    }

    /// Creates a service item.
    pub async fn create_service(
        &self,
        ctx: &CallContext,
        access_token: &str,
        service: &CreateServiceRequest,
    ) -> Result<CreateServiceResponse> {
        const ERR_MESSAGE: &str = "could not create service";

        let metadata = self.get_request_with_bearer_auth(
            ctx,
            Method::POST,
            &self.inner.endpoints.create_service,
            access_token,
        );

        let response = self
            .send(ctx, metadata, Some(service), ERR_MESSAGE)
            .await?;
        decode(&response, ERR_MESSAGE)
    }

    /// Looks customers up with an arbitrary query.
    ///
    /// # Errors
    ///
    /// Fails without sending anything if `cookies` is empty.
    pub async fn get_customer(
        &self,
        ctx: &CallContext,
        access_token: &str,
        cookies: &[SessionCookie],
        query: &CustomerQuery,
    ) -> Result<GetCustomerResponse> {
        const ERR_MESSAGE: &str = "could not get customer info";

        let metadata = self.lookup_request(
            ctx,
            &self.inner.endpoints.get_customer,
            access_token,
            cookies,
            query,
        );

        let response = self
            .send::<()>(ctx, metadata, None, ERR_MESSAGE)
            .await?;
        decode(&response, ERR_MESSAGE)
    }

    /// Looks customers up by mobile number.
    pub async fn get_customer_by_mobile(
        &self,
        ctx: &CallContext,
        access_token: &str,
        cookies: &[SessionCookie],
        mobile: &str,
    ) -> Result<GetCustomerResponse> {
        self.get_customer(ctx, access_token, cookies, &CustomerQuery::by_mobile(mobile))
            .await
    }

    /// Looks customers up by business code.
    pub async fn get_customer_by_business_code(
        &self,
        ctx: &CallContext,
        access_token: &str,
        cookies: &[SessionCookie],
        business_code: &str,
    ) -> Result<GetCustomerResponse> {
        self.get_customer(
            ctx,
            access_token,
            cookies,
            &CustomerQuery::by_business_code(business_code),
        )
        .await
    }

    /// Looks a service item up by its item code.
    ///
    /// # Errors
    ///
    /// Fails without sending anything if `cookies` is empty.
    pub async fn get_service_by_item_code(
        &self,
        ctx: &CallContext,
        access_token: &str,
        cookies: &[SessionCookie],
        item_code: &str,
    ) -> Result<GetServiceResponse> {
        const ERR_MESSAGE: &str = "could not get service info";

        let query = ServiceQuery {
            item_code: Some(item_code.to_string()),
        };
        let metadata = self.lookup_request(
            ctx,
            &self.inner.endpoints.get_service,
            access_token,
            cookies,
            &query,
        );

        let response = self
            .send::<()>(ctx, metadata, None, ERR_MESSAGE)
            .await?;
        decode(&response, ERR_MESSAGE)
    }

    fn lookup_request<Q>(
        &self,
        ctx: &CallContext,
        path: &str,
        access_token: &str,
        cookies: &[SessionCookie],
        query: &Q,
    ) -> std::result::Result<RequestMetadata, TransportError>
    where
        Q: Serialize,
    {
        let params = to_query_params(query)?;
        Ok(self
            .get_request_with_bearer_auth_with_cookie(ctx, Method::GET, path, access_token, cookies)?
            .with_query_params(params))
    }
}

fn decode<T>(response: &RawResponse, context: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    response
        .json()
        .map_err(|e| ApiError::from_transport(e, context))
}

/// Builder for configuring and creating a [`Client`].
///
/// Settings are applied in call order on top of the defaults; the last call
/// for a setting wins.
///
/// # Examples
///
/// ```no_run
/// use arpa_client::{ClientBuilder, Endpoints};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), arpa_client::ApiError> {
/// let client = ClientBuilder::new()
///     .base_url("https://arpa.example.com/")?
///     .timeout(Duration::from_secs(30))
///     .pool_max_idle_per_host(8)
///     .endpoints(Endpoints {
///         get_service: "serv/api/GetItem".to_string(),
///         ..Default::default()
///     })
///     .default_header("X-Branch", "tehran-01")?
///     .build()?;
/// assert_eq!(client.base_url(), "https://arpa.example.com");
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<String>,
    default_headers: HeaderMap,
    endpoints: Endpoints,
    http_client: Option<reqwest::Client>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            endpoints: Endpoints::default(),
            http_client: None,
            timeout: None,
            connect_timeout: None,
            pool_idle_timeout: None,
            pool_max_idle_per_host: None,
            user_agent: None,
        }
    }

    /// Sets the base URL. Trailing `/` characters are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let trimmed = url.as_ref().trim_end_matches(URL_SEPARATOR);
        Url::parse(trimmed).map_err(TransportError::from)?;
        self.base_url = Some(trimmed.to_string());
        Ok(self)
    }

    /// Replaces the endpoint table.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref()).map_err(|e| {
            TransportError::ConfigurationError(format!("Invalid header name: {}", e))
        })?;
        let value = HeaderValue::try_from(value.as_ref()).map_err(|e| {
            TransportError::ConfigurationError(format!("Invalid header value: {}", e))
        })?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Uses a preconfigured transport.
    ///
    /// Timeout, pool and user-agent settings on this builder are ignored when a
    /// transport is supplied.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Sets the total timeout of each request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets how long idle pooled connections are kept.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Sets the maximum number of idle connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Sets the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn has_transport_settings(&self) -> bool {
        self.timeout.is_some()
            || self.connect_timeout.is_some()
            || self.pool_idle_timeout.is_some()
            || self.pool_max_idle_per_host.is_some()
            || self.user_agent.is_some()
    }

    fn build_http_client(&self) -> std::result::Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT));

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = self.pool_idle_timeout {
            builder = builder.pool_idle_timeout(timeout);
        }
        if let Some(max) = self.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }

        builder.build().map_err(|e| {
            TransportError::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or if the transport
    /// cannot be built.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .clone()
            .ok_or_else(|| TransportError::ConfigurationError("Base URL is required".to_string()))?;

        let http_client = match self.http_client.clone() {
            Some(http_client) => {
                if self.has_transport_settings() {
                    tracing::warn!(
                        "Custom HTTP client supplied; ignoring timeout, pool and user-agent settings"
                    );
                }
                http_client
            }
            None => self.build_http_client()?,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                default_headers: self.default_headers,
                endpoints: self.endpoints,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{AUTHORIZATION, CACHE_CONTROL, COOKIE};

    fn client() -> Client {
        Client::new("https://arpa.example.com/").unwrap()
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.get_service_token, "serv/token/GetServiceToken");
        assert_eq!(endpoints.create_customer, "serv/api/PostBussiness");
        assert_eq!(endpoints.create_transaction, "serv/api/NewTransaction");
        assert_eq!(endpoints.create_service, "serv/api/PostService");
        assert_eq!(endpoints.get_customer, "serv/api/GetBusiness");
        assert_eq!(endpoints.authenticate, "serv/token/GetServiceToken");
        assert_eq!(endpoints.get_service, "serv/api/GetService");
    }

    #[test]
    fn test_endpoints_partial_config() {
        let endpoints: Endpoints =
            serde_json::from_str(r#"{"create_service":"v2/services"}"#).unwrap();
        assert_eq!(endpoints.create_service, "v2/services");
        assert_eq!(endpoints.get_customer, "serv/api/GetBusiness");
    }

    #[test]
    fn test_base_url_is_trimmed_and_joined() {
        let client = client();
        assert_eq!(client.base_url(), "https://arpa.example.com");
        assert_eq!(
            client.endpoint_url("serv/api/PostService").unwrap().as_str(),
            "https://arpa.example.com/serv/api/PostService"
        );
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let client = Client::new("https://arpa.example.com/erp//").unwrap();
        assert_eq!(
            client.endpoint_url("/serv/api/GetBusiness").unwrap().as_str(),
            "https://arpa.example.com/erp/serv/api/GetBusiness"
        );
    }

    #[test]
    fn test_builder_requires_base_url() {
        let err = ClientBuilder::new().build().err().unwrap();
        assert_eq!(err.code, 0);
        assert!(err.message.contains("Base URL is required"));
    }

    #[test]
    fn test_builder_rejects_invalid_url() {
        assert!(ClientBuilder::new().base_url("not a url").is_err());
    }

    #[test]
    fn test_request_helpers() {
        let client = client();
        let ctx = CallContext::new();

        let plain = client.get_request(&ctx, Method::GET, "p");
        assert!(plain.headers.is_empty());

        let no_cache = client
            .get_request_with_bearer_auth_no_cache(&ctx, Method::GET, "p", "tok")
            .unwrap();
        assert_eq!(no_cache.headers[AUTHORIZATION], "Bearer tok");
        assert_eq!(no_cache.headers[CACHE_CONTROL], "no-cache");

        let cookies = [SessionCookie::new("sid", "1")];
        let with_cookie = client
            .get_request_with_bearer_auth_with_cookie(&ctx, Method::GET, "p", "tok", &cookies)
            .unwrap();
        assert_eq!(with_cookie.headers[COOKIE], "sid=1");

        assert!(client
            .get_request_with_bearer_auth_with_cookie(&ctx, Method::GET, "p", "tok", &[])
            .is_err());
    }

    #[test]
    fn test_set_http_client_does_not_affect_clones() {
        let mut client = client();
        let before = client.clone();
        client.set_http_client(reqwest::Client::new());
        assert!(!Arc::ptr_eq(&client.inner, &before.inner));
        assert_eq!(client.base_url(), before.base_url());
    }
}
