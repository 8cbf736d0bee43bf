//! # arpa-client - a typed client for the Arpa business API
//!
//! `arpa-client` wraps `reqwest` to call the customer, transaction and service
//! endpoints of an Arpa backend. It provides typed request and response
//! bodies, bearer and session-cookie authentication, cancellation, and
//! OpenTelemetry trace propagation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use arpa_client::{CallContext, Client, CreateServiceRequest};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), arpa_client::ApiError> {
//!     let client = Client::builder()
//!         .base_url("https://arpa.example.com")?
//!         .timeout(Duration::from_secs(30))
//!         .build()?;
//!
//!     let ctx = CallContext::new();
//!     let jwt = client.admin_authenticate(&ctx, "admin", "secret").await?;
//!
//!     let service = CreateServiceRequest {
//!         service_name: "Consulting".to_string(),
//!         service_code: "S-100".to_string(),
//!         item_category_id: 3,
//!         ia_group_id: 1,
//!     };
//!     let created = client
//!         .create_service(&ctx, &jwt.access_token, &service)
//!         .await?;
//!     println!("Created {}", created.service_name);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`ApiError`], which carries the HTTP status code
//! (or `0`), a message prefixed with the failing operation, and an
//! [`ApiErrorKind`]:
//!
//! ```no_run
//! use arpa_client::{ApiErrorKind, CallContext, Client};
//!
//! # async fn example() -> Result<(), arpa_client::ApiError> {
//! # let client = Client::new("https://arpa.example.com")?;
//! match client.get_admin_token(&CallContext::new(), "admin", "wrong").await {
//!     Ok(token) => println!("{} cookies", token.cookies.len()),
//!     Err(e) if e.kind == ApiErrorKind::InvalidGrant => eprintln!("rejected credentials"),
//!     Err(e) if e.status().is_some() => eprintln!("HTTP {}: {}", e.code, e.message),
//!     Err(e) => eprintln!("transport failure: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Tracing
//!
//! Trace headers are injected when the call's [`CallContext`] (or the current
//! OpenTelemetry context) holds a valid span. Install a propagator once at
//! startup with `opentelemetry::global::set_text_map_propagator`, or attach one
//! per call with [`CallContext::with_propagator`].

mod client;
mod context;
mod error;
pub mod metadata;
pub mod models;
mod response;
pub mod types;

pub use client::{make_url, Client, ClientBuilder, Endpoints};
pub use context::{inject_tracing_headers, CallContext};
pub use error::{
    check_for_error, ApiError, ApiErrorKind, HttpErrorResponse, Result, TransportError,
    EMPTY_RESPONSE,
};
pub use models::{
    AddSub, CreateCustomerRequest, CreateCustomerResponse, CreateServiceRequest,
    CreateServiceResponse, CreateTransactionRequest, CreateTransactionResponse, CustomerQuery,
    CustomerRecord, GetCustomerResponse, GetServiceResponse, Jwt, ServiceQuery, ServiceRecord,
    ServiceToken, SessionCookie, TransactionData, TransactionLine,
};
pub use response::RawResponse;
