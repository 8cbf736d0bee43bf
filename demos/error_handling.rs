//! Example demonstrating error handling and cancellation.
//!
//! This example shows how to:
//! - Tell rejected credentials apart from other failures
//! - Inspect the status code and message of HTTP errors
//! - Reach the underlying transport error
//! - Cancel a call in flight
//!
//! Run with: `ARPA_BASE_URL=https://arpa.example.com cargo run --example error_handling`

use arpa_client::{ApiErrorKind, CallContext, Client, CreateServiceRequest, TransportError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("arpa_client=info")
        .init();

    let base_url =
        std::env::var("ARPA_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let client = Client::builder()
        .base_url(base_url)?
        .connect_timeout(Duration::from_secs(5))
        .build()?;

    println!("=== Example 1: Rejected Credentials ===");
    match client
        .admin_authenticate(&CallContext::new(), "admin", "wrong-password")
        .await
    {
        Ok(jwt) => println!("Unexpected success, token expires at {:?}", jwt.expires_at),
        Err(e) if e.kind == ApiErrorKind::InvalidGrant => {
            println!("Token exchange failed: {}", e.message);
        }
        Err(e) if e.status().is_some() => {
            println!("Credentials rejected!");
            println!("  Code: {}", e.code);
            println!("  Kind: {}", e.kind);
            println!("  Message: {}", e.message);
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: HTTP Errors and Transport Failures ===");
    let service = CreateServiceRequest {
        service_name: "Consulting".to_string(),
        service_code: "S-100".to_string(),
        item_category_id: 3,
        ia_group_id: 1,
    };
    match client
        .create_service(&CallContext::new(), "expired-token", &service)
        .await
    {
        Ok(created) => println!("Created {}", created.service_name),
        Err(e) => match (e.status(), e.transport_error()) {
            (Some(status), _) => {
                println!("HTTP Error!");
                println!("  Status: {}", status);
                println!("  Is client error (4xx): {}", status.is_client_error());
                println!("  Message: {}", e.message);
            }
            (None, Some(TransportError::DeserializationFailed { raw_response, .. })) => {
                println!("Unexpected body!");
                println!(
                    "  Raw response (first 200 chars): {}",
                    raw_response.chars().take(200).collect::<String>()
                );
            }
            (None, Some(transport)) => println!("Transport failure: {}", transport),
            (None, None) => println!("Error: {}", e),
        },
    }
    println!();

    println!("=== Example 3: Missing Session Cookies ===");
    let err = client
        .get_customer_by_mobile(&CallContext::new(), "token", &[], "09120000000")
        .await
        .err();
    if let Some(e) = err {
        println!("Rejected before sending: {}", e);
    }
    println!();

    println!("=== Example 4: Cancellation ===");
    let token = CancellationToken::new();
    let ctx = CallContext::new().with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });
    match client.get_admin_token(&ctx, "admin", "secret").await {
        Ok(_) => println!("Finished before cancellation"),
        Err(e) if e.is_cancelled() => println!("Cancelled: {}", e),
        Err(e) => println!("Other error: {}", e),
    }

    Ok(())
}
