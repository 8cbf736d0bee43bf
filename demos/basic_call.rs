//! Basic example: authenticate, create records and look them up.
//!
//! This example shows how to:
//! - Configure a client from the environment
//! - Obtain a service token and its session cookies
//! - Create a customer and a service item
//! - Look records up with the session cookies
//!
//! Run with:
//! `ARPA_BASE_URL=https://arpa.example.com ARPA_USERNAME=admin ARPA_PASSWORD=secret cargo run --example basic_call`

use arpa_client::{ApiError, CallContext, Client, CreateCustomerRequest, CreateServiceRequest};
use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter("arpa_client=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url(env_or("ARPA_BASE_URL", "http://localhost:8080"))?
        .timeout(Duration::from_secs(30))
        .build()?;
    let ctx = CallContext::new();

    println!("=== Service Token ===");
    let token = client
        .get_admin_token(
            &ctx,
            &env_or("ARPA_USERNAME", "admin"),
            &env_or("ARPA_PASSWORD", "admin"),
        )
        .await?;
    println!("Token length: {}", token.token.len());
    println!("Session cookies: {}", token.cookies.len());
    println!();

    println!("=== Create Customer ===");
    let customer = CreateCustomerRequest {
        bus_name: "Acme Trading".to_string(),
        name: Some("Sara".to_string()),
        family: Some("Ahmadi".to_string()),
        mobile: Some("09120000000".to_string()),
        ..Default::default()
    };
    let created = client.create_customer(&ctx, &token.token, &customer).await?;
    println!("Business code: {}", created.business_code);
    println!("Business ID: {}", created.business_id);
    println!("Already existed: {}", created.existed);
    println!();

    println!("=== Create Service ===");
    let service = CreateServiceRequest {
        service_name: "Consulting".to_string(),
        service_code: "S-100".to_string(),
        item_category_id: 3,
        ia_group_id: 1,
    };
    let created_service = client.create_service(&ctx, &token.token, &service).await?;
    println!("Created service: {}", created_service.service_name);
    println!();

    println!("=== Lookups ===");
    let customers = client
        .get_customer_by_business_code(&ctx, &token.token, &token.cookies, &created.business_code)
        .await?;
    for record in &customers.data {
        println!(
            "Customer {} ({}), created {:?}",
            record.business_name, record.business_id, record.creation_date
        );
    }

    let services = client
        .get_service_by_item_code(&ctx, &token.token, &token.cookies, "S-100")
        .await?;
    for record in &services.data {
        println!("Service {} [{}]", record.service_name, record.item_code);
    }

    Ok(())
}
