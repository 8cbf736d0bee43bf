//! Request and response bodies for the Arpa endpoints.
//!
//! Field names follow the server's JSON exactly, including its spelling
//! (`BussinesCode`, `PostBussiness`). Optional business fields are `Option`s
//! so that an absent value is sent as `null` rather than as zero.

use crate::types::{arpa_time, EnforcedString};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Token issued by the legacy authenticate endpoint.
///
/// The client never checks the expiry; renewing the token is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Jwt {
    /// Bearer token for authenticated calls.
    pub access_token: String,

    /// Token used to obtain a new access token.
    #[serde(default)]
    pub refresh_token: String,

    /// When the access token expires, if the server said.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Jwt {
    /// Returns `true` if the token has a known expiry at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Raw service token and the session cookies issued with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceToken {
    /// The response body of the token endpoint, used as the bearer token.
    pub token: String,

    /// Cookies to pass to the cookie-bearing lookups.
    pub cookies: Vec<SessionCookie>,
}

/// A cookie issued by the server and replayed on lookup calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl SessionCookie {
    /// Creates a cookie with just a name and a value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            secure: false,
            http_only: false,
        }
    }

    /// Renders the cookie as sent in a `Cookie` request header.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

// Cookie values are session secrets; keep them out of logs.
impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("path", &self.path)
            .field("domain", &self.domain)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .finish()
    }
}

impl From<reqwest::cookie::Cookie<'_>> for SessionCookie {
    fn from(cookie: reqwest::cookie::Cookie<'_>) -> Self {
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            path: cookie.path().map(str::to_string),
            domain: cookie.domain().map(str::to_string),
            secure: cookie.secure(),
            http_only: cookie.http_only(),
        }
    }
}

/// Body of the create-customer call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    #[serde(rename = "BusName")]
    pub bus_name: String,
    #[serde(rename = "ProvinceId")]
    pub province_id: Option<i64>,
    #[serde(rename = "CityId")]
    pub city_id: Option<i64>,
    #[serde(rename = "Email")]
    pub email: Option<String>,
    #[serde(rename = "Mobile")]
    pub mobile: Option<String>,
    #[serde(rename = "PhoneNo")]
    pub phone_no: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Family")]
    pub family: Option<String>,
    #[serde(rename = "NationalCode")]
    pub national_code: Option<i64>,
    #[serde(rename = "BirthDate")]
    pub birth_date: Option<String>,
    #[serde(rename = "Sexuality")]
    pub sexuality: Option<String>,
    #[serde(rename = "RealOrFinancial")]
    pub real_or_financial: Option<i64>,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "FinCode")]
    pub fin_code: Option<i64>,
    #[serde(rename = "IDNo")]
    pub id_no: Option<i64>,
    #[serde(rename = "RegisterNumber")]
    pub register_number: Option<i64>,
    #[serde(rename = "BusinessCategoryId")]
    pub business_category_id: Option<i64>,
}

/// Result of the create-customer call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCustomerResponse {
    #[serde(rename = "BussinesCode")]
    pub business_code: String,
    #[serde(rename = "BussinessID")]
    pub business_id: String,
    /// `true` if a customer with the same identity already existed.
    #[serde(rename = "Existed")]
    pub existed: bool,
}

/// Body of the create-transaction call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(rename = "Data")]
    pub data: TransactionData,
    /// Line items as free-form column → value maps.
    #[serde(rename = "Items")]
    pub items: Vec<BTreeMap<String, Option<i64>>>,
    #[serde(rename = "AddSub")]
    pub add_sub: Vec<AddSub>,
}

/// Additions and subtractions applied to a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSub {
    #[serde(rename = "AddSubID")]
    pub add_sub_id: i64,
    #[serde(rename = "TASAmount")]
    pub tas_amount: i64,
}

/// Header of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionData {
    /// Left as `null` for new transactions.
    #[serde(rename = "TransactionID")]
    pub transaction_id: serde_json::Value,
    #[serde(rename = "BusinessID")]
    pub business_id: i64,
    #[serde(rename = "DocAliasId")]
    pub doc_alias_id: i64,
    #[serde(rename = "TransStateId")]
    pub trans_state_id: i64,
    #[serde(rename = "FactorTypeId")]
    pub factor_type_id: i64,
    #[serde(rename = "CalcTaxAndToll")]
    pub calc_tax_and_toll: i64,
    #[serde(rename = "TransDiscountAmount")]
    pub trans_discount_amount: i64,
    #[serde(rename = "TransDiscountPercent")]
    pub trans_discount_percent: f64,
    #[serde(rename = "DepartmentID")]
    pub department_id: i64,
    #[serde(rename = "SettlementID")]
    pub settlement_id: i64,
    #[serde(rename = "Description")]
    pub description: String,
}

/// Result of the create-transaction call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTransactionResponse {
    #[serde(default)]
    pub data: Vec<TransactionLine>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// One created transaction line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionLine {
    #[serde(rename = "TransactionID")]
    pub transaction_id: i64,
    #[serde(rename = "TransNumber")]
    pub trans_number: i64,
    #[serde(rename = "TransLineID")]
    pub trans_line_id: i64,
    #[serde(rename = "ItemID")]
    pub item_id: i64,
}

/// Body of the create-service call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    #[serde(rename = "ServiceName")]
    pub service_name: String,
    #[serde(rename = "ServiceCode")]
    pub service_code: String,
    #[serde(rename = "ItemCategoryID")]
    pub item_category_id: i64,
    #[serde(rename = "IAGroupID")]
    pub ia_group_id: i64,
}

/// Result of the create-service call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateServiceResponse {
    #[serde(rename = "ServiceName")]
    pub service_name: String,
    #[serde(rename = "ItemCategoryId")]
    pub item_category_id: i64,
}

/// Query of the customer lookup endpoint. Unset keys are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerQuery {
    #[serde(rename = "Mobile")]
    pub mobile: Option<String>,
    #[serde(rename = "BusinessCode")]
    pub business_code: Option<String>,
}

impl CustomerQuery {
    /// Looks a customer up by mobile number.
    pub fn by_mobile(mobile: impl Into<String>) -> Self {
        Self {
            mobile: Some(mobile.into()),
            ..Default::default()
        }
    }

    /// Looks a customer up by business code.
    pub fn by_business_code(business_code: impl Into<String>) -> Self {
        Self {
            business_code: Some(business_code.into()),
            ..Default::default()
        }
    }
}

/// Query of the service lookup endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceQuery {
    #[serde(rename = "ItemCode")]
    pub item_code: Option<String>,
}

/// Result of the customer lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetCustomerResponse {
    #[serde(default)]
    pub data: Vec<CustomerRecord>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// A customer ("business") as stored by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerRecord {
    #[serde(rename = "RowNumber")]
    pub row_number: EnforcedString,
    #[serde(rename = "BusinessID")]
    pub business_id: EnforcedString,
    #[serde(rename = "BusinessCode")]
    pub business_code: EnforcedString,
    #[serde(rename = "BusinessName")]
    pub business_name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "PhoneNo")]
    pub phone_no: String,
    #[serde(rename = "FinCode")]
    pub fin_code: String,
    #[serde(rename = "Mobile")]
    pub mobile: String,
    #[serde(rename = "Fax")]
    pub fax: String,
    #[serde(rename = "PriceLevelID")]
    pub price_level_id: String,
    #[serde(rename = "DefaultDiscount")]
    pub default_discount: i64,
    #[serde(rename = "BusinessCategoryID")]
    pub business_category_id: String,
    #[serde(rename = "AccID")]
    pub acc_id: String,
    #[serde(rename = "PostalCode")]
    pub postal_code: String,
    #[serde(rename = "GeoRegionID")]
    pub geo_region_id: String,
    #[serde(rename = "DeliveryRegionID")]
    pub delivery_region_id: String,
    #[serde(rename = "DefaultSettlementID")]
    pub default_settlement_id: String,
    #[serde(rename = "WithoutCredit")]
    pub without_credit: String,
    #[serde(rename = "County")]
    pub county: String,
    #[serde(rename = "RegisterNumber")]
    pub register_number: String,
    #[serde(rename = "LatinName")]
    pub latin_name: String,
    #[serde(rename = "BusinessActivity")]
    pub business_activity: String,
    #[serde(rename = "BusDescription")]
    pub bus_description: String,
    #[serde(rename = "InActive")]
    pub in_active: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Family")]
    pub family: String,
    #[serde(rename = "FatherName")]
    pub father_name: String,
    #[serde(rename = "NationalCode")]
    pub national_code: String,
    #[serde(rename = "IDNo")]
    pub id_no: String,
    #[serde(rename = "BirthPlace")]
    pub birth_place: String,
    #[serde(rename = "BankID")]
    pub bank_id: String,
    #[serde(rename = "AccountType")]
    pub account_type: String,
    #[serde(rename = "AccountNo")]
    pub account_no: String,
    #[serde(rename = "Sexuality")]
    pub sexuality: String,
    #[serde(rename = "Creditable")]
    pub creditable: String,
    #[serde(rename = "ProvinceID")]
    pub province_id: String,
    #[serde(rename = "CityID")]
    pub city_id: String,
    #[serde(rename = "TaxCityCode")]
    pub tax_city_code: String,
    #[serde(rename = "TaxProvincesCode")]
    pub tax_provinces_code: String,
    #[serde(rename = "PerCityCode")]
    pub per_city_code: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "WebSite")]
    pub web_site: String,
    #[serde(rename = "RelatedUserID")]
    pub related_user_id: String,
    #[serde(rename = "Creator_UserID")]
    pub creator_user_id: String,
    #[serde(rename = "Creation_Date", with = "arpa_time")]
    pub creation_date: Option<NaiveDateTime>,
    #[serde(rename = "CardNumber")]
    pub card_number: String,
    #[serde(rename = "CardSerial")]
    pub card_serial: String,
    #[serde(rename = "RepresentorCode")]
    pub representor_code: String,
    #[serde(rename = "RepresentorID")]
    pub representor_id: String,
    #[serde(rename = "CheckCredit")]
    pub check_credit: i64,
    #[serde(rename = "UnCashCredit")]
    pub un_cash_credit: i64,
    #[serde(rename = "Modification_Date", with = "arpa_time")]
    pub modification_date: Option<NaiveDateTime>,
    #[serde(rename = "IsCustomer")]
    pub is_customer: String,
    #[serde(rename = "IsVendor")]
    pub is_vendor: String,
    #[serde(rename = "IsSaleManager")]
    pub is_sale_manager: String,
    #[serde(rename = "IsRepresentor")]
    pub is_representor: String,
    #[serde(rename = "IsDeliveryManager")]
    pub is_delivery_manager: String,
    #[serde(rename = "RealOrFinancial")]
    pub real_or_financial: String,
}

/// Result of the service lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetServiceResponse {
    #[serde(default)]
    pub data: Vec<ServiceRecord>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// A service item as stored by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceRecord {
    #[serde(rename = "ItemID")]
    pub item_id: EnforcedString,
    #[serde(rename = "ItemCode")]
    pub item_code: EnforcedString,
    #[serde(rename = "ServiceName")]
    pub service_name: String,
    #[serde(rename = "ItemCategoryID")]
    pub item_category_id: EnforcedString,
    #[serde(rename = "IAGroupID")]
    pub ia_group_id: EnforcedString,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_create_customer_request_sends_nulls() {
        let request = CreateCustomerRequest {
            bus_name: "Acme".into(),
            mobile: Some("09120000000".into()),
            national_code: Some(0),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["BusName"], "Acme");
        assert_eq!(json["Mobile"], "09120000000");
        assert_eq!(json["NationalCode"], 0);
        assert!(json["Email"].is_null());
        assert!(json.as_object().unwrap().contains_key("Email"));
    }

    #[test]
    fn test_create_customer_response_spelling() {
        let response: CreateCustomerResponse =
            serde_json::from_str(r#"{"BussinesCode":"127013","BussinessID":"42","Existed":true}"#)
                .unwrap();
        assert_eq!(response.business_code, "127013");
        assert_eq!(response.business_id, "42");
        assert!(response.existed);
    }

    #[test]
    fn test_transaction_request_shape() {
        let mut item = BTreeMap::new();
        item.insert("ItemID".to_string(), Some(12));
        item.insert("Quantity".to_string(), None);
        let request = CreateTransactionRequest {
            data: TransactionData {
                business_id: 42,
                description: "invoice".into(),
                ..Default::default()
            },
            items: vec![item],
            add_sub: vec![AddSub {
                add_sub_id: 1,
                tas_amount: 500,
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["Data"]["TransactionID"].is_null());
        assert_eq!(json["Data"]["BusinessID"], 42);
        assert_eq!(json["Items"][0]["ItemID"], 12);
        assert!(json["Items"][0]["Quantity"].is_null());
        assert_eq!(json["AddSub"][0]["TASAmount"], 500);
    }

    #[test]
    fn test_customer_record_mixed_types() {
        let body = r#"{
            "data": [{
                "RowNumber": 1,
                "BusinessID": "42",
                "BusinessCode": 127013,
                "BusinessName": "Acme",
                "DefaultDiscount": 5,
                "Creation_Date": "2024-01-02 03:04:05",
                "Modification_Date": ""
            }],
            "error": null
        }"#;
        let response: GetCustomerResponse = serde_json::from_str(body).unwrap();
        let record = &response.data[0];
        assert_eq!(record.row_number, "1");
        assert_eq!(record.business_code, "127013");
        assert_eq!(record.business_name, "Acme");
        assert_eq!(record.default_discount, 5);
        assert!(record.creation_date.is_some());
        assert!(record.modification_date.is_none());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_jwt_expiry_is_informational() {
        let jwt: Jwt = serde_json::from_str(
            r#"{"accessToken":"a","refreshToken":"r","expiresAt":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        let before = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert!(!jwt.is_expired_at(before));
        assert!(jwt.is_expired_at(after));

        let jwt: Jwt = serde_json::from_str(r#"{"accessToken":"a"}"#).unwrap();
        assert!(!jwt.is_expired_at(after));
    }

    #[test]
    fn test_session_cookie_debug_redacts_value() {
        let cookie = SessionCookie::new("ASP.NET_SessionId", "s3cr3t");
        assert_eq!(cookie.header_value(), "ASP.NET_SessionId=s3cr3t");
        let debug = format!("{:?}", cookie);
        assert!(debug.contains("ASP.NET_SessionId"));
        assert!(!debug.contains("s3cr3t"));
    }
}
