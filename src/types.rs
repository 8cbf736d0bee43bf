//! JSON helpers for the loosely typed fields the Arpa API sends.
//!
//! The server is not consistent about field types: identifiers arrive as
//! strings or numbers, single values arrive where arrays are expected, and
//! timestamps use a space-separated layout with empty strings for "unset".

use crate::error::TransportError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

/// A value that can be either a string or an array of strings.
///
/// Serializes a single element back as a bare string.
///
/// # Examples
///
/// ```
/// use arpa_client::types::StringOrArray;
///
/// let one: StringOrArray = serde_json::from_str(r#""a""#).unwrap();
/// let many: StringOrArray = serde_json::from_str(r#"["a","b"]"#).unwrap();
///
/// assert_eq!(one.as_slice(), ["a"]);
/// assert_eq!(many.len(), 2);
/// assert_eq!(serde_json::to_string(&one).unwrap(), r#""a""#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringOrArray(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for StringOrArray {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => StringOrArray(vec![value]),
            OneOrMany::Many(values) => StringOrArray(values),
        })
    }
}

impl Serialize for StringOrArray {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            values => values.serialize(serializer),
        }
    }
}

impl Deref for StringOrArray {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for StringOrArray {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

/// A string field that tolerates numbers, booleans and objects on the wire.
///
/// Non-string values keep their JSON text; `null` becomes an empty string.
///
/// # Examples
///
/// ```
/// use arpa_client::types::EnforcedString;
///
/// let id: EnforcedString = serde_json::from_str("127013").unwrap();
/// assert_eq!(id.as_str(), "127013");
///
/// let id: EnforcedString = serde_json::from_str(r#""127013""#).unwrap();
/// assert_eq!(id, "127013");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EnforcedString(pub String);

impl EnforcedString {
    /// Returns the value as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for EnforcedString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(EnforcedString(match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }))
    }
}

impl fmt::Display for EnforcedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnforcedString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EnforcedString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for EnforcedString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EnforcedString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Serde adapter for `Option<NaiveDateTime>` in the server's
/// `YYYY-MM-DD HH:MM:SS` layout.
///
/// An empty string or `null` is `None`.
///
/// ```
/// use chrono::NaiveDateTime;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Row {
///     #[serde(with = "arpa_client::types::arpa_time", default)]
///     created: Option<NaiveDateTime>,
/// }
///
/// let row: Row = serde_json::from_str(r#"{"created":"2024-03-01 08:30:00"}"#).unwrap();
/// assert!(row.created.is_some());
///
/// let row: Row = serde_json::from_str(r#"{"created":""}"#).unwrap();
/// assert!(row.created.is_none());
/// ```
pub mod arpa_time {
    use chrono::NaiveDateTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    /// The timestamp layout used by the server.
    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDateTime::parse_from_str(text, FORMAT)
                .map(Some)
                .map_err(|e| D::Error::custom(format!("failed to parse time: {}", e))),
        }
    }
}

/// Flattens a struct into string query parameters.
///
/// `null` fields are skipped; numbers and booleans are rendered as text.
/// Nested objects and arrays are rejected.
///
/// # Examples
///
/// ```
/// use arpa_client::types::to_query_params;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Query {
///     #[serde(rename = "Mobile")]
///     mobile: Option<String>,
///     #[serde(rename = "Page")]
///     page: u32,
///     #[serde(rename = "BusinessCode")]
///     business_code: Option<String>,
/// }
///
/// let params = to_query_params(&Query {
///     mobile: Some("09120000000".into()),
///     page: 2,
///     business_code: None,
/// })
/// .unwrap();
///
/// assert_eq!(params["Mobile"], "09120000000");
/// assert_eq!(params["Page"], "2");
/// assert!(!params.contains_key("BusinessCode"));
/// ```
pub fn to_query_params<T>(value: &T) -> Result<BTreeMap<String, String>, TransportError>
where
    T: Serialize + ?Sized,
{
    let value =
        serde_json::to_value(value).map_err(|e| TransportError::SerializationFailed(e.to_string()))?;

    let serde_json::Value::Object(fields) = value else {
        return Err(TransportError::SerializationFailed(
            "query parameters must serialize to an object".to_string(),
        ));
    };

    let mut params = BTreeMap::new();
    for (key, field) in fields {
        let text = match field {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(TransportError::SerializationFailed(format!(
                    "query parameter {} is not a scalar",
                    key
                )));
            }
        };
        params.insert(key, text);
    }
    Ok(params)
}

/// Formats a timestamp in the server's layout.
pub fn format_arpa_time(time: &NaiveDateTime) -> String {
    time.format(arpa_time::FORMAT).to_string()
}
