//! Lenient request readers
//!
//! The editor frontend sends loosely typed JSON: numbers may arrive as
//! strings, optional text as `""`, and JSON blobs either as strings or as
//! nested objects. Both extractors here never reject a request. Anything
//! unreadable simply shows up as a missing field, which handlers turn into
//! their usual validation error.

use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// JSON object body read without rejection
#[derive(Debug, Clone, Default)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Parse a body. Malformed JSON or a non-object value yields an empty payload.
    pub fn from_slice(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    /// Raw text of a field. Strings are returned as-is, any other non-null
    /// value as its JSON text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Text of a field, or `None` when absent or blank
    pub fn non_blank(&self, key: &str) -> Option<String> {
        self.text(key).filter(|s| !s.trim().is_empty())
    }

    /// Integer field; accepts numbers and numeric strings
    pub fn int(&self, key: &str) -> Option<i32> {
        self.parse(key)
    }

    /// Decimal field; accepts numbers and numeric strings
    pub fn decimal(&self, key: &str) -> Option<Decimal> {
        let raw = self.text(key)?;
        let raw = raw.trim();
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
    }

    /// Any `FromStr` field parsed from its trimmed text
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.text(key)?.trim().parse().ok()
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.unwrap_or_default();
        Ok(Self::from_slice(&bytes))
    }
}

/// Query-string (or urlencoded form) parameters read without rejection.
/// The first occurrence of a repeated key wins.
#[derive(Debug, Clone, Default)]
pub struct Params(HashMap<String, String>);

impl Params {
    /// Parse `application/x-www-form-urlencoded` text
    pub fn parse_urlencoded(input: &[u8]) -> Self {
        let mut map = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(input) {
            map.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parameter value, or `None` when absent or blank
    pub fn non_blank(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
    }

    /// Integer parameter; non-numeric values count as absent
    pub fn int(&self, key: &str) -> Option<i32> {
        self.get(key)?.trim().parse().ok()
    }

    /// Merge another parameter set; existing keys are kept
    pub fn merge(mut self, other: Params) -> Self {
        for (key, value) in other.0 {
            self.0.entry(key).or_insert(value);
        }
        self
    }
}

impl<S> FromRequestParts<S> for Params
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .uri
            .query()
            .map(|q| Self::parse_urlencoded(q.as_bytes()))
            .unwrap_or_default())
    }
}
