//! Inbound payload parsing and validation.
//!
//! # Responsibilities
//! - Decode the `/proxy` JSON body (`{url, method?, headers?, body?}`)
//! - Reject a missing or unusable `url` before any network action
//! - Normalize the method and decide whether the body is sent
//!
//! # Design Decisions
//! - Non-JSON or empty bodies behave like `{}` and fail on the missing url
//! - Header names and values are not validated here; dispatch reports them
//! - Header order and repeated values are preserved

use axum::body::Bytes;
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use crate::error::ProxyError;

/// Methods whose body is attached to the outbound call.
pub const BODY_METHODS: &[&str] = &["POST", "PUT", "PATCH"];

/// Method used when the payload does not name one.
pub const DEFAULT_METHOD: &str = "GET";

/// Caller-supplied outbound headers as ordered `(name, value)` pairs.
///
/// A JSON array value becomes one pair per element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardHeaders(Vec<(String, String)>);

impl ForwardHeaders {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn scalar_to_string(name: &str, value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(format!(
            "header '{}' must be a string, number, boolean or array of those",
            name
        )),
    }
}

impl<'de> Deserialize<'de> for ForwardHeaders {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Option::<serde_json::Map<String, Value>>::deserialize(deserializer)?;
        let mut headers = ForwardHeaders::default();

        for (name, value) in map.into_iter().flatten() {
            match value {
                Value::Array(items) => {
                    for item in &items {
                        if let Some(v) = scalar_to_string(&name, item).map_err(D::Error::custom)? {
                            headers.push(name.clone(), v);
                        }
                    }
                }
                other => {
                    if let Some(v) = scalar_to_string(&name, &other).map_err(D::Error::custom)? {
                        headers.push(name, v);
                    }
                }
            }
        }

        Ok(headers)
    }
}

/// The `/proxy` body exactly as the caller sent it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForwardPayload {
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: ForwardHeaders,
    pub body: Option<Value>,
}

impl ForwardPayload {
    /// Decode the inbound body.
    ///
    /// Only `application/json` (and `+json`) bodies are parsed; anything else
    /// is an empty payload.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Result<Self, ProxyError> {
        if !is_json(content_type) || body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ProxyError::BadRequest(format!("Malformed JSON body: {}", e)))?;

        match value {
            Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| ProxyError::BadRequest(format!("Invalid request payload: {}", e))),
            _ => Ok(Self::default()),
        }
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// A validated forwarding request.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub url: Url,
    /// Uppercased method token. Not yet checked for HTTP validity.
    pub method: String,
    pub headers: ForwardHeaders,
    pub body: Option<Value>,
}

impl TryFrom<ForwardPayload> for ForwardRequest {
    type Error = ProxyError;

    fn try_from(payload: ForwardPayload) -> Result<Self, Self::Error> {
        let raw_url = payload
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ProxyError::MissingParameter("url"))?;

        let url = Url::parse(raw_url.trim())
            .map_err(|e| ProxyError::BadRequest(format!("Invalid url parameter: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::BadRequest(format!(
                "Invalid url parameter: unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let method = payload
            .method
            .map(|m| m.trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_METHOD.to_string());

        Ok(Self {
            url,
            method,
            headers: payload.headers,
            body: payload.body.filter(is_truthy),
        })
    }
}

impl ForwardRequest {
    pub fn carries_body(&self) -> bool {
        BODY_METHODS.contains(&self.method.as_str())
    }

    /// Resolve what actually goes on the wire.
    pub fn into_outbound(self) -> OutboundRequest {
        let carries_body = self.carries_body();
        let mut headers = self.headers;

        let body = match self.body {
            Some(value) if carries_body => {
                let (bytes, content_type) = encode_body(value);
                if let Some(content_type) = content_type {
                    if !headers.contains("content-type") {
                        headers.push("content-type", content_type);
                    }
                }
                Some(bytes)
            }
            _ => None,
        };

        OutboundRequest {
            method: self.method,
            url: self.url,
            headers,
            body,
        }
    }
}

/// `null`, `false`, `0` and `""` count as no body.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strings go out as raw text; every other JSON value is serialized.
fn encode_body(value: Value) -> (Bytes, Option<&'static str>) {
    match value {
        Value::String(text) => (Bytes::from(text), None),
        other => (Bytes::from(other.to_string()), Some("application/json")),
    }
}

/// The request handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: String,
    pub url: Url,
    pub headers: ForwardHeaders,
    pub body: Option<Bytes>,
}
