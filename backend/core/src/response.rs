use serde::Serialize;
use serde_json::Value;

/// Payload of a function response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

/// What a function hands back to its trigger: a status code and a body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl FunctionResponse {
    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(value),
        }
    }

    pub fn ok_json(value: Value) -> Self {
        Self::json(200, value)
    }

    /// Serialize `value` into a 200 JSON response.
    pub fn ok_serialized<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::ok_json(value),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                Self::json(500, serde_json::json!({ "error": "Failed to serialize response" }))
            }
        }
    }

    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Text(text.into()),
        }
    }

    pub fn pong() -> Self {
        Self::text(200, "Pong")
    }

    pub fn content_type(&self) -> &'static str {
        match self.body {
            ResponseBody::Json(_) => "application/json",
            ResponseBody::Text(_) => "text/plain; charset=utf-8",
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Text(text) => Some(text),
            ResponseBody::Json(_) => None,
        }
    }

    /// Encoded body bytes as they go over the wire.
    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            ResponseBody::Json(value) => value.to_string().into_bytes(),
            ResponseBody::Text(text) => text.clone().into_bytes(),
        }
    }
}
