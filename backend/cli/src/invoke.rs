//! One-shot local invocation of a registered function.

use std::path::Path;

use anyhow::{Context, Result};

use fnrelay_core::{FunctionResponse, IncomingRequest};
use fnrelay_functions::FunctionRegistry;

/// Parse a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

pub async fn build_request(
    method: &str,
    path: &str,
    headers: Vec<(String, String)>,
    body_file: Option<&Path>,
) -> Result<IncomingRequest> {
    let body = match body_file {
        Some(file) => tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read body file {}", file.display()))?,
        None => Vec::new(),
    };
    Ok(IncomingRequest::new(method, path)
        .with_headers(headers.into_iter().collect())
        .with_body(body))
}

pub async fn run(
    registry: &FunctionRegistry,
    name: &str,
    request: IncomingRequest,
) -> Result<FunctionResponse> {
    let function = registry.get(name).with_context(|| {
        format!(
            "Function '{name}' is not available (registered: {})",
            registry.names().join(", ")
        )
    })?;
    Ok(function.handle(request).await)
}
