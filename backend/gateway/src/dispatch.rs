//! HTTP <-> function invocation.

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use fnrelay_core::{FunctionResponse, Headers, IncomingRequest};

use crate::server::GatewayState;

/// `ANY /{function}`: the function sees path `/`.
pub async fn invoke_root(
    State(state): State<GatewayState>,
    Path(function): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    invoke(state, function, "/".to_string(), method, headers, body).await
}

/// `ANY /{function}/{*path}`: the function sees `/{path}`.
pub async fn invoke_path(
    State(state): State<GatewayState>,
    Path((function, path)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    invoke(state, function, format!("/{path}"), method, headers, body).await
}

async fn invoke(
    state: GatewayState,
    name: String,
    path: String,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(function) = state.registry.get(&name) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown function '{name}'") })),
        )
            .into_response();
    };

    let headers: Headers = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v.to_string())))
        .collect();
    let request = IncomingRequest::new(method.as_str(), path)
        .with_headers(headers)
        .with_body(body);

    debug!(function = %name, method = %request.method(), path = %request.path(), "Invoking function");
    into_http(function.handle(request).await)
}

fn into_http(response: FunctionResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.content_type())],
        Body::from(response.body_bytes()),
    )
        .into_response()
}
